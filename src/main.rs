use anyhow::{bail, Result};
use dsagent::{cli, config::Config, handlers};
use is_terminal::IsTerminal;
use std::io::{self, Read};

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();

    let filter = if args.verbose { "dsagent=debug" } else { "dsagent=warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with_writer(io::stderr)
        .init();

    // CLI overrides land in the environment before the config is read
    if let Some(key) = args.api_key.as_deref() {
        std::env::set_var("OPENAI_API_KEY", key);
    }
    if let Some(dir) = args.plots_dir.as_deref() {
        std::env::set_var("PLOTS_PATH", dir);
    }

    // Load config, reject malformed values up front
    let cfg = Config::load();
    cfg.validate()?;

    let markdown = if args.no_md {
        false
    } else if args.md {
        true
    } else {
        cfg.get_bool("PRETTIFY_MARKDOWN")
    };

    // Resolve objective: flag or positional, else piped stdin
    let mut objective = args.objective.clone().or(args.objective_flag.clone());
    if objective.is_none() && !io::stdin().is_terminal() {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        let buf = buf.trim().to_string();
        if !buf.is_empty() {
            objective = Some(buf);
        }
    }

    if args.list_models {
        return handlers::models::run(&cfg).await;
    }

    if args.profile {
        let Some(file) = args.file.as_deref() else {
            bail!("--profile requires --file");
        };
        return handlers::profile::run(&cfg, file);
    }

    if args.studio {
        let Some(file) = args.file.clone() else {
            bail!("--studio requires --file");
        };
        return handlers::studio::run(
            &cfg,
            file,
            objective.as_deref(),
            args.hardware.as_deref(),
            args.model.as_deref(),
            args.max_iterations,
            args.temperature,
            args.top_p,
        )
        .await;
    }

    let Some(file) = args.file.clone() else {
        bail!("provide a data file with --file (or use --list-models)");
    };
    handlers::analyze::run(
        &cfg,
        handlers::analyze::AnalyzeParams {
            file,
            objective,
            hardware: args.hardware.clone(),
            model: args.model.clone(),
            max_iterations: args.max_iterations,
            temperature: args.temperature,
            top_p: args.top_p,
            output: args.output.clone(),
            summarize: args.summarize,
            markdown,
        },
    )
    .await
}
