use std::path::PathBuf;

use clap::{ArgGroup, Parser};

#[derive(Parser, Debug, Clone)]
#[command(name = "dsagent", about = "LLM-driven data analysis agent", version)]
#[command(group(ArgGroup::new("mode").args(["profile", "list_models", "studio"]).multiple(false)))]
#[command(group(ArgGroup::new("objective_input").args(["objective", "objective_flag"]).multiple(false)))]
#[command(group(ArgGroup::new("md_switch").args(["md", "no_md"]).multiple(false)))]
pub struct Cli {
    /// Analysis objective (free text).
    #[arg(value_name = "OBJECTIVE")]
    pub objective: Option<String>,

    /// Analysis objective (flag form).
    #[arg(short = 'o', long = "objective", value_name = "TEXT")]
    pub objective_flag: Option<String>,

    /// Path to the data file (CSV or Excel).
    #[arg(short = 'f', long)]
    pub file: Option<PathBuf>,

    /// Model to use for code generation.
    #[arg(short = 'm', long)]
    pub model: Option<String>,

    /// API key (overrides the OPENAI_API_KEY environment variable).
    #[arg(short = 'k', long = "api-key")]
    pub api_key: Option<String>,

    /// Free-text hardware description used to bias generated code.
    #[arg(long)]
    pub hardware: Option<String>,

    /// Maximum generate-execute attempts before giving up.
    #[arg(long = "max-iterations")]
    pub max_iterations: Option<usize>,

    /// Randomness of generated output.
    #[arg(long, default_value_t = 0.0, value_parser = clap::value_parser!(f32))]
    pub temperature: f32,

    /// Limits highest probable tokens (words).
    #[arg(long = "top-p", default_value_t = 1.0, value_parser = clap::value_parser!(f32))]
    pub top_p: f32,

    /// Also write the final report to this file.
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Directory generated plots are collected into.
    #[arg(long = "plots-dir")]
    pub plots_dir: Option<PathBuf>,

    /// Ask the model for a narrative summary after a successful run.
    #[arg(long)]
    pub summarize: bool,

    /// Render the final report as Markdown.
    #[arg(long)]
    pub md: bool,
    /// Print the final report as plain text.
    #[arg(long = "no-md")]
    pub no_md: bool,

    /// Show the dataset profile and exit without calling the model.
    #[arg(long)]
    pub profile: bool,

    /// List models available to the configured key and exit.
    #[arg(long = "list-models")]
    pub list_models: bool,

    /// Open the interactive session UI.
    #[arg(long)]
    pub studio: bool,

    /// Enable debug logging.
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }
}
