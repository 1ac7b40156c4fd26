//! Batch analysis handler: ingest, run the repair loop, render the report.

use std::path::PathBuf;

use anyhow::{bail, Result};
use tokio::sync::mpsc;

use crate::agent::{error_line, AnalysisRequest, LoopEvent, LoopState, RepairLoop, Session};
use crate::config::Config;
use crate::dataset::Dataset;
use crate::llm::{ChatMessage, ChatOptions, LlmClient, Role};
use crate::printer::{MarkdownPrinter, TextPrinter};
use crate::prompt;
use crate::sandbox::PythonSandbox;

pub struct AnalyzeParams {
    pub file: PathBuf,
    pub objective: Option<String>,
    pub hardware: Option<String>,
    pub model: Option<String>,
    pub max_iterations: Option<usize>,
    pub temperature: f32,
    pub top_p: f32,
    pub output: Option<PathBuf>,
    pub summarize: bool,
    pub markdown: bool,
}

pub async fn run(cfg: &Config, params: AnalyzeParams) -> Result<()> {
    let file = crate::dataset::resolve_input(&cfg.data_path(), &params.file);
    let dataset = Dataset::load(&file)?;
    let request = AnalysisRequest::from_parts(
        cfg,
        params.objective.as_deref(),
        params.hardware.as_deref(),
        params.model.as_deref(),
        params.max_iterations,
        params.temperature,
        params.top_p,
    )?;

    TextPrinter::heading("Dataset profile");
    TextPrinter::plain(&dataset.profile());

    let client = LlmClient::from_config(cfg)?;
    let sandbox = PythonSandbox::from_config(cfg);
    let plots_dir = cfg.plots_path().display().to_string();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let max = request.max_iterations;
    let progress = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match event {
                LoopEvent::AttemptStarted(n) => {
                    TextPrinter::note(&format!("attempt {n}/{max}: generating code"));
                }
                LoopEvent::AttemptFinished(rec) if rec.success => {
                    TextPrinter::success(&format!(
                        "attempt {} succeeded ({} plot files)",
                        rec.attempt,
                        rec.artifacts.len()
                    ));
                }
                LoopEvent::AttemptFinished(rec) => {
                    TextPrinter::failure(&format!(
                        "attempt {} failed: {}",
                        rec.attempt,
                        error_line(&rec.output)
                    ));
                }
                LoopEvent::StateChanged(_) => {}
            }
        }
    });

    let mut session = Session::new(request, dataset);
    let outcome = {
        let repair = RepairLoop::new(&client, &sandbox, plots_dir.clone()).with_events(tx);
        repair.run(&mut session).await
    };
    // sender dropped with the loop; let the progress printer drain
    let _ = progress.await;
    let state = outcome?;

    let report = build_report(&session, &plots_dir);
    if params.markdown {
        MarkdownPrinter::default().print(&report);
    } else {
        TextPrinter::plain(&report);
    }
    if let Some(path) = &params.output {
        std::fs::write(path, &report)?;
        TextPrinter::note(&format!("report written to {}", path.display()));
    }

    match state {
        LoopState::Succeeded => {
            if params.summarize {
                summarize(&client, &session, params.markdown).await?;
            }
            Ok(())
        }
        LoopState::Exhausted => {
            bail!("analysis did not converge after {} attempts", session.attempts())
        }
        other => bail!("loop ended in unexpected state: {other}"),
    }
}

/// Final report shown to the user and written to `--output`.
fn build_report(session: &Session, plots_dir: &str) -> String {
    let mut out = String::from("# Analysis Report\n\n");
    out.push_str(&format!(
        "- Dataset: {} ({} rows, {} columns)\n",
        session.dataset.path.display(),
        session.dataset.n_rows(),
        session.dataset.n_cols()
    ));
    out.push_str(&format!("- Objective: {}\n", session.request.objective));
    out.push_str(&format!("- Model: {}\n", session.request.model));
    out.push_str(&format!(
        "- Attempts: {} of {} ({})\n\n",
        session.attempts(),
        session.request.max_iterations,
        session.state
    ));

    if let Some(last) = session.last_record() {
        if last.success {
            out.push_str("## Output\n\n");
            out.push_str(last.output.trim_end());
            out.push_str("\n\n## Plot Files\n\n");
            if last.artifacts.is_empty() {
                out.push_str(&format!("No plot files were generated in '{plots_dir}'.\n"));
            } else {
                for artifact in &last.artifacts {
                    out.push_str(&format!("- {}\n", artifact.display()));
                }
            }
        } else {
            out.push_str("## Last Error\n\n");
            out.push_str(last.output.trim_end());
            out.push('\n');
        }
    }

    out.push_str("\n## Iteration History\n\n");
    for rec in &session.history {
        if rec.success {
            out.push_str(&format!(
                "- attempt {}: succeeded ({} plot files)\n",
                rec.attempt,
                rec.artifacts.len()
            ));
        } else {
            out.push_str(&format!(
                "- attempt {}: failed ({})\n",
                rec.attempt,
                error_line(&rec.output)
            ));
        }
    }
    out
}

/// Narrative write-up of a successful run, produced by one extra model call.
async fn summarize(client: &LlmClient, session: &Session, markdown: bool) -> Result<()> {
    let Some(last) = session.last_record() else {
        return Ok(());
    };
    let artifacts: Vec<String> = last.artifacts.iter().map(|p| p.display().to_string()).collect();
    let messages = vec![
        ChatMessage::new(Role::System, prompt::summary_rules()),
        ChatMessage::new(
            Role::User,
            prompt::summary_request(&session.request.objective, &last.output, &artifacts),
        ),
    ];
    let opts = ChatOptions {
        model: session.request.model.clone(),
        temperature: 0.2,
        top_p: 1.0,
        max_tokens: Some(2048),
    };
    let text = client.complete(messages, opts).await?;
    TextPrinter::heading("Model summary");
    if markdown {
        MarkdownPrinter::default().print(&text);
    } else {
        TextPrinter::plain(&text);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::IterationRecord;
    use std::path::PathBuf;

    fn test_session(records: Vec<IterationRecord>, state: LoopState) -> Session {
        let cfg = Config::load();
        let request =
            AnalysisRequest::from_parts(&cfg, Some("find correlations"), None, None, Some(3), 0.0, 1.0)
                .unwrap();
        let dataset = Dataset::from_raw(
            PathBuf::from("t.csv"),
            vec!["a".into()],
            vec![vec![Some("1".into())]],
        )
        .unwrap();
        let mut session = Session::new(request, dataset);
        session.history = records;
        session.state = state;
        session
    }

    #[test]
    fn report_covers_history_and_outcome() {
        let session = test_session(
            vec![
                IterationRecord {
                    attempt: 1,
                    code: "x".into(),
                    success: false,
                    output: "NameError: boom".into(),
                    artifacts: vec![],
                },
                IterationRecord {
                    attempt: 2,
                    code: "y".into(),
                    success: true,
                    output: "done".into(),
                    artifacts: vec![PathBuf::from("eda_plots/hist.png")],
                },
            ],
            LoopState::Succeeded,
        );
        let report = build_report(&session, "eda_plots");
        assert!(report.contains("attempt 1: failed (NameError: boom)"));
        assert!(report.contains("attempt 2: succeeded (1 plot files)"));
        assert!(report.contains("eda_plots/hist.png"));
        assert!(report.contains("## Output"));
    }
}
