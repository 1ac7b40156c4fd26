//! Studio handler: interactive session UI using Ratatui.

use std::io;
use std::path::PathBuf;

use anyhow::Result;
use is_terminal::IsTerminal;

use crate::config::Config;
use crate::tui::run_studio;

#[allow(clippy::too_many_arguments)]
pub async fn run(
    cfg: &Config,
    file: PathBuf,
    objective: Option<&str>,
    hardware: Option<&str>,
    model: Option<&str>,
    max_iterations: Option<usize>,
    temperature: f32,
    top_p: f32,
) -> Result<()> {
    if !io::stdout().is_terminal() {
        eprintln!("Warning: the studio requires a proper terminal.");
        eprintln!("Try running in a terminal instead of an IDE or redirected output.");
        return Err(anyhow::anyhow!("studio mode requires a terminal environment"));
    }

    run_studio(cfg, file, objective, hardware, model, max_iterations, temperature, top_p).await
}
