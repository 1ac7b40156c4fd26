//! Execution sandbox: runs generated Python in a restricted child interpreter.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::process::Command;
use tracing::{debug, warn};

use crate::config::Config;

const PLOT_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "svg"];

/// Result of one execution attempt. Failures of the executed code are
/// represented here, never raised: the repair loop consumes them as data.
#[derive(Debug, Clone, Default)]
pub struct ExecutionOutcome {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
    pub artifacts: Vec<PathBuf>,
}

impl ExecutionOutcome {
    fn failure(message: impl Into<String>) -> Self {
        Self { success: false, stderr: message.into(), ..Default::default() }
    }

    /// Combined text shown in iteration records and fed back to the model.
    pub fn combined_output(&self) -> String {
        match (self.stdout.is_empty(), self.stderr.is_empty()) {
            (false, false) => format!("{}\n{}", self.stdout, self.stderr),
            (true, false) => self.stderr.clone(),
            _ => self.stdout.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PythonSandbox {
    python_bin: String,
    plots_dir: PathBuf,
    timeout: Duration,
}

impl PythonSandbox {
    pub fn new(python_bin: impl Into<String>, plots_dir: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self { python_bin: python_bin.into(), plots_dir: plots_dir.into(), timeout }
    }

    pub fn from_config(cfg: &Config) -> Self {
        Self::new(
            cfg.get("PYTHON_BIN").unwrap_or_else(|| "python3".into()),
            cfg.plots_path(),
            Duration::from_secs(cfg.get_u64("EXECUTION_TIMEOUT").unwrap_or(120)),
        )
    }

    pub fn plots_dir(&self) -> &Path {
        &self.plots_dir
    }

    /// Run one script against the dataset. The dataset path is exported as
    /// DATASET_PATH; `-I` keeps the interpreter isolated from user site
    /// packages and PYTHON* environment variables.
    pub async fn execute(&self, code: &str, dataset_path: &Path) -> ExecutionOutcome {
        self.prepare_plots_dir();

        let mut script = match tempfile::Builder::new().suffix(".py").tempfile() {
            Ok(f) => f,
            Err(e) => return ExecutionOutcome::failure(format!("could not stage script: {e}")),
        };
        if let Err(e) = script.write_all(code.as_bytes()) {
            return ExecutionOutcome::failure(format!("could not stage script: {e}"));
        }

        let mut cmd = Command::new(&self.python_bin);
        cmd.arg("-I")
            .arg(script.path())
            .env("DATASET_PATH", dataset_path)
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .kill_on_drop(true);

        debug!(python = %self.python_bin, timeout_s = self.timeout.as_secs(), "executing generated script");

        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Err(_) => {
                return ExecutionOutcome::failure(format!(
                    "execution timed out after {} seconds",
                    self.timeout.as_secs()
                ))
            }
            Ok(Err(e)) => {
                return ExecutionOutcome::failure(format!(
                    "failed to start interpreter '{}': {e}",
                    self.python_bin
                ))
            }
            Ok(Ok(out)) => out,
        };

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let mut stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        let success = output.status.success();
        if !success && stderr.trim().is_empty() {
            stderr = format!("interpreter exited with {}", output.status);
        }

        let artifacts = if success { self.collect_artifacts() } else { Vec::new() };
        ExecutionOutcome { success, stdout, stderr, artifacts }
    }

    /// Create the plots directory and drop stale plot files so artifacts
    /// collected afterwards belong to this attempt.
    fn prepare_plots_dir(&self) {
        if let Err(e) = std::fs::create_dir_all(&self.plots_dir) {
            warn!(dir = %self.plots_dir.display(), "could not create plots dir: {e}");
            return;
        }
        for entry in list_plot_files(&self.plots_dir) {
            if let Err(e) = std::fs::remove_file(&entry) {
                warn!(file = %entry.display(), "could not remove stale plot: {e}");
            }
        }
    }

    /// Collect plot files written by the script. Scripts that ignore the
    /// plots-dir instruction and write into the working directory get their
    /// strays moved into place.
    fn collect_artifacts(&self) -> Vec<PathBuf> {
        let mut found = list_plot_files(&self.plots_dir);
        if found.is_empty() {
            for stray in list_plot_files(Path::new(".")) {
                let Some(name) = stray.file_name() else { continue };
                let target = self.plots_dir.join(name);
                if std::fs::rename(&stray, &target).is_ok() {
                    found.push(target);
                }
            }
        }
        found.sort();
        found
    }
}

fn list_plot_files(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.is_file()
                && p.extension()
                    .and_then(|e| e.to_str())
                    .map(|e| PLOT_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
                    .unwrap_or(false)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combined_output_merges_streams() {
        let outcome = ExecutionOutcome {
            success: false,
            stdout: "partial".into(),
            stderr: "Traceback".into(),
            artifacts: vec![],
        };
        let text = outcome.combined_output();
        assert!(text.contains("partial") && text.contains("Traceback"));
    }

    #[test]
    fn plot_listing_filters_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.png"), b"x").unwrap();
        std::fs::write(dir.path().join("b.txt"), b"x").unwrap();
        let files = list_plot_files(dir.path());
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("a.png"));
    }
}
