//! Execution sandbox behavior against a real interpreter.
//!
//! Tests skip quietly when no python3 is installed.

use std::path::Path;
use std::time::Duration;

use dsagent::sandbox::PythonSandbox;

fn python_available() -> bool {
    std::process::Command::new("python3")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

fn sandbox(plots: &Path, timeout_secs: u64) -> PythonSandbox {
    PythonSandbox::new("python3", plots, Duration::from_secs(timeout_secs))
}

#[tokio::test]
async fn captures_stdout_on_success() {
    if !python_available() {
        println!("Warning: python3 not found, skipping sandbox test");
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let outcome = sandbox(&dir.path().join("plots"), 30)
        .execute("print('hello from analysis')", Path::new("unused.csv"))
        .await;

    assert!(outcome.success);
    assert!(outcome.stdout.contains("hello from analysis"));
}

#[tokio::test]
async fn raised_exception_becomes_failure_data() {
    if !python_available() {
        println!("Warning: python3 not found, skipping sandbox test");
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let outcome = sandbox(&dir.path().join("plots"), 30)
        .execute("x = 1 / 0", Path::new("unused.csv"))
        .await;

    assert!(!outcome.success);
    assert!(outcome.stderr.contains("ZeroDivisionError"));
}

#[tokio::test]
async fn exports_dataset_path_to_the_script() {
    if !python_available() {
        println!("Warning: python3 not found, skipping sandbox test");
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let outcome = sandbox(&dir.path().join("plots"), 30)
        .execute(
            "import os\nprint(os.environ['DATASET_PATH'])",
            Path::new("data/sales.csv"),
        )
        .await;

    assert!(outcome.success);
    assert!(outcome.stdout.contains("data/sales.csv"));
}

#[tokio::test]
async fn collects_plot_files_written_by_the_script() {
    if !python_available() {
        println!("Warning: python3 not found, skipping sandbox test");
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let plots = dir.path().join("plots");
    let code = format!(
        "import os\nos.makedirs(r'{0}', exist_ok=True)\nopen(r'{0}/hist.png', 'wb').write(b'png')",
        plots.display()
    );
    let outcome = sandbox(&plots, 30).execute(&code, Path::new("unused.csv")).await;

    assert!(outcome.success);
    assert_eq!(outcome.artifacts.len(), 1);
    assert!(outcome.artifacts[0].ends_with("hist.png"));
}

#[tokio::test]
async fn runaway_script_times_out_as_failure() {
    if !python_available() {
        println!("Warning: python3 not found, skipping sandbox test");
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let outcome = sandbox(&dir.path().join("plots"), 1)
        .execute("import time\ntime.sleep(30)", Path::new("unused.csv"))
        .await;

    assert!(!outcome.success);
    assert!(outcome.stderr.contains("timed out"));
}

#[tokio::test]
async fn missing_interpreter_is_failure_data_not_a_crash() {
    let dir = tempfile::tempdir().unwrap();
    let outcome = PythonSandbox::new(
        "definitely-not-a-python",
        dir.path().join("plots"),
        Duration::from_secs(5),
    )
    .execute("print('hi')", Path::new("unused.csv"))
    .await;

    assert!(!outcome.success);
    assert!(outcome.stderr.contains("failed to start interpreter"));
}
