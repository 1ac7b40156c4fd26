//! Repair-loop behavior against stubbed generator and runner.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Result;
use async_trait::async_trait;

use dsagent::agent::{
    AnalysisRequest, CodeGenerator, CodeRunner, LoopEvent, LoopState, RepairLoop, Session,
};
use dsagent::config::Config;
use dsagent::dataset::Dataset;
use dsagent::error::AgentError;
use dsagent::llm::ChatMessage;
use dsagent::sandbox::ExecutionOutcome;

struct StubGenerator;

#[async_trait]
impl CodeGenerator for StubGenerator {
    async fn generate(
        &self,
        _messages: &[ChatMessage],
        _request: &AnalysisRequest,
    ) -> Result<String, AgentError> {
        Ok("print('analysis')".to_string())
    }
}

struct FailingGenerator;

#[async_trait]
impl CodeGenerator for FailingGenerator {
    async fn generate(
        &self,
        _messages: &[ChatMessage],
        _request: &AnalysisRequest,
    ) -> Result<String, AgentError> {
        Err(AgentError::RateLimit("429".into()))
    }
}

/// Fails the first `failures_before_success` executions, then succeeds.
/// `usize::MAX` never succeeds.
struct ScriptedRunner {
    calls: AtomicUsize,
    failures_before_success: usize,
}

impl ScriptedRunner {
    fn failing(n: usize) -> Self {
        Self { calls: AtomicUsize::new(0), failures_before_success: n }
    }
}

#[async_trait]
impl CodeRunner for ScriptedRunner {
    async fn run(&self, _code: &str, _dataset_path: &Path) -> ExecutionOutcome {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if n < self.failures_before_success {
            ExecutionOutcome {
                success: false,
                stderr: format!("ValueError: failure {}", n + 1),
                ..Default::default()
            }
        } else {
            ExecutionOutcome {
                success: true,
                stdout: "correlation matrix computed".into(),
                ..Default::default()
            }
        }
    }
}

fn dataset(cols: usize, rows: usize) -> Dataset {
    let headers = (0..cols).map(|i| format!("col{i}")).collect();
    let data = (0..rows)
        .map(|r| (0..cols).map(|c| Some(format!("{}", r * cols + c))).collect())
        .collect();
    Dataset::from_raw(PathBuf::from("test.csv"), headers, data).unwrap()
}

fn request(objective: &str, max_iterations: usize) -> AnalysisRequest {
    let cfg = Config::load();
    AnalysisRequest::from_parts(&cfg, Some(objective), None, None, Some(max_iterations), 0.0, 1.0)
        .unwrap()
}

#[tokio::test]
async fn always_failing_runner_exhausts_at_the_bound() -> Result<()> {
    let runner = ScriptedRunner::failing(usize::MAX);
    let mut session = Session::new(request("anything", 4), dataset(2, 3));

    let state = RepairLoop::new(&StubGenerator, &runner, "eda_plots")
        .run(&mut session)
        .await?;

    assert_eq!(state, LoopState::Exhausted);
    assert_eq!(session.state, LoopState::Exhausted);
    assert_eq!(session.attempts(), 4);
    assert!(session.history.iter().all(|r| !r.success));
    Ok(())
}

#[tokio::test]
async fn first_try_success_produces_one_record() -> Result<()> {
    let runner = ScriptedRunner::failing(0);
    let mut session = Session::new(request("anything", 5), dataset(2, 3));

    let state = RepairLoop::new(&StubGenerator, &runner, "eda_plots")
        .run(&mut session)
        .await?;

    assert_eq!(state, LoopState::Succeeded);
    assert_eq!(session.attempts(), 1);
    assert!(session.history[0].success);
    Ok(())
}

#[tokio::test]
async fn fails_twice_then_succeeds_within_the_bound() -> Result<()> {
    // 3 columns, 10 rows, "find correlations", bound 3, two failures first.
    let runner = ScriptedRunner::failing(2);
    let mut session = Session::new(request("find correlations", 3), dataset(3, 10));

    let state = RepairLoop::new(&StubGenerator, &runner, "eda_plots")
        .run(&mut session)
        .await?;

    assert_eq!(state, LoopState::Succeeded);
    assert_eq!(session.attempts(), 3);
    assert!(!session.history[0].success);
    assert!(!session.history[1].success);
    assert!(session.history[2].success);
    assert_eq!(session.history[2].output, "correlation matrix computed");
    Ok(())
}

#[tokio::test]
async fn history_never_exceeds_the_bound() -> Result<()> {
    for max in 1..=4 {
        let runner = ScriptedRunner::failing(usize::MAX);
        let mut session = Session::new(request("anything", max), dataset(1, 1));
        RepairLoop::new(&StubGenerator, &runner, "eda_plots")
            .run(&mut session)
            .await?;
        assert_eq!(session.attempts(), max);
    }
    Ok(())
}

#[tokio::test]
async fn model_failure_aborts_without_records() {
    let runner = ScriptedRunner::failing(0);
    let mut session = Session::new(request("anything", 3), dataset(1, 1));

    let err = RepairLoop::new(&FailingGenerator, &runner, "eda_plots")
        .run(&mut session)
        .await
        .unwrap_err();

    assert!(matches!(err, AgentError::RateLimit(_)));
    assert_eq!(session.attempts(), 0);
}

#[tokio::test]
async fn emits_progress_events_in_order() -> Result<()> {
    let runner = ScriptedRunner::failing(1);
    let mut session = Session::new(request("anything", 3), dataset(1, 1));
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

    RepairLoop::new(&StubGenerator, &runner, "eda_plots")
        .with_events(tx)
        .run(&mut session)
        .await?;

    let mut events = Vec::new();
    while let Ok(ev) = rx.try_recv() {
        events.push(ev);
    }

    let finished: Vec<bool> = events
        .iter()
        .filter_map(|e| match e {
            LoopEvent::AttemptFinished(r) => Some(r.success),
            _ => None,
        })
        .collect();
    assert_eq!(finished, vec![false, true]);

    let last_state = events
        .iter()
        .rev()
        .find_map(|e| match e {
            LoopEvent::StateChanged(s) => Some(*s),
            _ => None,
        })
        .unwrap();
    assert_eq!(last_state, LoopState::Succeeded);
    Ok(())
}
