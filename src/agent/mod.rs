//! Repair loop: the bounded generate → execute → retry-on-failure cycle.

mod session;

pub use session::{AnalysisRequest, IterationRecord, LoopState, Session};

use std::path::Path;

use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info};

use crate::error::AgentError;
use crate::llm::{ChatMessage, ChatOptions, LlmClient, Role};
use crate::prompt;
use crate::sandbox::{ExecutionOutcome, PythonSandbox};

/// Upper bound on generated-code length, generous enough for a full EDA
/// script.
const CODE_MAX_TOKENS: u32 = 4096;

/// Source of generated code. Implemented by the LLM client; stubbed in
/// tests so the loop can be exercised offline.
#[async_trait]
pub trait CodeGenerator: Send + Sync {
    async fn generate(
        &self,
        messages: &[ChatMessage],
        request: &AnalysisRequest,
    ) -> Result<String, AgentError>;
}

#[async_trait]
impl CodeGenerator for LlmClient {
    async fn generate(
        &self,
        messages: &[ChatMessage],
        request: &AnalysisRequest,
    ) -> Result<String, AgentError> {
        let opts = ChatOptions {
            model: request.model.clone(),
            temperature: request.temperature,
            top_p: request.top_p,
            max_tokens: Some(CODE_MAX_TOKENS),
        };
        let text = self.complete(messages.to_vec(), opts).await?;
        Ok(strip_code_fences(&text))
    }
}

/// Executes generated code against the dataset. Implemented by the Python
/// sandbox; stubbed in tests.
#[async_trait]
pub trait CodeRunner: Send + Sync {
    async fn run(&self, code: &str, dataset_path: &Path) -> ExecutionOutcome;
}

#[async_trait]
impl CodeRunner for PythonSandbox {
    async fn run(&self, code: &str, dataset_path: &Path) -> ExecutionOutcome {
        self.execute(code, dataset_path).await
    }
}

/// Progress notifications for interactive front-ends.
#[derive(Debug, Clone)]
pub enum LoopEvent {
    StateChanged(LoopState),
    AttemptStarted(usize),
    AttemptFinished(IterationRecord),
}

pub struct RepairLoop<'a, G: CodeGenerator, R: CodeRunner> {
    generator: &'a G,
    runner: &'a R,
    plots_dir: String,
    events: Option<UnboundedSender<LoopEvent>>,
}

impl<'a, G: CodeGenerator, R: CodeRunner> RepairLoop<'a, G, R> {
    pub fn new(generator: &'a G, runner: &'a R, plots_dir: impl Into<String>) -> Self {
        Self { generator, runner, plots_dir: plots_dir.into(), events: None }
    }

    /// Forward state changes and finished attempts over a channel.
    pub fn with_events(mut self, tx: UnboundedSender<LoopEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    /// Drive the session to a terminal state. Model-client failures abort
    /// the loop; execution failures feed the next attempt. The history
    /// never grows beyond `max_iterations` records.
    pub async fn run(&self, session: &mut Session) -> Result<LoopState, AgentError> {
        let request = session.request.clone();
        let mut messages = vec![
            ChatMessage::new(Role::System, prompt::system_rules(&self.plots_dir)),
            ChatMessage::new(
                Role::User,
                prompt::analysis_prompt(
                    &session.dataset.profile(),
                    &request.objective,
                    &request.hardware,
                    &session.dataset.path.display().to_string(),
                    &self.plots_dir,
                ),
            ),
        ];

        loop {
            let attempt = session.attempts() + 1;
            self.transition(session, LoopState::Generating);
            self.emit(LoopEvent::AttemptStarted(attempt));

            let code = self.generator.generate(&messages, &request).await?;

            self.transition(session, LoopState::Executing);
            let outcome = self.runner.run(&code, &session.dataset.path).await;

            let record = IterationRecord {
                attempt,
                code: code.clone(),
                success: outcome.success,
                output: outcome.combined_output(),
                artifacts: outcome.artifacts.clone(),
            };
            session.history.push(record.clone());
            self.emit(LoopEvent::AttemptFinished(record));

            if outcome.success {
                info!(attempt, "analysis succeeded");
                self.transition(session, LoopState::Succeeded);
                return Ok(LoopState::Succeeded);
            }
            if session.attempts() >= request.max_iterations {
                info!(attempts = session.attempts(), "iteration bound reached");
                self.transition(session, LoopState::Exhausted);
                return Ok(LoopState::Exhausted);
            }

            self.transition(session, LoopState::Retrying);
            messages.push(ChatMessage::new(Role::Assistant, code));
            messages.push(ChatMessage::new(Role::User, prompt::repair_feedback(&outcome.stderr)));
        }
    }

    fn transition(&self, session: &mut Session, state: LoopState) {
        debug!(prev = %session.state, next = %state, "loop transition");
        session.state = state;
        self.emit(LoopEvent::StateChanged(state));
    }

    fn emit(&self, event: LoopEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event);
        }
    }
}

/// Python tracebacks put the informative line last.
pub fn error_line(output: &str) -> &str {
    output
        .lines()
        .rev()
        .find(|l| !l.trim().is_empty())
        .unwrap_or("no error output")
}

/// Models occasionally wrap replies in markdown fences despite the rules;
/// executing those verbatim is a guaranteed SyntaxError.
pub fn strip_code_fences(text: &str) -> String {
    let trimmed = text.trim();
    if !trimmed.starts_with("```") {
        return trimmed.to_string();
    }
    let mut lines: Vec<&str> = trimmed.lines().collect();
    lines.remove(0);
    if lines.last().map(|l| l.trim()) == Some("```") {
        lines.pop();
    }
    lines.join("\n")
}
