//! Session-scoped state: the validated request, dataset handle, and
//! iteration history. Owned by the presentation layer, discarded on exit.

use std::fmt;
use std::path::PathBuf;

use crate::config::{Config, SUPPORTED_MODELS};
use crate::dataset::Dataset;
use crate::error::AgentError;
use crate::prompt;

/// User inputs for one analysis run. Constructed once, read-only afterward.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub objective: String,
    pub hardware: String,
    pub model: String,
    pub max_iterations: usize,
    pub temperature: f32,
    pub top_p: f32,
}

impl AnalysisRequest {
    /// Validate user inputs against the config, falling back to configured
    /// defaults where the user left fields empty.
    pub fn from_parts(
        cfg: &Config,
        objective: Option<&str>,
        hardware: Option<&str>,
        model: Option<&str>,
        max_iterations: Option<usize>,
        temperature: f32,
        top_p: f32,
    ) -> Result<Self, AgentError> {
        let model = model
            .map(str::to_string)
            .or_else(|| cfg.get("DEFAULT_MODEL"))
            .unwrap_or_else(|| "gpt-4o".to_string());
        if !SUPPORTED_MODELS.contains(&model.as_str()) {
            return Err(AgentError::Config(format!(
                "model '{}' is not one of: {}",
                model,
                SUPPORTED_MODELS.join(", ")
            )));
        }

        let max_iterations = max_iterations
            .or_else(|| cfg.get_usize("DEFAULT_MAX_ITERATIONS"))
            .unwrap_or(5);
        if max_iterations == 0 {
            return Err(AgentError::Config("max iterations must be at least 1".into()));
        }

        let objective = match objective.map(str::trim) {
            Some(o) if !o.is_empty() => o.to_string(),
            _ => prompt::DEFAULT_OBJECTIVE.to_string(),
        };
        let hardware = match hardware.map(str::trim) {
            Some(h) if !h.is_empty() => h.to_string(),
            _ => cfg.get("DEFAULT_HARDWARE").unwrap_or_default(),
        };

        Ok(Self { objective, hardware, model, max_iterations, temperature, top_p })
    }
}

/// One generate-execute attempt and its outcome.
#[derive(Debug, Clone)]
pub struct IterationRecord {
    pub attempt: usize,
    pub code: String,
    pub success: bool,
    pub output: String,
    pub artifacts: Vec<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Generating,
    Executing,
    Succeeded,
    Retrying,
    Exhausted,
}

impl LoopState {
    pub fn is_terminal(self) -> bool {
        matches!(self, LoopState::Succeeded | LoopState::Exhausted)
    }
}

impl fmt::Display for LoopState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LoopState::Idle => "idle",
            LoopState::Generating => "generating",
            LoopState::Executing => "executing",
            LoopState::Succeeded => "succeeded",
            LoopState::Retrying => "retrying",
            LoopState::Exhausted => "exhausted",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug)]
pub struct Session {
    pub request: AnalysisRequest,
    pub dataset: Dataset,
    pub history: Vec<IterationRecord>,
    pub state: LoopState,
}

impl Session {
    pub fn new(request: AnalysisRequest, dataset: Dataset) -> Self {
        Self { request, dataset, history: Vec::new(), state: LoopState::Idle }
    }

    pub fn attempts(&self) -> usize {
        self.history.len()
    }

    pub fn last_record(&self) -> Option<&IterationRecord> {
        self.history.last()
    }
}
