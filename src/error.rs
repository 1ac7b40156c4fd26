//! Failure taxonomy for the agent pipeline.

use thiserror::Error;

/// Fatal failures surfaced to the user. Failures of *generated* code are
/// not represented here: the sandbox reports those as data so the repair
/// loop can act on them.
#[derive(Error, Debug)]
pub enum AgentError {
    /// The input file could not be read as a tabular dataset.
    #[error("unreadable data file '{path}': {reason}")]
    UnreadableFile { path: String, reason: String },

    /// The API rejected our credentials.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// The API throttled us.
    #[error("rate limited by the model API: {0}")]
    RateLimit(String),

    /// Any other API-level failure (network, 5xx, malformed response).
    #[error("model API error: {0}")]
    Upstream(String),

    /// Invalid configuration, rejected at session start.
    #[error("configuration error: {0}")]
    Config(String),
}

impl AgentError {
    pub fn unreadable(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::UnreadableFile { path: path.into(), reason: reason.into() }
    }
}

pub type Result<T> = std::result::Result<T, AgentError>;
