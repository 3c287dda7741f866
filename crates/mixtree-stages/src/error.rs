//! Error types for stage construction.

use thiserror::Error;

/// Errors that can occur while building a stage from its config.
#[derive(Debug, Error)]
pub enum StageError {
    /// No stage is registered under this name
    #[error("unknown processor: {0}")]
    UnknownStage(String),

    /// The config parsed but holds an unusable value
    #[error("invalid config for '{stage}': {reason}")]
    InvalidConfig {
        /// Stage id.
        stage: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// The config does not match the stage's schema
    #[error("malformed stage config: {0}")]
    Json(#[from] serde_json::Error),
}

impl StageError {
    /// Create an invalid config error.
    pub fn invalid(stage: impl Into<String>, reason: impl Into<String>) -> Self {
        StageError::InvalidConfig {
            stage: stage.into(),
            reason: reason.into(),
        }
    }
}
