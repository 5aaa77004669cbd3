//! Error types for engine operations.

use thiserror::Error;

use crate::novelty::NoveltyError;
use crate::sink::SinkError;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors reported by the engine.
///
/// Rule evaluation itself is total; these cover caller precondition
/// violations and the I/O edges (configuration, persistence, sinks).
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Frame {got} arrived after frame {last}; frames must be strictly increasing")]
    OutOfOrderFrame { last: u64, got: u64 },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Novelty error: {0}")]
    Novelty(#[from] NoveltyError),

    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

impl EngineError {
    /// Create an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }

    /// Create an out-of-order frame error.
    pub fn out_of_order(last: u64, got: u64) -> Self {
        Self::OutOfOrderFrame { last, got }
    }
}
