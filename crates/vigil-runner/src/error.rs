//! Runner error types.

use std::path::PathBuf;

use thiserror::Error;

pub type RunnerResult<T> = Result<T, RunnerError>;

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("Invalid detection at {path}:{line}: {message}")]
    InvalidDetection {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Alert channel closed: {0}")]
    ChannelClosed(String),

    #[error("Task failed: {0}")]
    TaskFailed(String),

    #[error("Engine error: {0}")]
    Engine(#[from] vigil_engine::EngineError),

    #[error("Sink error: {0}")]
    Sink(#[from] vigil_engine::SinkError),

    #[error("Novelty error: {0}")]
    Novelty(#[from] vigil_engine::NoveltyError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RunnerError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn channel_closed(msg: impl Into<String>) -> Self {
        Self::ChannelClosed(msg.into())
    }

    pub fn task_failed(msg: impl Into<String>) -> Self {
        Self::TaskFailed(msg.into())
    }
}
