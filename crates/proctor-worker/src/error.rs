//! Worker error types.

use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Analysis failed: {0}")]
    Engine(#[from] proctor_engine::EngineError),

    #[error("Media error: {0}")]
    Media(#[from] proctor_media::MediaError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("No recordings found in {0}")]
    NoRecordings(String),

    #[error("Task failed: {0}")]
    TaskFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl WorkerError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn task_failed(msg: impl Into<String>) -> Self {
        Self::TaskFailed(msg.into())
    }

    /// Short outcome label used for metrics.
    pub fn outcome(&self) -> &'static str {
        match self {
            WorkerError::Engine(e) if e.is_stream_open() => "stream_open_error",
            WorkerError::Engine(proctor_engine::EngineError::Provider { .. }) => "provider_error",
            WorkerError::Engine(_) => "stream_error",
            WorkerError::Media(e) if e.is_open_failure() => "stream_open_error",
            WorkerError::Media(_) => "media_error",
            WorkerError::ConfigError(_) => "config_error",
            _ => "error",
        }
    }
}
