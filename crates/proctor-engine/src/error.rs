//! Error types for the analysis engine.

use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that abort an analysis run.
///
/// Scoring never fails; every variant here comes from the frame source,
/// a provider, or a malformed replay trace.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Failed to open frame source: {0}")]
    StreamOpen(String),

    #[error("Frame stream failed: {0}")]
    Stream(String),

    #[error("Provider {provider} failed: {message}")]
    Provider {
        provider: &'static str,
        message: String,
    },

    #[error("Frame timestamp went backwards: {current:.3}s after {previous:.3}s")]
    OutOfOrderFrame { previous: f64, current: f64 },

    #[error("Invalid signal trace: {0}")]
    Trace(String),
}

impl EngineError {
    /// Create a stream open error.
    pub fn stream_open(message: impl Into<String>) -> Self {
        Self::StreamOpen(message.into())
    }

    /// Create a mid-stream failure error.
    pub fn stream(message: impl Into<String>) -> Self {
        Self::Stream(message.into())
    }

    /// Create a provider failure error.
    pub fn provider(provider: &'static str, message: impl Into<String>) -> Self {
        Self::Provider {
            provider,
            message: message.into(),
        }
    }

    /// Create a trace error.
    pub fn trace(message: impl Into<String>) -> Self {
        Self::Trace(message.into())
    }

    /// Whether the run failed before any frame was read.
    pub fn is_stream_open(&self) -> bool {
        matches!(self, EngineError::StreamOpen(_))
    }
}
