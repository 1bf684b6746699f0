//! Structured session logging utilities.
//!
//! Provides tracing subscriber setup for the binaries and consistent,
//! structured logging for analysis sessions.

use tracing::{error, info, warn, Span};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use uuid::Uuid;

/// Default filter directives added on top of `RUST_LOG`.
///
/// Targets match by prefix, so `proctor` covers every workspace crate.
const DEFAULT_DIRECTIVES: &[&str] = &["proctor=info", "ort=warn", "onnxruntime=warn"];

/// Whether `LOG_FORMAT` asks for JSON output.
pub fn use_json_format(log_format: Option<&str>) -> bool {
    log_format
        .map(|v| v.trim().eq_ignore_ascii_case("json"))
        .unwrap_or(false)
}

/// Build the env filter: `RUST_LOG` plus the default directives.
pub fn build_env_filter() -> EnvFilter {
    DEFAULT_DIRECTIVES
        .iter()
        .filter_map(|d| d.parse().ok())
        .fold(EnvFilter::from_default_env(), |filter, directive| {
            filter.add_directive(directive)
        })
}

/// Initialize tracing with colored output for dev, JSON for production.
pub fn init_tracing() {
    let use_json = use_json_format(std::env::var("LOG_FORMAT").ok().as_deref());
    let env_filter = build_env_filter();

    // Output goes to stderr so stdout stays clean for reports and schemas
    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
}

/// Session logger for structured logging with consistent formatting.
///
/// Every line carries the session ID and operation so interleaved runs
/// can be separated in aggregated logs.
#[derive(Debug, Clone)]
pub struct SessionLogger {
    session_id: String,
    operation: String,
}

impl SessionLogger {
    /// Create a logger with a fresh session ID.
    pub fn new(operation: &str) -> Self {
        Self::from_string(&Uuid::new_v4().to_string(), operation)
    }

    /// Create a logger for an existing session ID.
    pub fn from_string(session_id: &str, operation: &str) -> Self {
        Self {
            session_id: session_id.to_string(),
            operation: operation.to_string(),
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(
            session_id = %self.session_id,
            operation = %self.operation,
            "Session started: {}", message
        );
    }

    pub fn log_progress(&self, message: &str) {
        info!(
            session_id = %self.session_id,
            operation = %self.operation,
            "Session progress: {}", message
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!(
            session_id = %self.session_id,
            operation = %self.operation,
            "Session warning: {}", message
        );
    }

    pub fn log_error(&self, message: &str) {
        error!(
            session_id = %self.session_id,
            operation = %self.operation,
            "Session error: {}", message
        );
    }

    pub fn log_completion(&self, message: &str) {
        info!(
            session_id = %self.session_id,
            operation = %self.operation,
            "Session completed: {}", message
        );
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Create a tracing span for this session.
    ///
    /// Engine logs emitted inside the span inherit the session fields.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "session",
            session_id = %self.session_id,
            operation = %self.operation
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_logger_creation() {
        let logger = SessionLogger::new("analyze");
        assert!(Uuid::parse_str(logger.session_id()).is_ok());
        assert_eq!(logger.operation(), "analyze");

        let other = SessionLogger::new("analyze");
        assert_ne!(logger.session_id(), other.session_id());
    }

    #[test]
    fn test_session_logger_from_string() {
        let logger = SessionLogger::from_string("session-123", "replay");
        assert_eq!(logger.session_id(), "session-123");
        assert_eq!(logger.operation(), "replay");

        // No subscriber installed; logging must still be a no-op
        logger.log_start("trace.json");
        logger.log_progress("300 frames");
        logger.log_warning("recording has no duration metadata");
        logger.log_error("stream failed");
        logger.log_completion("score 85");
    }

    #[test]
    fn test_json_format_detection() {
        assert!(use_json_format(Some("json")));
        assert!(use_json_format(Some(" JSON ")));
        assert!(!use_json_format(Some("pretty")));
        assert!(!use_json_format(None));
    }

    #[test]
    fn test_default_directives_parse() {
        for directive in DEFAULT_DIRECTIVES {
            assert!(directive.parse::<tracing_subscriber::filter::Directive>().is_ok());
        }
    }
}
