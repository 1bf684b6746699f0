//! Prometheus metrics for analysis runs.

use std::net::SocketAddr;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use proctor_models::SessionReport;
use tracing::info;

use crate::error::{WorkerError, WorkerResult};

/// Metric names as constants for consistency.
pub mod names {
    pub const SESSIONS_TOTAL: &str = "proctor_sessions_total";
    pub const FRAMES_PROCESSED_TOTAL: &str = "proctor_frames_processed_total";
    pub const EVENTS_TOTAL: &str = "proctor_events_total";
    pub const SESSION_DURATION_SECONDS: &str = "proctor_session_duration_seconds";
    pub const INTEGRITY_SCORE: &str = "proctor_integrity_score";
}

/// Install the Prometheus exporter with an HTTP listener on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> WorkerResult<()> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| WorkerError::config_error(format!("Failed to install Prometheus exporter: {}", e)))?;

    info!(%addr, "Prometheus exporter listening");
    Ok(())
}

/// Record a successful analysis.
pub fn record_session_completed(report: &SessionReport, elapsed_secs: f64) {
    let labels = [("outcome", "completed".to_string())];
    counter!(names::SESSIONS_TOTAL, &labels).increment(1);
    counter!(names::FRAMES_PROCESSED_TOTAL).increment(report.video_info.total_frames);
    histogram!(names::SESSION_DURATION_SECONDS).record(elapsed_secs);
    gauge!(names::INTEGRITY_SCORE).set(report.integrity_analysis.final_integrity_score as f64);

    for event in &report.events {
        let labels = [("type", event.event_type.clone())];
        counter!(names::EVENTS_TOTAL, &labels).increment(1);
    }
}

/// Record a failed analysis.
pub fn record_session_failed(error: &WorkerError) {
    let labels = [("outcome", error.outcome().to_string())];
    counter!(names::SESSIONS_TOTAL, &labels).increment(1);
}
