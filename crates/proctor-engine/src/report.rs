//! Report assembly.

use chrono::{DateTime, Utc};
use proctor_models::{ReportSummary, SessionReport, VideoInfo};

use crate::event_log::EventLog;
use crate::scorer;

/// Combine session metadata and the final event log into a report.
///
/// `fps` is the effective rate of the analysed frame sequence; the duration
/// is derived from it and the frame count.
pub fn assemble_report(
    path: &str,
    fps: f64,
    total_frames: u64,
    log: EventLog,
    processed_at: DateTime<Utc>,
) -> SessionReport {
    let events = log.into_sorted();
    let integrity_analysis = scorer::score(&events);
    let summary = ReportSummary::from_events(&events);

    let duration_seconds = if fps > 0.0 {
        total_frames as f64 / fps
    } else {
        0.0
    };

    SessionReport {
        video_info: VideoInfo {
            path: path.to_string(),
            duration_seconds,
            total_frames,
            fps,
            processed_at,
        },
        integrity_analysis,
        events,
        summary,
    }
}
