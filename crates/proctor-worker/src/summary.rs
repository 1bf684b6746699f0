//! Human-readable report summaries for the CLI.

use std::fmt::Write;

use proctor_models::timestamp::{format_offset, format_seconds};
use proctor_models::SessionReport;

use crate::reports::ReportEntry;

/// Render the text summary printed after an analysis.
pub fn render_summary(report: &SessionReport) -> String {
    let info = &report.video_info;
    let integrity = &report.integrity_analysis;
    let summary = &report.summary;
    let rating = integrity.rating();

    let mut out = String::new();
    let _ = writeln!(out, "Analysis of {}", info.path);
    let _ = writeln!(
        out,
        "Duration: {} ({} frames at {} fps)",
        format_seconds(info.duration_seconds),
        info.total_frames,
        info.fps
    );
    let _ = writeln!(
        out,
        "Integrity score: {}/100 ({}: {})",
        integrity.final_integrity_score,
        rating,
        rating.description()
    );
    let _ = writeln!(
        out,
        "Events: {} total, {} critical, {} warning",
        summary.total_events, summary.critical_events, summary.warning_events
    );

    for line in &integrity.deductions_breakdown {
        let _ = writeln!(out, "  {}", line);
    }

    if !report.events.is_empty() {
        let _ = writeln!(out, "Timeline:");
        for event in &report.events {
            let _ = writeln!(
                out,
                "  [{}] {}: {}",
                format_offset(event.timestamp),
                event.severity.as_str().to_uppercase(),
                event.message
            );
        }
    }

    out
}

/// Render the report listing for `proctor reports`.
pub fn render_report_list(entries: &[ReportEntry]) -> String {
    if entries.is_empty() {
        return "No reports found\n".to_string();
    }

    let mut out = String::new();
    for entry in entries {
        let _ = writeln!(
            out,
            "{}  {}  {}",
            entry.modified.format("%Y-%m-%d %H:%M:%S"),
            entry.report_path.display(),
            entry.video_path.display()
        );
    }
    out
}
