//! Session report models.
//!
//! `SessionReport` is the terminal artifact of an analysis run. Its JSON
//! projection uses stable keys consumed by report storage and the UI:
//!
//! ```json
//! {
//!   "video_info": { "path": "...", "duration_seconds": 60.0, "total_frames": 300, "fps": 5.0, "processed_at": "..." },
//!   "integrity_analysis": { "final_integrity_score": 85, "summary_details": { ... }, "deductions_breakdown": [ ... ] },
//!   "events": [ { "type": "cell_phone_detected", "timestamp": 12.4, "severity": "critical", "message": "...", "confidence": 0.81 } ],
//!   "summary": { "total_events": 1, "critical_events": 1, "warning_events": 0, "object_detections": 1, "face_events": 0, "focus_events": 0 }
//! }
//! ```

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::event::Event;

/// Metadata about the analysed recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct VideoInfo {
    /// Source path of the recording
    pub path: String,
    /// Analysed duration in seconds
    pub duration_seconds: f64,
    /// Number of frames analysed
    pub total_frames: u64,
    /// Effective analysis frame rate
    pub fps: f64,
    /// When the analysis finished
    pub processed_at: DateTime<Utc>,
}

/// An object class that produced at least one detection event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct DetectedItem {
    /// Human-readable item name (`"cell phone"`)
    pub label: String,
    /// Number of detection episodes
    pub count: u32,
}

/// Per-category event counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SummaryDetails {
    pub focus_lost_count: u32,
    pub face_absent_count: u32,
    pub multiple_faces_count: u32,
    /// Keyed by event type (`cell_phone_detected`)
    pub detected_items: BTreeMap<String, DetectedItem>,
}

/// Integrity score with an explainable breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct IntegrityReport {
    /// 0 to 100, higher is better
    pub final_integrity_score: u32,
    pub summary_details: SummaryDetails,
    /// One line per penalised event type
    pub deductions_breakdown: Vec<String>,
}

impl IntegrityReport {
    /// Qualitative band for the score.
    pub fn rating(&self) -> IntegrityRating {
        IntegrityRating::from_score(self.final_integrity_score)
    }
}

/// Qualitative integrity band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum IntegrityRating {
    /// 80-100
    Excellent,
    /// 60-79
    Good,
    /// 40-59
    Fair,
    /// 0-39
    Poor,
}

impl IntegrityRating {
    pub fn from_score(score: u32) -> Self {
        match score {
            80.. => IntegrityRating::Excellent,
            60..=79 => IntegrityRating::Good,
            40..=59 => IntegrityRating::Fair,
            _ => IntegrityRating::Poor,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            IntegrityRating::Excellent => "Excellent",
            IntegrityRating::Good => "Good",
            IntegrityRating::Fair => "Fair",
            IntegrityRating::Poor => "Poor",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            IntegrityRating::Excellent => "High integrity, minimal violations",
            IntegrityRating::Good => "Acceptable with minor concerns",
            IntegrityRating::Fair => "Moderate violations detected",
            IntegrityRating::Poor => "Significant integrity concerns",
        }
    }
}

impl fmt::Display for IntegrityRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Aggregate event counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ReportSummary {
    pub total_events: u32,
    pub critical_events: u32,
    pub warning_events: u32,
    pub object_detections: u32,
    pub face_events: u32,
    pub focus_events: u32,
}

impl ReportSummary {
    pub fn from_events(events: &[Event]) -> Self {
        let count = |pred: fn(&Event) -> bool| events.iter().filter(|&e| pred(e)).count() as u32;

        Self {
            total_events: events.len() as u32,
            critical_events: count(Event::is_critical),
            warning_events: count(Event::is_warning),
            object_detections: count(Event::is_object_detection),
            face_events: count(Event::is_face_event),
            focus_events: count(Event::is_focus_event),
        }
    }
}

/// Complete analysis report for one recorded session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SessionReport {
    pub video_info: VideoInfo,
    pub integrity_analysis: IntegrityReport,
    /// Events sorted by timestamp
    pub events: Vec<Event>,
    pub summary: ReportSummary,
}
