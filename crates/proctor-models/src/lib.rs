//! Shared data models for the proctoring analysis engine.
//!
//! This crate provides Serde-serializable types for:
//! - Per-frame perceptual signals (detections, face signals, frames)
//! - Integrity events and severities
//! - Integrity scores and session reports
//! - Timestamp formatting for event listings

pub mod detection;
pub mod event;
pub mod report;
pub mod timestamp;

// Re-export common types
pub use detection::{BoundingBox, Detection, FaceSignal, Frame};
pub use event::{
    detected_event_type, detected_item_label, event_type_label, event_types, Event, Severity,
};
pub use report::{
    DetectedItem, IntegrityRating, IntegrityReport, ReportSummary, SessionReport,
    SummaryDetails, VideoInfo,
};
