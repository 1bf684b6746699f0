//! Integrity events emitted by the trackers.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Well-known event type tags.
pub mod event_types {
    pub const FACE_ABSENT: &str = "face_absent";
    pub const MULTIPLE_FACES: &str = "multiple_faces";
    pub const FOCUS_LOST: &str = "focus_lost";

    /// Suffix shared by every object detection event type.
    pub const DETECTED_SUFFIX: &str = "_detected";
}

/// Event type tag for a sighted object class (`"cell phone"` -> `"cell_phone_detected"`).
pub fn detected_event_type(class_label: &str) -> String {
    format!(
        "{}{}",
        class_label.trim().replace(' ', "_"),
        event_types::DETECTED_SUFFIX
    )
}

/// Human-readable item label for an object detection event type.
///
/// Returns `None` for event types that are not object detections.
pub fn detected_item_label(event_type: &str) -> Option<String> {
    event_type
        .strip_suffix(event_types::DETECTED_SUFFIX)
        .filter(|item| !item.is_empty())
        .map(|item| item.replace('_', " "))
}

/// Human-readable label for any event type (`"multiple_faces"` -> `"multiple faces"`).
pub fn event_type_label(event_type: &str) -> String {
    event_type.replace('_', " ")
}

/// Event severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Critical,
    Warning,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::Warning => "warning",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Severity {
    type Err = SeverityParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "critical" => Ok(Severity::Critical),
            "warning" => Ok(Severity::Warning),
            _ => Err(SeverityParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Error)]
#[error("Unknown severity: {0}")]
pub struct SeverityParseError(String);

/// A single integrity event.
///
/// Events are immutable once appended to a session's event log; the
/// timestamp always marks the start of the episode that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Event {
    /// Event type tag (`face_absent`, `cell_phone_detected`, ...)
    #[serde(rename = "type")]
    pub event_type: String,
    /// Episode start in seconds from the beginning of the recording
    pub timestamp: f64,
    pub severity: Severity,
    pub message: String,
    /// Peak detector confidence for object events
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

impl Event {
    pub fn new(
        event_type: impl Into<String>,
        timestamp: f64,
        severity: Severity,
        message: impl Into<String>,
    ) -> Self {
        Self {
            event_type: event_type.into(),
            timestamp,
            severity,
            message: message.into(),
            confidence: None,
        }
    }

    pub fn critical(event_type: impl Into<String>, timestamp: f64, message: impl Into<String>) -> Self {
        Self::new(event_type, timestamp, Severity::Critical, message)
    }

    pub fn warning(event_type: impl Into<String>, timestamp: f64, message: impl Into<String>) -> Self {
        Self::new(event_type, timestamp, Severity::Warning, message)
    }

    /// Attach a detector confidence.
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    pub fn is_critical(&self) -> bool {
        self.severity == Severity::Critical
    }

    pub fn is_warning(&self) -> bool {
        self.severity == Severity::Warning
    }

    /// Whether this is an object detection event.
    pub fn is_object_detection(&self) -> bool {
        self.event_type.contains("detected")
    }

    pub fn is_face_event(&self) -> bool {
        self.event_type.contains("face")
    }

    pub fn is_focus_event(&self) -> bool {
        self.event_type.contains("focus")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detected_event_type() {
        assert_eq!(detected_event_type("cell phone"), "cell_phone_detected");
        assert_eq!(detected_event_type("book"), "book_detected");
    }

    #[test]
    fn test_detected_item_label() {
        assert_eq!(
            detected_item_label("cell_phone_detected").as_deref(),
            Some("cell phone")
        );
        assert_eq!(detected_item_label("face_absent"), None);
        assert_eq!(detected_item_label("_detected"), None);
    }

    #[test]
    fn test_severity_parse() {
        assert_eq!("critical".parse::<Severity>().unwrap(), Severity::Critical);
        assert_eq!("WARNING".parse::<Severity>().unwrap(), Severity::Warning);
        assert!("info".parse::<Severity>().is_err());
        assert_eq!(Severity::Warning.to_string(), "warning");
    }

    #[test]
    fn test_event_serialization_keys() {
        let event = Event::critical("cell_phone_detected", 1.5, "Cell Phone detected in frame")
            .with_confidence(0.8);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "cell_phone_detected");
        assert_eq!(json["severity"], "critical");
        assert_eq!(json["confidence"], 0.8);

        let absent = Event::critical(event_types::FACE_ABSENT, 2.0, "No face detected");
        let json = serde_json::to_value(&absent).unwrap();
        assert!(json.get("confidence").is_none());
    }

    #[test]
    fn test_event_categories() {
        let event = Event::warning(event_types::FOCUS_LOST, 0.0, "");
        assert!(event.is_focus_event());
        assert!(!event.is_face_event());
        assert!(event.is_warning());

        let multi = Event::critical(event_types::MULTIPLE_FACES, 0.0, "");
        assert!(multi.is_face_event());
        assert!(!multi.is_object_detection());
    }
}
