//! Tracker thresholds.

use serde::{Deserialize, Serialize};

/// Configuration for the object persistence tracker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectTrackerConfig {
    /// Sighting span (seconds) an episode must exceed before it is reported
    pub persistence_secs: f64,
    /// Unseen time (seconds) after which a track is evicted
    pub expiry_secs: f64,
    /// Detections below this confidence are ignored
    pub min_confidence: f64,
}

impl Default for ObjectTrackerConfig {
    fn default() -> Self {
        Self {
            persistence_secs: 1.0,
            expiry_secs: 5.0,
            min_confidence: 0.2,
        }
    }
}

/// Configuration for the face/focus tracker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FaceTrackerConfig {
    /// Continuous absence (seconds) before `face_absent` fires
    pub absence_threshold_secs: f64,
    /// Continuous unfocused time (seconds) before `focus_lost` fires
    pub focus_threshold_secs: f64,
}

impl Default for FaceTrackerConfig {
    fn default() -> Self {
        Self {
            absence_threshold_secs: 3.0,
            focus_threshold_secs: 2.0,
        }
    }
}

/// Engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub objects: ObjectTrackerConfig,
    pub faces: FaceTrackerConfig,
}

impl EngineConfig {
    /// Override the detection confidence floor.
    pub fn with_min_confidence(mut self, min_confidence: f64) -> Self {
        self.objects.min_confidence = min_confidence;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert!((config.objects.persistence_secs - 1.0).abs() < 1e-9);
        assert!((config.objects.expiry_secs - 5.0).abs() < 1e-9);
        assert!((config.objects.min_confidence - 0.2).abs() < 1e-9);
        assert!((config.faces.absence_threshold_secs - 3.0).abs() < 1e-9);
        assert!((config.faces.focus_threshold_secs - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_partial_deserialize() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"faces": {"focus_threshold_secs": 4.0}}"#).unwrap();
        assert!((config.faces.focus_threshold_secs - 4.0).abs() < 1e-9);
        assert!((config.faces.absence_threshold_secs - 3.0).abs() < 1e-9);
        assert_eq!(config.objects, ObjectTrackerConfig::default());
    }
}
