//! Worker configuration.

use std::net::SocketAddr;
use std::path::PathBuf;

use proctor_engine::EngineConfig;
use proctor_media::ObjectDetectorConfig;

/// Default analysis sample rate (frames per second).
pub const DEFAULT_SAMPLE_FPS: f64 = 5.0;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Frames per second sampled from each recording
    pub sample_fps: f64,
    /// YOLOv8 ONNX model
    pub object_model: String,
    /// Explicit YuNet model; the standard locations are searched when unset
    pub face_model: Option<String>,
    /// Detection confidence floor shared by the detector and the engine
    pub min_confidence: f64,
    /// Directory holding uploaded recordings and their reports
    pub uploads_dir: PathBuf,
    /// Prometheus listener address
    pub metrics_addr: Option<SocketAddr>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            sample_fps: DEFAULT_SAMPLE_FPS,
            object_model: ObjectDetectorConfig::default().model_path,
            face_model: None,
            min_confidence: 0.2,
            uploads_dir: PathBuf::from("uploads"),
            metrics_addr: None,
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create config from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            sample_fps: non_empty("PROCTOR_SAMPLE_FPS")
                .and_then(|s| s.parse::<f64>().ok())
                .filter(|fps| fps.is_finite() && *fps > 0.0)
                .unwrap_or(defaults.sample_fps),
            object_model: non_empty("PROCTOR_OBJECT_MODEL").unwrap_or(defaults.object_model),
            face_model: non_empty("PROCTOR_FACE_MODEL"),
            min_confidence: non_empty("PROCTOR_MIN_CONFIDENCE")
                .and_then(|s| s.parse::<f64>().ok())
                .filter(|c| (0.0..=1.0).contains(c))
                .unwrap_or(defaults.min_confidence),
            uploads_dir: non_empty("PROCTOR_UPLOADS_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.uploads_dir),
            metrics_addr: non_empty("PROCTOR_METRICS_ADDR").and_then(|s| s.parse().ok()),
        }
    }

    /// Engine thresholds for this worker.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig::default().with_min_confidence(self.min_confidence)
    }

    /// Object detector settings for this worker.
    pub fn detector_config(&self) -> ObjectDetectorConfig {
        ObjectDetectorConfig {
            model_path: self.object_model.clone(),
            confidence_threshold: self.min_confidence as f32,
            ..ObjectDetectorConfig::default()
        }
    }
}
