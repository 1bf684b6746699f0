//! Video decoding and perception providers for proctoring analysis.
//!
//! This crate provides:
//! - FFprobe stream probing
//! - An FFmpeg rawvideo [`FrameSource`](proctor_engine::FrameSource)
//! - A YOLOv8 (ONNX Runtime) [`DetectionProvider`](proctor_engine::DetectionProvider)
//! - A YuNet (OpenCV) [`FaceSignalProvider`](proctor_engine::FaceSignalProvider),
//!   available with the `opencv` feature

pub mod error;
pub mod face_signals;
pub mod frame_source;
pub mod object_detector;
pub mod probe;
pub mod yunet;

pub use error::{MediaError, MediaResult};
pub use face_signals::{face_signal_from_faces, is_focused, YuNetFaceProvider};
pub use frame_source::{FfmpegFrameSource, RawFrameReader};
pub use object_detector::{ObjectDetectorConfig, YoloObjectDetector, TARGET_CLASSES};
pub use probe::{probe_video, VideoProbe};

/// Whether FFmpeg and FFprobe are both on PATH.
pub fn ffmpeg_available() -> bool {
    which::which("ffmpeg").is_ok() && which::which("ffprobe").is_ok()
}
