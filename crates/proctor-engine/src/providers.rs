//! Seams between the engine and its perception backends.
//!
//! The engine never decodes video or runs models itself. A [`FrameSource`]
//! yields decoded frames, a [`DetectionProvider`] turns a frame into object
//! detections and a [`FaceSignalProvider`] turns it into a face signal.
//! Model-backed implementations live in `proctor-media`.

use proctor_models::{Detection, FaceSignal, Frame};

use crate::error::EngineResult;

/// Finite, ordered sequence of decoded frames.
///
/// Timestamps must be non-decreasing. The iterator yields `Err` once when
/// the stream breaks and should not be polled further afterwards.
pub trait FrameSource: Iterator<Item = EngineResult<Frame>> {
    /// Path or URI the frames are read from.
    fn source_path(&self) -> &str;

    /// Effective frame rate of the yielded sequence.
    fn frame_rate(&self) -> f64;
}

/// Object detector.
pub trait DetectionProvider {
    /// Detections for one frame, timestamped with the frame's timestamp.
    fn detect(&mut self, frame: &Frame) -> EngineResult<Vec<Detection>>;

    /// Short provider name used in logs and errors.
    fn name(&self) -> &'static str;
}

/// Face presence and focus estimator.
pub trait FaceSignalProvider {
    fn face_signal(&mut self, frame: &Frame) -> EngineResult<FaceSignal>;

    fn name(&self) -> &'static str;
}

impl<T: DetectionProvider + ?Sized> DetectionProvider for Box<T> {
    fn detect(&mut self, frame: &Frame) -> EngineResult<Vec<Detection>> {
        (**self).detect(frame)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

impl<T: FaceSignalProvider + ?Sized> FaceSignalProvider for Box<T> {
    fn face_signal(&mut self, frame: &Frame) -> EngineResult<FaceSignal> {
        (**self).face_signal(frame)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

/// In-memory frame source over pre-decoded frames.
#[derive(Debug, Clone)]
pub struct VecFrameSource {
    path: String,
    fps: f64,
    frames: std::vec::IntoIter<Frame>,
}

impl VecFrameSource {
    pub fn new(path: impl Into<String>, fps: f64, frames: Vec<Frame>) -> Self {
        Self {
            path: path.into(),
            fps,
            frames: frames.into_iter(),
        }
    }

    /// `count` blank frames of the given size at `fps`.
    pub fn blank(path: impl Into<String>, fps: f64, count: u64, width: u32, height: u32) -> Self {
        let frames = (0..count)
            .map(|index| Frame {
                index,
                timestamp: if fps > 0.0 { index as f64 / fps } else { 0.0 },
                width,
                height,
                data: vec![0; Frame::rgb_len(width, height)],
            })
            .collect();
        Self::new(path, fps, frames)
    }
}

impl Iterator for VecFrameSource {
    type Item = EngineResult<Frame>;

    fn next(&mut self) -> Option<Self::Item> {
        self.frames.next().map(Ok)
    }
}

impl FrameSource for VecFrameSource {
    fn source_path(&self) -> &str {
        &self.path
    }

    fn frame_rate(&self) -> f64 {
        self.fps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_source_timestamps() {
        let source = VecFrameSource::blank("mem://blank", 4.0, 3, 2, 2);
        assert_eq!(source.source_path(), "mem://blank");
        assert_eq!(source.frame_rate(), 4.0);

        let frames: Vec<Frame> = source.map(|f| f.unwrap()).collect();
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[2].timestamp, 0.5);
        assert!(frames.iter().all(Frame::is_well_formed));
    }
}
