//! Per-frame perceptual signals.
//!
//! These are the values produced by the external detection and face signal
//! providers for every analysed frame, plus the decoded frame itself.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Bounding box in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema, Default)]
pub struct BoundingBox {
    /// Left edge x-coordinate
    pub x: f64,
    /// Top edge y-coordinate
    pub y: f64,
    /// Box width
    pub width: f64,
    /// Box height
    pub height: f64,
}

impl BoundingBox {
    /// Create a new bounding box.
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Center x-coordinate.
    #[inline]
    pub fn cx(&self) -> f64 {
        self.x + self.width / 2.0
    }

    /// Center y-coordinate.
    #[inline]
    pub fn cy(&self) -> f64 {
        self.y + self.height / 2.0
    }

    /// Box area in pixels.
    #[inline]
    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// Center expressed as a fraction of the frame size.
    pub fn normalized_center(&self, frame_width: u32, frame_height: u32) -> (f64, f64) {
        if frame_width == 0 || frame_height == 0 {
            return (0.0, 0.0);
        }
        (
            self.cx() / frame_width as f64,
            self.cy() / frame_height as f64,
        )
    }
}

/// A class-labelled object detection reported by the detection provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Detection {
    /// Class label as reported by the detector (e.g. `"cell phone"`)
    pub class_label: String,
    /// Detection confidence [0, 1]
    pub confidence: f64,
    /// Location of the object in the frame
    pub bbox: BoundingBox,
    /// Frame timestamp in seconds
    pub timestamp: f64,
}

impl Detection {
    pub fn new(
        class_label: impl Into<String>,
        confidence: f64,
        bbox: BoundingBox,
        timestamp: f64,
    ) -> Self {
        Self {
            class_label: class_label.into(),
            confidence,
            bbox,
            timestamp,
        }
    }
}

/// Face presence and focus summary for a single frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FaceSignal {
    /// At least one face is visible
    pub has_face: bool,
    /// Number of faces visible
    pub face_count: u32,
    /// The primary face is looking at the screen
    pub is_focused: bool,
    /// Frame timestamp in seconds
    pub timestamp: f64,
}

impl FaceSignal {
    /// Signal for a frame with no visible face.
    pub fn absent(timestamp: f64) -> Self {
        Self {
            has_face: false,
            face_count: 0,
            is_focused: false,
            timestamp,
        }
    }

    /// Signal for a frame with `face_count` visible faces.
    pub fn with_faces(face_count: u32, is_focused: bool, timestamp: f64) -> Self {
        Self {
            has_face: face_count > 0,
            face_count,
            is_focused: face_count > 0 && is_focused,
            timestamp,
        }
    }

    /// More than one face is visible.
    pub fn has_multiple_faces(&self) -> bool {
        self.face_count > 1
    }

    /// Exactly one face is visible, the only case where focus is judged.
    pub fn has_single_face(&self) -> bool {
        self.has_face && self.face_count == 1
    }
}

/// A decoded video frame in packed RGB24 layout.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Zero-based index in the analysed sequence
    pub index: u64,
    /// Presentation time in seconds
    pub timestamp: f64,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// `width * height * 3` bytes
    pub data: Vec<u8>,
}

impl Frame {
    /// Expected buffer length for the given dimensions.
    pub fn rgb_len(width: u32, height: u32) -> usize {
        width as usize * height as usize * 3
    }

    /// Whether the buffer length matches the frame dimensions.
    pub fn is_well_formed(&self) -> bool {
        self.data.len() == Self::rgb_len(self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bbox_center() {
        let bbox = BoundingBox::new(100.0, 50.0, 200.0, 100.0);
        assert!((bbox.cx() - 200.0).abs() < 1e-9);
        assert!((bbox.cy() - 100.0).abs() < 1e-9);
        assert!((bbox.area() - 20000.0).abs() < 1e-9);
    }

    #[test]
    fn test_normalized_center() {
        let bbox = BoundingBox::new(280.0, 200.0, 80.0, 80.0);
        let (nx, ny) = bbox.normalized_center(640, 480);
        assert!((nx - 0.5).abs() < 1e-9);
        assert!((ny - 0.5).abs() < 1e-9);
        assert_eq!(bbox.normalized_center(0, 480), (0.0, 0.0));
    }

    #[test]
    fn test_face_signal_constructors() {
        let absent = FaceSignal::absent(1.0);
        assert!(!absent.has_face);
        assert_eq!(absent.face_count, 0);

        let two = FaceSignal::with_faces(2, true, 2.0);
        assert!(two.has_multiple_faces());
        assert!(!two.has_single_face());

        let none_focused = FaceSignal::with_faces(0, true, 3.0);
        assert!(!none_focused.is_focused);
    }

    #[test]
    fn test_frame_well_formed() {
        let frame = Frame {
            index: 0,
            timestamp: 0.0,
            width: 4,
            height: 2,
            data: vec![0; 24],
        };
        assert!(frame.is_well_formed());
        assert_eq!(Frame::rgb_len(640, 480), 921_600);
    }
}
