//! OpenCV YuNet face detector.
//!
//! YuNet is a lightweight CNN face detector exposed via OpenCV's
//! FaceDetectorYN API.
//!
//! # Model Download
//! ```bash
//! mkdir -p models/face_detection/yunet
//! curl -L -o models/face_detection/yunet/face_detection_yunet_2023mar.onnx \
//!   "https://github.com/opencv/opencv_zoo/raw/main/models/face_detection_yunet/face_detection_yunet_2023mar.onnx"
//! ```
//!
//! # Requirements
//! - OpenCV 4.8+ for the 2023mar models, 4.5+ for 2022mar

use std::path::Path;

#[cfg(feature = "opencv")]
use proctor_models::BoundingBox;
#[cfg(feature = "opencv")]
use tracing::{debug, info, warn};

#[cfg(feature = "opencv")]
use crate::error::{MediaError, MediaResult};

/// Model paths in preference order.
///
/// IMPORTANT: 2023mar models require OpenCV 4.8+.
/// The 2022mar model is compatible with OpenCV 4.5+ and is used as a fallback.
pub const YUNET_MODEL_PATHS: &[&str] = &[
    "models/face_detection/yunet/face_detection_yunet_2023mar.onnx",
    "models/face_detection/yunet/face_detection_yunet_2023mar_int8bq.onnx",
    "models/face_detection/yunet/face_detection_yunet_2023mar_int8.onnx",
    "/usr/share/opencv/models/face_detection_yunet_2023mar.onnx",
    "models/face_detection/yunet/face_detection_yunet_2022mar.onnx",
    "/usr/share/opencv/models/face_detection_yunet_2022mar.onnx",
];

/// Score threshold for face detection.
pub const SCORE_THRESHOLD: f32 = 0.5;

/// NMS threshold for face detection
pub const NMS_THRESHOLD: f32 = 0.3;

/// Top K faces to keep
pub const TOP_K: i32 = 10;

/// First existing model from [`YUNET_MODEL_PATHS`].
pub fn find_model_path() -> Option<&'static str> {
    YUNET_MODEL_PATHS
        .iter()
        .copied()
        .find(|path| Path::new(path).exists())
}

/// Calculate input size for YuNet.
///
/// Keeps the frame's aspect ratio within a 640x480 budget and aligns both
/// dimensions to multiples of 32.
pub fn calculate_input_size(frame_width: u32, frame_height: u32) -> (i32, i32) {
    let target_width = 640.0;
    let target_height = 480.0;

    let scale = (frame_width as f64 / target_width)
        .max(frame_height as f64 / target_height)
        .max(1.0);

    let mut input_width = (frame_width as f64 / scale).round() as i32;
    let mut input_height = (frame_height as f64 / scale).round() as i32;

    // Round to nearest multiple of 32 for CNN feature map alignment
    const ALIGNMENT: i32 = 32;
    input_width = ((input_width + ALIGNMENT / 2) / ALIGNMENT) * ALIGNMENT;
    input_height = ((input_height + ALIGNMENT / 2) / ALIGNMENT) * ALIGNMENT;

    (input_width.clamp(160, 640), input_height.clamp(128, 480))
}

/// YuNet face detector using OpenCV.
#[cfg(feature = "opencv")]
pub struct YuNetDetector {
    detector: opencv::core::Ptr<opencv::objdetect::FaceDetectorYN>,
    input_size: (i32, i32),
    frame_size: (u32, u32),
}

#[cfg(feature = "opencv")]
impl YuNetDetector {
    /// Create a YuNet detector for frames of the given size.
    pub fn new(model_path: &str, frame_width: u32, frame_height: u32) -> MediaResult<Self> {
        let model_metadata = std::fs::metadata(model_path).map_err(|_| MediaError::model_not_found(model_path))?;

        if model_metadata.len() < 50_000 {
            return Err(MediaError::detection_failed(format!(
                "YuNet model file appears corrupted (size: {} bytes)",
                model_metadata.len()
            )));
        }

        let (input_width, input_height) = calculate_input_size(frame_width, frame_height);
        let detector = Self::create_detector_with_fallback(model_path, input_width, input_height)?;

        info!(
            model = model_path,
            frame_width,
            frame_height,
            input_width,
            input_height,
            "YuNet detector initialized"
        );

        Ok(Self {
            detector,
            input_size: (input_width, input_height),
            frame_size: (frame_width, frame_height),
        })
    }

    /// Frame size this detector was built for.
    pub fn frame_size(&self) -> (u32, u32) {
        self.frame_size
    }

    /// Create detector with fallback to different backends.
    fn create_detector_with_fallback(
        model_path: &str,
        input_width: i32,
        input_height: i32,
    ) -> MediaResult<opencv::core::Ptr<opencv::objdetect::FaceDetectorYN>> {
        use opencv::dnn::{DNN_BACKEND_DEFAULT, DNN_BACKEND_OPENCV, DNN_TARGET_CPU};
        use opencv::objdetect::FaceDetectorYN;

        let backends = [
            (DNN_BACKEND_DEFAULT, DNN_TARGET_CPU, "default"),
            (DNN_BACKEND_OPENCV, DNN_TARGET_CPU, "opencv"),
        ];

        let mut last_error = String::new();

        for (backend_id, target_id, backend_name) in backends {
            match FaceDetectorYN::create(
                model_path,
                "",
                opencv::core::Size::new(input_width, input_height),
                SCORE_THRESHOLD,
                NMS_THRESHOLD,
                TOP_K,
                backend_id,
                target_id,
            ) {
                Ok(detector) => {
                    debug!(backend = backend_name, "YuNet created");
                    return Ok(detector);
                }
                Err(e) => {
                    warn!(backend = backend_name, error = %e, "YuNet backend failed");
                    last_error = e.to_string();
                }
            }
        }

        Err(MediaError::detection_failed(format!(
            "Failed to create YuNet detector with any backend: {}",
            last_error
        )))
    }

    /// Detect faces in a BGR frame.
    ///
    /// Returns `(bbox, score)` pairs in frame pixel coordinates, highest
    /// score first.
    pub fn detect_in_frame(&mut self, frame: &opencv::core::Mat) -> MediaResult<Vec<(BoundingBox, f64)>> {
        use opencv::core::{Mat, Size};
        use opencv::imgproc;
        use opencv::prelude::{FaceDetectorYNTrait, MatTraitConst};

        if frame.empty() || frame.cols() <= 0 || frame.rows() <= 0 {
            return Err(MediaError::detection_failed("Empty frame provided to YuNet"));
        }

        let frame_width = frame.cols() as f64;
        let frame_height = frame.rows() as f64;
        let input = Size::new(self.input_size.0, self.input_size.1);

        let mut resized = Mat::default();
        imgproc::resize(frame, &mut resized, input, 0.0, 0.0, imgproc::INTER_LINEAR)
            .map_err(|e| MediaError::detection_failed(format!("Failed to resize frame: {}", e)))?;

        // Required for some OpenCV versions
        if let Err(e) = self.detector.set_input_size(input) {
            debug!(error = %e, "Failed to set YuNet input size");
        }

        let mut faces = Mat::default();
        self.detector
            .detect(&resized, &mut faces)
            .map_err(|e| MediaError::detection_failed(format!("YuNet detection failed: {}", e)))?;

        let mut results = self.parse_detection_results(&faces, frame_width, frame_height);
        results.sort_by(|a, b| b.1.total_cmp(&a.1));
        Ok(results)
    }

    /// Parse YuNet detection output matrix into bounding boxes.
    ///
    /// YuNet output format per row:
    /// [x, y, w, h, x_re, y_re, x_le, y_le, x_n, y_n, x_ml, y_ml, x_mr, y_mr, score]
    fn parse_detection_results(
        &self,
        faces: &opencv::core::Mat,
        frame_width: f64,
        frame_height: f64,
    ) -> Vec<(BoundingBox, f64)> {
        use opencv::prelude::MatTraitConst;

        let num_faces = faces.rows();
        if num_faces <= 0 {
            return Vec::new();
        }
        if faces.cols() < 15 {
            warn!(columns = faces.cols(), "YuNet output has unexpected format");
            return Vec::new();
        }

        let scale_x = frame_width / self.input_size.0 as f64;
        let scale_y = frame_height / self.input_size.1 as f64;
        let at = |row: i32, col: i32| faces.at_2d::<f32>(row, col).map(|v| *v as f64).ok();

        let mut results = Vec::with_capacity(num_faces as usize);
        for i in 0..num_faces {
            let (Some(x), Some(y), Some(w), Some(h), Some(score)) =
                (at(i, 0), at(i, 1), at(i, 2), at(i, 3), at(i, 14))
            else {
                continue;
            };

            if score < SCORE_THRESHOLD as f64 {
                continue;
            }

            // Clamp to frame bounds
            let x0 = (x * scale_x).max(0.0);
            let y0 = (y * scale_y).max(0.0);
            let x1 = ((x + w) * scale_x).min(frame_width);
            let y1 = ((y + h) * scale_y).min(frame_height);
            if x1 <= x0 || y1 <= y0 {
                continue;
            }

            results.push((BoundingBox::new(x0, y0, x1 - x0, y1 - y0), score));
        }

        debug!(faces = results.len(), candidates = num_faces, "YuNet detection");
        results
    }
}
