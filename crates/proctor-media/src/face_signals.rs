//! Face signal provider.
//!
//! Turns per-frame face detections into a [`FaceSignal`]: how many faces
//! are visible, and whether the candidate is looking at the screen.
//!
//! Focus is a positional heuristic: the highest-scoring face counts as
//! focused while its center stays inside the middle band of the frame on
//! both axes.

use proctor_engine::{EngineResult, FaceSignalProvider};
use proctor_models::{BoundingBox, FaceSignal, Frame};

use crate::error::{MediaError, MediaResult};

/// Lower bound of the focus band (normalised, exclusive).
pub const FOCUS_BAND_MIN: f64 = 0.2;
/// Upper bound of the focus band (normalised, exclusive).
pub const FOCUS_BAND_MAX: f64 = 0.8;

/// Whether a face centred in `bbox` counts as looking at the screen.
pub fn is_focused(bbox: &BoundingBox, frame_width: u32, frame_height: u32) -> bool {
    if frame_width == 0 || frame_height == 0 {
        return false;
    }
    let (nx, ny) = bbox.normalized_center(frame_width, frame_height);
    let inside = |v: f64| v > FOCUS_BAND_MIN && v < FOCUS_BAND_MAX;
    inside(nx) && inside(ny)
}

/// Build a face signal from detections sorted by descending score.
pub fn face_signal_from_faces(
    faces: &[(BoundingBox, f64)],
    frame_width: u32,
    frame_height: u32,
    timestamp: f64,
) -> FaceSignal {
    let focused = faces
        .first()
        .map(|(bbox, _)| is_focused(bbox, frame_width, frame_height))
        .unwrap_or(false);
    FaceSignal::with_faces(faces.len() as u32, focused, timestamp)
}

/// YuNet-backed face signal provider.
///
/// The detector is built lazily for the first frame's dimensions and
/// rebuilt if they change.
#[cfg(feature = "opencv")]
pub struct YuNetFaceProvider {
    model_path: String,
    detector: Option<crate::yunet::YuNetDetector>,
}

#[cfg(feature = "opencv")]
impl YuNetFaceProvider {
    /// Create a provider. Uses `model_path` when given, otherwise the first
    /// model found in the standard locations.
    pub fn new(model_path: Option<&str>) -> MediaResult<Self> {
        let model_path = match model_path {
            Some(path) if std::path::Path::new(path).exists() => path.to_string(),
            Some(path) => return Err(MediaError::model_not_found(path)),
            None => crate::yunet::find_model_path()
                .ok_or_else(|| MediaError::model_not_found("YuNet face detection model"))?
                .to_string(),
        };

        Ok(Self {
            model_path,
            detector: None,
        })
    }

    fn signal_for(&mut self, frame: &Frame) -> MediaResult<FaceSignal> {
        use crate::yunet::YuNetDetector;

        let size = (frame.width, frame.height);
        let detector = match self.detector.take() {
            Some(detector) if detector.frame_size() == size => detector,
            _ => YuNetDetector::new(&self.model_path, frame.width, frame.height)?,
        };
        let detector = self.detector.insert(detector);

        let mat = frame_to_bgr_mat(frame)?;
        let faces = detector.detect_in_frame(&mat)?;
        Ok(face_signal_from_faces(&faces, frame.width, frame.height, frame.timestamp))
    }
}

/// Copy a packed RGB24 frame into a BGR OpenCV matrix.
#[cfg(feature = "opencv")]
fn frame_to_bgr_mat(frame: &Frame) -> MediaResult<opencv::core::Mat> {
    use opencv::core::{Mat, Scalar, CV_8UC3};
    use opencv::imgproc;
    use opencv::prelude::MatTrait;

    if !frame.is_well_formed() {
        return Err(MediaError::detection_failed(format!(
            "Frame {} has {} bytes, expected {}",
            frame.index,
            frame.data.len(),
            Frame::rgb_len(frame.width, frame.height)
        )));
    }

    let cv_err = |e: opencv::Error| MediaError::detection_failed(format!("OpenCV error: {}", e));

    let mut rgb = Mat::new_rows_cols_with_default(
        frame.height as i32,
        frame.width as i32,
        CV_8UC3,
        Scalar::all(0.0),
    )
    .map_err(cv_err)?;
    rgb.data_bytes_mut().map_err(cv_err)?.copy_from_slice(&frame.data);

    let mut bgr = Mat::default();
    imgproc::cvt_color_def(&rgb, &mut bgr, imgproc::COLOR_RGB2BGR).map_err(cv_err)?;
    Ok(bgr)
}

/// Placeholder when OpenCV is not available; construction always fails.
#[cfg(not(feature = "opencv"))]
pub struct YuNetFaceProvider {
    _private: (),
}

#[cfg(not(feature = "opencv"))]
impl YuNetFaceProvider {
    pub fn new(_model_path: Option<&str>) -> MediaResult<Self> {
        Err(MediaError::FeatureDisabled("opencv"))
    }

    fn signal_for(&mut self, _frame: &Frame) -> MediaResult<FaceSignal> {
        Err(MediaError::FeatureDisabled("opencv"))
    }
}

impl FaceSignalProvider for YuNetFaceProvider {
    fn face_signal(&mut self, frame: &Frame) -> EngineResult<FaceSignal> {
        Ok(self.signal_for(frame)?)
    }

    fn name(&self) -> &'static str {
        "yunet"
    }
}
