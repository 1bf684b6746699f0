//! Object detection using YOLOv8 ONNX model.
//!
//! Provides the proctoring detection provider with GPU acceleration support:
//! - CUDA on Linux with NVIDIA GPU
//! - CoreML on macOS with Apple Silicon
//! - CPU fallback on all platforms
//!
//! Only the prohibited-item classes are reported; everything else the COCO
//! model recognises (people, chairs, cups) is dropped before it reaches the
//! engine.

use std::path::Path;

use image::{DynamicImage, ImageBuffer, Rgb};
use ndarray::Array;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::{Tensor, Value};
use proctor_engine::{DetectionProvider, EngineResult};
use proctor_models::{BoundingBox, Detection, Frame};
use tracing::{debug, info};

use crate::error::{MediaError, MediaResult};

/// COCO class names (80 classes).
pub const COCO_CLASSES: &[&str] = &[
    "person", "bicycle", "car", "motorcycle", "airplane", "bus", "train", "truck",
    "boat", "traffic light", "fire hydrant", "stop sign", "parking meter", "bench",
    "bird", "cat", "dog", "horse", "sheep", "cow", "elephant", "bear", "zebra",
    "giraffe", "backpack", "umbrella", "handbag", "tie", "suitcase", "frisbee",
    "skis", "snowboard", "sports ball", "kite", "baseball bat", "baseball glove",
    "skateboard", "surfboard", "tennis racket", "bottle", "wine glass", "cup",
    "fork", "knife", "spoon", "bowl", "banana", "apple", "sandwich", "orange",
    "broccoli", "carrot", "hot dog", "pizza", "donut", "cake", "chair", "couch",
    "potted plant", "bed", "dining table", "toilet", "tv", "laptop", "mouse",
    "remote", "keyboard", "cell phone", "microwave", "oven", "toaster", "sink",
    "refrigerator", "book", "clock", "vase", "scissors", "teddy bear", "hair drier",
    "toothbrush",
];

/// Classes reported to the engine.
pub const TARGET_CLASSES: &[&str] = &["cell phone", "book", "laptop"];

const NUM_CLASSES: usize = 80;
const NUM_BOXES: usize = 8400;
const NUM_FEATURES: usize = 4 + NUM_CLASSES;

/// Configuration for object detection.
#[derive(Debug, Clone)]
pub struct ObjectDetectorConfig {
    /// Path to ONNX model file
    pub model_path: String,
    /// Confidence threshold for detections
    pub confidence_threshold: f32,
    /// IoU threshold for NMS
    pub nms_threshold: f32,
    /// Input image size (model expects square input)
    pub input_size: u32,
    /// Class labels passed through to the engine
    pub target_classes: Vec<String>,
}

impl Default for ObjectDetectorConfig {
    fn default() -> Self {
        Self {
            model_path: "models/object_detection/yolov8n.onnx".to_string(),
            confidence_threshold: 0.2,
            nms_threshold: 0.45,
            input_size: 640,
            target_classes: TARGET_CLASSES.iter().map(|c| c.to_string()).collect(),
        }
    }
}

/// Candidate box in original-frame pixel coordinates.
#[derive(Debug, Clone, PartialEq)]
struct Candidate {
    bbox: BoundingBox,
    class_id: usize,
    confidence: f32,
}

/// Object detector using YOLOv8 ONNX model.
///
/// Uses ONNX Runtime for inference with automatic execution provider selection:
/// - CUDA on Linux with NVIDIA GPU (when `cuda` feature enabled)
/// - CoreML on macOS
/// - CPU fallback on all platforms
pub struct YoloObjectDetector {
    session: Session,
    config: ObjectDetectorConfig,
    target_ids: Vec<usize>,
}

impl YoloObjectDetector {
    /// Create a new object detector from config.
    ///
    /// Returns error if model file doesn't exist or cannot be loaded.
    pub fn new(config: ObjectDetectorConfig) -> MediaResult<Self> {
        let model_path = Path::new(&config.model_path);
        if !model_path.exists() {
            return Err(MediaError::model_not_found(&config.model_path));
        }

        let target_ids = resolve_target_ids(&config.target_classes)?;
        let session = create_session(model_path)?;
        info!(
            model_path = %config.model_path,
            input_size = config.input_size,
            targets = ?config.target_classes,
            threshold = config.confidence_threshold,
            "Object detector initialized"
        );

        Ok(Self {
            session,
            config,
            target_ids,
        })
    }

    /// Get the configuration.
    pub fn config(&self) -> &ObjectDetectorConfig {
        &self.config
    }

    /// Detect target objects in one frame.
    pub fn detect_frame(&mut self, frame: &Frame) -> MediaResult<Vec<Detection>> {
        let img = raw_to_image(&frame.data, frame.width, frame.height)?;
        let input = self.preprocess(&img)?;
        let outputs = self.run_inference(input)?;

        let candidates = decode_output(
            &outputs,
            self.config.input_size,
            frame.width,
            frame.height,
            self.config.confidence_threshold,
            &self.target_ids,
        )?;
        let kept = non_maximum_suppression(candidates, self.config.nms_threshold);

        debug!(
            frame = frame.index,
            count = kept.len(),
            "Object detection completed"
        );

        Ok(kept
            .into_iter()
            .map(|c| {
                Detection::new(
                    COCO_CLASSES[c.class_id],
                    c.confidence as f64,
                    c.bbox,
                    frame.timestamp,
                )
            })
            .collect())
    }

    /// Preprocess image for YOLOv8 inference.
    ///
    /// - Resize to model input size (640x640)
    /// - Normalize pixel values to [0, 1]
    /// - Convert to NCHW format (batch, channels, height, width)
    fn preprocess(&self, img: &DynamicImage) -> MediaResult<Value> {
        let input_size = self.config.input_size;

        let resized = img.resize_exact(
            input_size,
            input_size,
            image::imageops::FilterType::Triangle,
        );

        let rgb = resized.to_rgb8();
        let (w, h) = (input_size as usize, input_size as usize);

        // HWC -> CHW with normalization to [0, 1]
        let mut chw_data: Vec<f32> = Vec::with_capacity(3 * h * w);
        for c in 0..3 {
            for y in 0..h {
                for x in 0..w {
                    let pixel = rgb.get_pixel(x as u32, y as u32);
                    chw_data.push(pixel[c] as f32 / 255.0);
                }
            }
        }

        let shape = vec![1usize, 3, h, w];
        Tensor::from_array((shape, chw_data.into_boxed_slice()))
            .map(Value::from)
            .map_err(|e| MediaError::internal(format!("Failed to create tensor: {}", e)))
    }

    /// Run ONNX inference.
    fn run_inference(&mut self, input: Value) -> MediaResult<Vec<f32>> {
        let outputs = self
            .session
            .run(ort::inputs![input])
            .map_err(|e| MediaError::detection_failed(format!("ONNX inference failed: {}", e)))?;

        // YOLOv8 output is [1, 84, 8400]
        let output = outputs
            .get("output0")
            .ok_or_else(|| MediaError::detection_failed("Missing output0 tensor"))?;

        let tensor = output
            .try_extract_tensor::<f32>()
            .map_err(|e| MediaError::detection_failed(format!("Failed to extract tensor: {}", e)))?;

        Ok(tensor.1.iter().copied().collect())
    }
}

impl DetectionProvider for YoloObjectDetector {
    fn detect(&mut self, frame: &Frame) -> EngineResult<Vec<Detection>> {
        Ok(self.detect_frame(frame)?)
    }

    fn name(&self) -> &'static str {
        "yolov8"
    }
}

/// Map class labels to COCO class ids.
fn resolve_target_ids(labels: &[String]) -> MediaResult<Vec<usize>> {
    labels
        .iter()
        .map(|label| {
            COCO_CLASSES
                .iter()
                .position(|c| c == label)
                .ok_or_else(|| MediaError::internal(format!("Unknown COCO class: {}", label)))
        })
        .collect()
}

/// Convert raw RGB bytes to DynamicImage.
fn raw_to_image(image_data: &[u8], width: u32, height: u32) -> MediaResult<DynamicImage> {
    let expected_len = Frame::rgb_len(width, height);
    if image_data.len() != expected_len {
        return Err(MediaError::detection_failed(format!(
            "Invalid image data length: expected {}, got {}",
            expected_len,
            image_data.len()
        )));
    }

    let img_buffer: ImageBuffer<Rgb<u8>, Vec<u8>> =
        ImageBuffer::from_raw(width, height, image_data.to_vec())
            .ok_or_else(|| MediaError::detection_failed("Failed to create image buffer"))?;

    Ok(DynamicImage::ImageRgb8(img_buffer))
}

/// Decode YOLOv8 output.
///
/// YOLOv8 output format: [1, 84, 8400]
/// - 84 = 4 (bbox: cx, cy, w, h) + 80 (class scores)
/// - 8400 = number of detection candidates
///
/// Boxes whose best class is not a target, or scores below `threshold`,
/// are dropped.
fn decode_output(
    outputs: &[f32],
    input_size: u32,
    orig_width: u32,
    orig_height: u32,
    threshold: f32,
    target_ids: &[usize],
) -> MediaResult<Vec<Candidate>> {
    if outputs.len() != NUM_FEATURES * NUM_BOXES {
        return Err(MediaError::detection_failed(format!(
            "Unexpected output size: expected {}, got {}",
            NUM_FEATURES * NUM_BOXES,
            outputs.len()
        )));
    }

    let output_array = Array::from_shape_vec((NUM_FEATURES, NUM_BOXES), outputs.to_vec())
        .map_err(|e| MediaError::detection_failed(format!("Failed to reshape output: {}", e)))?;
    let transposed = output_array.t(); // [8400, 84]

    let input_size = input_size as f64;
    let scale_w = orig_width as f64 / input_size;
    let scale_h = orig_height as f64 / input_size;
    let (frame_w, frame_h) = (orig_width as f64, orig_height as f64);

    let mut candidates = Vec::new();
    for i in 0..NUM_BOXES {
        let mut best_class = 0;
        let mut best_score = 0.0f32;
        for c in 0..NUM_CLASSES {
            let score = transposed[[i, 4 + c]];
            if score > best_score {
                best_score = score;
                best_class = c;
            }
        }

        if best_score < threshold || !target_ids.contains(&best_class) {
            continue;
        }

        let cx = transposed[[i, 0]] as f64 * scale_w;
        let cy = transposed[[i, 1]] as f64 * scale_h;
        let w = transposed[[i, 2]] as f64 * scale_w;
        let h = transposed[[i, 3]] as f64 * scale_h;

        // Clamp to frame bounds
        let x = (cx - w / 2.0).clamp(0.0, frame_w);
        let y = (cy - h / 2.0).clamp(0.0, frame_h);
        let width = w.min(frame_w - x);
        let height = h.min(frame_h - y);
        if width <= 0.0 || height <= 0.0 {
            continue;
        }

        candidates.push(Candidate {
            bbox: BoundingBox::new(x, y, width, height),
            class_id: best_class,
            confidence: best_score,
        });
    }

    Ok(candidates)
}

/// Apply per-class Non-Maximum Suppression to remove overlapping detections.
fn non_maximum_suppression(mut candidates: Vec<Candidate>, iou_threshold: f32) -> Vec<Candidate> {
    candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut keep: Vec<Candidate> = Vec::new();
    for candidate in candidates {
        let overlaps = keep.iter().any(|k| {
            k.class_id == candidate.class_id && iou(&k.bbox, &candidate.bbox) > iou_threshold as f64
        });
        if !overlaps {
            keep.push(candidate);
        }
    }
    keep
}

/// Intersection over Union of two boxes.
fn iou(a: &BoundingBox, b: &BoundingBox) -> f64 {
    let x1 = a.x.max(b.x);
    let y1 = a.y.max(b.y);
    let x2 = (a.x + a.width).min(b.x + b.width);
    let y2 = (a.y + a.height).min(b.y + b.height);

    let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    let union = a.area() + b.area() - intersection;

    if union > 0.0 {
        intersection / union
    } else {
        0.0
    }
}

/// Create ONNX Runtime session with automatic execution provider selection.
fn create_session(model_path: &Path) -> MediaResult<Session> {
    let model_bytes = std::fs::read(model_path)
        .map_err(|e| MediaError::internal(format!("Failed to read model file: {}", e)))?;

    let builder = Session::builder()
        .map_err(|e| MediaError::internal(format!("Failed to create session builder: {}", e)))?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(|e| MediaError::internal(format!("Failed to set optimization level: {}", e)))?;

    // Try CUDA on Linux with cuda feature
    #[cfg(all(target_os = "linux", feature = "cuda"))]
    {
        use ort::execution_providers::CUDAExecutionProvider;
        if let Ok(cuda_builder) = builder
            .clone()
            .with_execution_providers([CUDAExecutionProvider::default().build()])
        {
            if let Ok(session) = cuda_builder.commit_from_memory(&model_bytes) {
                info!("Using CUDA execution provider for object detection");
                return Ok(session);
            }
        }
        debug!("CUDA execution provider not available, trying alternatives");
    }

    // Try CoreML on macOS
    #[cfg(target_os = "macos")]
    {
        use ort::execution_providers::CoreMLExecutionProvider;
        if let Ok(coreml_builder) = builder
            .clone()
            .with_execution_providers([CoreMLExecutionProvider::default().build()])
        {
            if let Ok(session) = coreml_builder.commit_from_memory(&model_bytes) {
                info!("Using CoreML execution provider for object detection");
                return Ok(session);
            }
        }
        debug!("CoreML execution provider not available, using CPU");
    }

    info!("Using CPU execution provider for object detection");
    builder
        .commit_from_memory(&model_bytes)
        .map_err(|e| MediaError::internal(format!("Failed to load ONNX model: {}", e)))
}

/// Check if model is available at a custom path.
pub fn is_model_available_at(path: &str) -> bool {
    Path::new(path).exists()
}
