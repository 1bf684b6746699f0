//! Recorded provider outputs.
//!
//! A [`SignalTrace`] captures what the detection and face providers
//! returned for every analysed frame. Replaying it through a fresh session
//! reproduces the original event list without decoding video or loading
//! models.

use chrono::Utc;
use proctor_models::{Detection, FaceSignal, SessionReport};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::session::ProctoringSession;

/// Provider outputs for one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceFrame {
    pub timestamp: f64,
    #[serde(default)]
    pub detections: Vec<Detection>,
    pub face: FaceSignal,
}

/// Provider outputs for a whole session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalTrace {
    /// Source the trace was recorded from
    pub path: String,
    /// Effective frame rate of the recording
    pub fps: f64,
    pub frames: Vec<TraceFrame>,
}

impl SignalTrace {
    pub fn new(path: impl Into<String>, fps: f64) -> Self {
        Self {
            path: path.into(),
            fps,
            frames: Vec::new(),
        }
    }

    /// Record one frame.
    pub fn push(&mut self, timestamp: f64, detections: &[Detection], face: &FaceSignal) {
        self.frames.push(TraceFrame {
            timestamp,
            detections: detections.to_vec(),
            face: *face,
        });
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Parse and validate a trace.
    pub fn from_json(json: &str) -> EngineResult<Self> {
        let trace: Self = serde_json::from_str(json).map_err(|e| EngineError::trace(e.to_string()))?;
        trace.validate()?;
        Ok(trace)
    }

    pub fn to_json_pretty(&self) -> EngineResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| EngineError::trace(e.to_string()))
    }

    fn validate(&self) -> EngineResult<()> {
        if !self.fps.is_finite() || self.fps < 0.0 {
            return Err(EngineError::trace(format!("invalid frame rate {}", self.fps)));
        }
        if let Some(frame) = self.frames.iter().find(|f| !f.timestamp.is_finite()) {
            return Err(EngineError::trace(format!(
                "non-finite frame timestamp {}",
                frame.timestamp
            )));
        }
        Ok(())
    }
}

/// Re-run the engine over a recorded trace.
pub fn replay(trace: &SignalTrace, config: &EngineConfig) -> EngineResult<SessionReport> {
    trace.validate()?;

    let mut session = ProctoringSession::new(config);
    for frame in &trace.frames {
        session.observe(frame.timestamp, &frame.detections, &frame.face)?;
    }

    info!(
        path = %trace.path,
        frames = trace.len(),
        events = session.events().len(),
        "Trace replayed"
    );
    Ok(session.finish(&trace.path, trace.fps, Utc::now()))
}
