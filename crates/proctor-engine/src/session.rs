//! Per-session analysis driver.
//!
//! A [`ProctoringSession`] owns both trackers and the event log for one
//! recording. [`process`] pulls frames from a [`FrameSource`], asks the
//! providers for each frame's signals and feeds them through the session
//! in a single forward pass.

use chrono::{DateTime, Utc};
use proctor_models::{Detection, Event, FaceSignal, SessionReport};
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::event_log::EventLog;
use crate::face_tracker::FaceFocusTracker;
use crate::object_tracker::ObjectPersistenceTracker;
use crate::providers::{DetectionProvider, FaceSignalProvider, FrameSource};
use crate::report::assemble_report;
use crate::trace::SignalTrace;

/// Frames between progress log lines.
const PROGRESS_INTERVAL: u64 = 150;

/// Tracker state and event log for one recording.
#[derive(Debug, Clone)]
pub struct ProctoringSession {
    objects: ObjectPersistenceTracker,
    faces: FaceFocusTracker,
    log: EventLog,
    frames_observed: u64,
    last_timestamp: Option<f64>,
}

impl ProctoringSession {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            objects: ObjectPersistenceTracker::new(config.objects.clone()),
            faces: FaceFocusTracker::new(config.faces.clone()),
            log: EventLog::new(),
            frames_observed: 0,
            last_timestamp: None,
        }
    }

    /// Feed one frame's signals.
    ///
    /// The frame timestamp is authoritative; the face signal is re-stamped
    /// with it. Fails if timestamps go backwards.
    pub fn observe(
        &mut self,
        timestamp: f64,
        detections: &[Detection],
        face: &FaceSignal,
    ) -> EngineResult<()> {
        if let Some(previous) = self.last_timestamp {
            if !(timestamp >= previous) {
                return Err(EngineError::OutOfOrderFrame {
                    previous,
                    current: timestamp,
                });
            }
        }
        self.last_timestamp = Some(timestamp);

        self.objects.observe(detections, timestamp, &mut self.log);
        let face = FaceSignal { timestamp, ..*face };
        self.faces.observe(&face, &mut self.log);

        self.frames_observed += 1;
        Ok(())
    }

    /// Events emitted so far, in append order.
    pub fn events(&self) -> &[Event] {
        self.log.events()
    }

    pub fn frames_observed(&self) -> u64 {
        self.frames_observed
    }

    /// Close the session and build its report.
    pub fn finish(self, path: &str, fps: f64, processed_at: DateTime<Utc>) -> SessionReport {
        assemble_report(path, fps, self.frames_observed, self.log, processed_at)
    }
}

/// Analyse every frame of `source` and return the session report.
pub fn process<S, D, F>(
    source: S,
    detector: &mut D,
    faces: &mut F,
    config: &EngineConfig,
) -> EngineResult<SessionReport>
where
    S: FrameSource,
    D: DetectionProvider + ?Sized,
    F: FaceSignalProvider + ?Sized,
{
    run(source, detector, faces, config, None)
}

/// Like [`process`], additionally recording every provider output.
pub fn process_recording<S, D, F>(
    source: S,
    detector: &mut D,
    faces: &mut F,
    config: &EngineConfig,
) -> EngineResult<(SessionReport, SignalTrace)>
where
    S: FrameSource,
    D: DetectionProvider + ?Sized,
    F: FaceSignalProvider + ?Sized,
{
    let mut trace = SignalTrace::new(source.source_path(), source.frame_rate());
    let report = run(source, detector, faces, config, Some(&mut trace))?;
    Ok((report, trace))
}

fn run<S, D, F>(
    source: S,
    detector: &mut D,
    faces: &mut F,
    config: &EngineConfig,
    mut trace: Option<&mut SignalTrace>,
) -> EngineResult<SessionReport>
where
    S: FrameSource,
    D: DetectionProvider + ?Sized,
    F: FaceSignalProvider + ?Sized,
{
    let path = source.source_path().to_string();
    let fps = source.frame_rate();
    let mut session = ProctoringSession::new(config);

    info!(
        path = %path,
        fps,
        detector = detector.name(),
        face_provider = faces.name(),
        "Starting session analysis"
    );

    for frame in source {
        let frame = frame?;
        let detections = detector.detect(&frame)?;
        let face = faces.face_signal(&frame)?;

        session.observe(frame.timestamp, &detections, &face)?;
        if let Some(trace) = trace.as_mut() {
            trace.push(frame.timestamp, &detections, &face);
        }

        if session.frames_observed() % PROGRESS_INTERVAL == 0 {
            debug!(
                frames = session.frames_observed(),
                timestamp = frame.timestamp,
                events = session.events().len(),
                "Analysis progress"
            );
        }
    }

    let report = session.finish(&path, fps, Utc::now());
    info!(
        path = %path,
        frames = report.video_info.total_frames,
        events = report.summary.total_events,
        score = report.integrity_analysis.final_integrity_score,
        "Session analysis complete"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::VecFrameSource;
    use proctor_models::{event_types, BoundingBox, Frame};

    /// Reports a phone on every frame.
    struct PhoneEverywhere;

    impl DetectionProvider for PhoneEverywhere {
        fn detect(&mut self, frame: &Frame) -> EngineResult<Vec<Detection>> {
            Ok(vec![Detection::new(
                "cell phone",
                0.8,
                BoundingBox::new(1.0, 1.0, 5.0, 5.0),
                frame.timestamp,
            )])
        }

        fn name(&self) -> &'static str {
            "phone-everywhere"
        }
    }

    struct NoFace;

    impl FaceSignalProvider for NoFace {
        fn face_signal(&mut self, frame: &Frame) -> EngineResult<FaceSignal> {
            Ok(FaceSignal::absent(frame.timestamp))
        }

        fn name(&self) -> &'static str {
            "no-face"
        }
    }

    struct BrokenDetector;

    impl DetectionProvider for BrokenDetector {
        fn detect(&mut self, _frame: &Frame) -> EngineResult<Vec<Detection>> {
            Err(EngineError::provider("broken", "inference failed"))
        }

        fn name(&self) -> &'static str {
            "broken"
        }
    }

    #[test]
    fn test_observe_rejects_backwards_timestamps() {
        let mut session = ProctoringSession::new(&EngineConfig::default());
        let face = FaceSignal::with_faces(1, true, 0.0);

        session.observe(1.0, &[], &face).unwrap();
        session.observe(1.0, &[], &face).unwrap();
        let err = session.observe(0.5, &[], &face).unwrap_err();
        assert!(matches!(err, EngineError::OutOfOrderFrame { .. }));
        assert!(session.observe(f64::NAN, &[], &face).is_err());
        assert_eq!(session.frames_observed(), 2);
    }

    #[test]
    fn test_process_runs_all_frames() {
        let source = VecFrameSource::blank("mem://session", 5.0, 25, 4, 4);
        let report = process(source, &mut PhoneEverywhere, &mut NoFace, &EngineConfig::default()).unwrap();

        assert_eq!(report.video_info.total_frames, 25);
        assert_eq!(report.video_info.path, "mem://session");
        let types: Vec<&str> = report.events.iter().map(|e| e.event_type.as_str()).collect();
        assert_eq!(types, vec!["cell_phone_detected", event_types::FACE_ABSENT]);
        assert_eq!(report.integrity_analysis.final_integrity_score, 75);
    }

    #[test]
    fn test_process_recording_captures_every_frame() {
        let source = VecFrameSource::blank("mem://session", 5.0, 10, 4, 4);
        let (report, trace) =
            process_recording(source, &mut PhoneEverywhere, &mut NoFace, &EngineConfig::default()).unwrap();

        assert_eq!(trace.len(), 10);
        assert_eq!(trace.path, "mem://session");
        assert_eq!(trace.frames[3].detections.len(), 1);
        assert_eq!(report.video_info.total_frames, 10);
    }

    #[test]
    fn test_provider_error_aborts() {
        let source = VecFrameSource::blank("mem://session", 5.0, 10, 4, 4);
        let err = process(source, &mut BrokenDetector, &mut NoFace, &EngineConfig::default()).unwrap_err();
        assert!(matches!(err, EngineError::Provider { provider: "broken", .. }));
    }
}
