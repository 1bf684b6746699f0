//! End-to-end session behaviour through the public engine API.
//!
//! Frames come from an in-memory source; providers replay a scripted
//! timeline keyed by frame timestamp.

use proctor_engine::{
    process, replay, score, DetectionProvider, EngineConfig, EngineResult, FaceSignalProvider,
    ProctoringSession, SignalTrace, VecFrameSource,
};
use proctor_models::{event_types, BoundingBox, Detection, Event, FaceSignal, Frame};

const FPS: f64 = 10.0;

/// Detector that returns whatever the script says for a timestamp.
struct ScriptedDetector<F: Fn(f64) -> Vec<&'static str>>(F);

impl<F: Fn(f64) -> Vec<&'static str>> DetectionProvider for ScriptedDetector<F> {
    fn detect(&mut self, frame: &Frame) -> EngineResult<Vec<Detection>> {
        Ok((self.0)(frame.timestamp)
            .into_iter()
            .map(|label| {
                Detection::new(label, 0.75, BoundingBox::new(0.0, 0.0, 8.0, 8.0), frame.timestamp)
            })
            .collect())
    }

    fn name(&self) -> &'static str {
        "scripted-detector"
    }
}

/// Face provider driven by a script of `(face_count, focused)`.
struct ScriptedFaces<F: Fn(f64) -> (u32, bool)>(F);

impl<F: Fn(f64) -> (u32, bool)> FaceSignalProvider for ScriptedFaces<F> {
    fn face_signal(&mut self, frame: &Frame) -> EngineResult<FaceSignal> {
        let (count, focused) = (self.0)(frame.timestamp);
        Ok(FaceSignal::with_faces(count, focused, frame.timestamp))
    }

    fn name(&self) -> &'static str {
        "scripted-faces"
    }
}

fn source(seconds: f64) -> VecFrameSource {
    let count = (seconds * FPS).round() as u64 + 1;
    VecFrameSource::blank("mem://exam.webm", FPS, count, 2, 2)
}

fn within(t: f64, start: f64, end: f64) -> bool {
    t >= start - 1e-9 && t <= end + 1e-9
}

fn run(
    seconds: f64,
    detections: impl Fn(f64) -> Vec<&'static str>,
    faces: impl Fn(f64) -> (u32, bool),
) -> Vec<Event> {
    process(
        source(seconds),
        &mut ScriptedDetector(detections),
        &mut ScriptedFaces(faces),
        &EngineConfig::default(),
    )
    .unwrap()
    .events
}

fn count(events: &[Event], event_type: &str) -> usize {
    events.iter().filter(|e| e.event_type == event_type).count()
}

fn attentive(_: f64) -> (u32, bool) {
    (1, true)
}

#[test]
fn test_events_are_timestamp_ordered() {
    // Phone alert is back-dated to 4.0s while multiple faces fires at 4.5s
    // and focus loss starting at 1.0s is only reported at 3.1s.
    let events = run(
        12.0,
        |t| if within(t, 4.0, 6.0) { vec!["cell phone"] } else { vec![] },
        |t| {
            if within(t, 1.0, 3.5) {
                (1, false)
            } else if within(t, 4.5, 4.8) {
                (2, true)
            } else if within(t, 8.0, 12.0) {
                (0, false)
            } else {
                (1, true)
            }
        },
    );

    assert!(events.len() >= 4);
    assert!(events.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
}

#[test]
fn test_reappearance_after_expiry_gives_two_episodes() {
    let events = run(
        12.0,
        |t| {
            if within(t, 0.0, 1.5) || within(t, 7.0, 9.0) {
                vec!["book"]
            } else {
                vec![]
            }
        },
        attentive,
    );

    assert_eq!(count(&events, "book_detected"), 2);
    assert_eq!(events[0].timestamp, 0.0);
    assert!((events[1].timestamp - 7.0).abs() < 1e-9);
}

#[test]
fn test_no_detections_no_object_events() {
    let events = run(20.0, |_| vec![], attentive);
    assert!(events.iter().all(|e| !e.is_object_detection()));
    assert!(events.is_empty());
}

#[test]
fn test_face_absent_under_threshold() {
    let events = run(
        8.0,
        |_| vec![],
        |t| if within(t, 2.0, 4.9) { (0, false) } else { (1, true) },
    );
    assert_eq!(count(&events, event_types::FACE_ABSENT), 0);
}

#[test]
fn test_face_absent_over_threshold() {
    let events = run(
        8.0,
        |_| vec![],
        |t| if within(t, 2.0, 5.1) { (0, false) } else { (1, true) },
    );
    assert_eq!(count(&events, event_types::FACE_ABSENT), 1);
    assert!((events[0].timestamp - 2.0).abs() < 1e-9);
}

#[test]
fn test_multiple_faces_episodes() {
    let events = run(
        5.0,
        |_| vec![],
        |t| {
            if within(t, 1.0, 1.9) || within(t, 2.1, 3.0) {
                (2, true)
            } else {
                (1, true)
            }
        },
    );
    assert_eq!(count(&events, event_types::MULTIPLE_FACES), 2);
    assert!((events[0].timestamp - 1.0).abs() < 1e-9);
    assert!((events[1].timestamp - 2.1).abs() < 1e-9);
}

#[test]
fn test_single_multi_face_run_is_one_event() {
    let events = run(
        5.0,
        |_| vec![],
        |t| if within(t, 1.0, 4.0) { (2, true) } else { (1, true) },
    );
    assert_eq!(count(&events, event_types::MULTIPLE_FACES), 1);
}

#[test]
fn test_reference_scores() {
    assert_eq!(score(&[]).final_integrity_score, 100);

    let one = |t: &str| vec![Event::critical(t, 0.0, "")];
    assert_eq!(score(&one(event_types::FACE_ABSENT)).final_integrity_score, 90);
    assert_eq!(score(&one(event_types::MULTIPLE_FACES)).final_integrity_score, 80);
    assert_eq!(score(&one("cell_phone_detected")).final_integrity_score, 85);

    let twelve: Vec<Event> = (0..12)
        .map(|i| Event::critical(event_types::FACE_ABSENT, i as f64, ""))
        .collect();
    assert_eq!(score(&twelve).final_integrity_score, 0);
}

#[test]
fn test_identical_runs_are_identical() {
    let detections = |t: f64| {
        let mut labels = Vec::new();
        if within(t, 0.5, 3.0) {
            labels.push("laptop");
        }
        if within(t, 2.0, 4.0) {
            labels.push("cell phone");
        }
        labels
    };
    let faces = |t: f64| {
        if within(t, 5.0, 9.0) {
            (0, false)
        } else if within(t, 10.0, 13.0) {
            (1, false)
        } else {
            (1, true)
        }
    };

    let a = run(15.0, detections, faces);
    let b = run(15.0, detections, faces);

    assert!(!a.is_empty());
    assert_eq!(
        serde_json::to_string(&a).unwrap(),
        serde_json::to_string(&b).unwrap()
    );
}

#[test]
fn test_replay_matches_manual_session() {
    let mut trace = SignalTrace::new("mem://exam.webm", FPS);
    let mut session = ProctoringSession::new(&EngineConfig::default());

    for i in 0..60 {
        let t = i as f64 / FPS;
        let face = if (10..50).contains(&i) {
            FaceSignal::absent(t)
        } else {
            FaceSignal::with_faces(1, true, t)
        };
        trace.push(t, &[], &face);
        session.observe(t, &[], &face).unwrap();
    }

    let replayed = replay(&trace, &EngineConfig::default()).unwrap();
    assert_eq!(replayed.events.as_slice(), session.events());
    assert_eq!(replayed.integrity_analysis.final_integrity_score, 90);
}
