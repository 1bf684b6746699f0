//! Persistence tracking for detected objects.
//!
//! Raw detector output flickers from frame to frame. This tracker keeps one
//! track per class label and only reports a class once it has been sighted
//! over a span longer than the persistence threshold. A class that goes
//! unseen for longer than the expiry window is evicted, so a later
//! reappearance is reported again as a new episode.

use std::collections::BTreeMap;

use proctor_models::{detected_event_type, Detection, Event};
use tracing::{debug, info};

use crate::config::ObjectTrackerConfig;
use crate::event_log::EventLog;

/// Sighting state for one class label.
#[derive(Debug, Clone, Copy, PartialEq)]
struct ObjectTrackState {
    first_seen: f64,
    last_seen: f64,
    alerted: bool,
    max_confidence: f64,
}

impl ObjectTrackState {
    fn new(now: f64, confidence: f64) -> Self {
        Self {
            first_seen: now,
            last_seen: now,
            alerted: false,
            max_confidence: confidence,
        }
    }

    fn sighted(&mut self, now: f64, confidence: f64) {
        self.last_seen = now;
        self.max_confidence = self.max_confidence.max(confidence);
    }

    fn span(&self) -> f64 {
        self.last_seen - self.first_seen
    }

    fn unseen_for(&self, now: f64) -> f64 {
        now - self.last_seen
    }
}

/// Per-class persistence tracker.
///
/// Tracks live in an ordered map so that classes crossing the threshold on
/// the same frame are reported in label order.
#[derive(Debug, Clone)]
pub struct ObjectPersistenceTracker {
    config: ObjectTrackerConfig,
    tracks: BTreeMap<String, ObjectTrackState>,
}

impl ObjectPersistenceTracker {
    pub fn new(config: ObjectTrackerConfig) -> Self {
        Self {
            config,
            tracks: BTreeMap::new(),
        }
    }

    /// Feed one frame's detections.
    ///
    /// Appends a critical `<class>_detected` event, timestamped at the
    /// episode start, for each class whose episode becomes persistent.
    pub fn observe(&mut self, detections: &[Detection], now: f64, log: &mut EventLog) {
        for detection in detections {
            // NaN fails this comparison as well
            if !(detection.confidence >= self.config.min_confidence) {
                debug!(
                    class = %detection.class_label,
                    confidence = detection.confidence,
                    min_confidence = self.config.min_confidence,
                    "Ignoring low-confidence detection"
                );
                continue;
            }

            match self.tracks.get_mut(&detection.class_label) {
                Some(track) if track.unseen_for(now) <= self.config.expiry_secs => {
                    track.sighted(now, detection.confidence);
                }
                _ => {
                    self.tracks.insert(
                        detection.class_label.clone(),
                        ObjectTrackState::new(now, detection.confidence),
                    );
                }
            }
        }

        for (label, track) in self.tracks.iter_mut() {
            if track.alerted || track.span() <= self.config.persistence_secs {
                continue;
            }

            let event = Event::critical(
                detected_event_type(label),
                track.first_seen,
                format!("{} detected in frame", title_case(label)),
            )
            .with_confidence(track.max_confidence);

            info!(
                class = %label,
                first_seen = track.first_seen,
                confidence = track.max_confidence,
                "Persistent object detected"
            );
            log.append(event);
            track.alerted = true;
        }

        let expiry = self.config.expiry_secs;
        self.tracks.retain(|label, track| {
            let keep = track.unseen_for(now) <= expiry;
            if !keep {
                debug!(class = %label, last_seen = track.last_seen, "Evicting object track");
            }
            keep
        });
    }

    /// Number of classes currently tracked.
    pub fn active_track_count(&self) -> usize {
        self.tracks.len()
    }

    /// Whether a class currently has a live track.
    pub fn is_tracking(&self, class_label: &str) -> bool {
        self.tracks.contains_key(class_label)
    }
}

impl Default for ObjectPersistenceTracker {
    fn default() -> Self {
        Self::new(ObjectTrackerConfig::default())
    }
}

/// `"cell phone"` -> `"Cell Phone"`.
fn title_case(label: &str) -> String {
    label
        .split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
