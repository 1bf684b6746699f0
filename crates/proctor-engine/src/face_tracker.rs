//! Face presence, multiplicity and focus tracking.
//!
//! Three conditions are evaluated on every frame, in a fixed order:
//!
//! | Condition | Holds when | Fires | Severity | Timestamp |
//! |-----------|------------|-------|----------|-----------|
//! | absence | `!has_face` | after > 3.0s | critical | episode start |
//! | multiplicity | `face_count > 1` | immediately | critical | episode start |
//! | focus | one face, `!is_focused` | after > 2.0s | warning | episode start |
//!
//! Each condition owns a [`Streak`] recording when its current episode began
//! and whether the episode has already produced its event. Debouncing is
//! local to the streak, so the emission order of other trackers sharing the
//! event log has no influence.

use proctor_models::{event_types, Event, FaceSignal};
use tracing::info;

use crate::config::FaceTrackerConfig;
use crate::event_log::EventLog;

/// One continuous episode of a tracked condition.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Streak {
    since: Option<f64>,
    emitted: bool,
}

impl Streak {
    /// Start the episode if needed; returns its start time.
    fn hold(&mut self, now: f64) -> f64 {
        *self.since.get_or_insert(now)
    }

    /// End the episode.
    fn clear(&mut self) {
        *self = Self::default();
    }

    /// Mark the episode as reported. Returns `false` if it already was.
    fn claim(&mut self) -> bool {
        !std::mem::replace(&mut self.emitted, true)
    }
}

/// Face/focus tracker, one per session.
#[derive(Debug, Clone)]
pub struct FaceFocusTracker {
    config: FaceTrackerConfig,
    absence: Streak,
    multiple: Streak,
    focus: Streak,
}

impl FaceFocusTracker {
    pub fn new(config: FaceTrackerConfig) -> Self {
        Self {
            config,
            absence: Streak::default(),
            multiple: Streak::default(),
            focus: Streak::default(),
        }
    }

    /// Feed one frame's face signal.
    pub fn observe(&mut self, signal: &FaceSignal, log: &mut EventLog) {
        let now = signal.timestamp;
        self.track_absence(signal, now, log);
        self.track_multiplicity(signal, now, log);
        self.track_focus(signal, now, log);
    }

    fn track_absence(&mut self, signal: &FaceSignal, now: f64, log: &mut EventLog) {
        if signal.has_face {
            self.absence.clear();
            return;
        }

        let since = self.absence.hold(now);
        if now - since > self.config.absence_threshold_secs && self.absence.claim() {
            info!(since, now, "Face absent");
            log.append(Event::critical(
                event_types::FACE_ABSENT,
                since,
                format!(
                    "No face detected for {:.1} seconds",
                    self.config.absence_threshold_secs
                ),
            ));
        }
    }

    fn track_multiplicity(&mut self, signal: &FaceSignal, now: f64, log: &mut EventLog) {
        if !signal.has_multiple_faces() {
            self.multiple.clear();
            return;
        }

        let since = self.multiple.hold(now);
        if self.multiple.claim() {
            info!(since, face_count = signal.face_count, "Multiple faces");
            log.append(Event::critical(
                event_types::MULTIPLE_FACES,
                since,
                format!("Multiple faces detected ({})", signal.face_count),
            ));
        }
    }

    fn track_focus(&mut self, signal: &FaceSignal, now: f64, log: &mut EventLog) {
        // Focus is only judged with exactly one face in view
        if !signal.has_single_face() || signal.is_focused {
            self.focus.clear();
            return;
        }

        let since = self.focus.hold(now);
        if now - since > self.config.focus_threshold_secs && self.focus.claim() {
            info!(since, now, "Focus lost");
            log.append(Event::warning(
                event_types::FOCUS_LOST,
                since,
                format!(
                    "User not looking at screen for {:.1} seconds",
                    self.config.focus_threshold_secs
                ),
            ));
        }
    }

    /// Start of the current absence episode, if any.
    pub fn face_absent_since(&self) -> Option<f64> {
        self.absence.since
    }

    /// Start of the current focus-lost episode, if any.
    pub fn focus_lost_since(&self) -> Option<f64> {
        self.focus.since
    }
}

impl Default for FaceFocusTracker {
    fn default() -> Self {
        Self::new(FaceTrackerConfig::default())
    }
}
