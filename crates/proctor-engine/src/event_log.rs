//! Append-only event log shared by the trackers of one session.

use proctor_models::Event;

/// Ordered, append-only sequence of events for one session.
///
/// Appended events are never modified or removed. The log is owned by the
/// session and borrowed mutably by one tracker at a time.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Vec<Event>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event.
    pub fn append(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Events in append order.
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Number of events with the given type tag.
    pub fn count_of(&self, event_type: &str) -> usize {
        self.events
            .iter()
            .filter(|e| e.event_type == event_type)
            .count()
    }

    /// Consume the log, returning events stably sorted by timestamp.
    ///
    /// Object events are back-dated to their episode start, so append order
    /// can differ from timestamp order across trackers.
    pub fn into_sorted(self) -> Vec<Event> {
        let mut events = self.events;
        events.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proctor_models::event_types;

    #[test]
    fn test_append_and_count() {
        let mut log = EventLog::new();
        assert!(log.is_empty());

        log.append(Event::critical(event_types::FACE_ABSENT, 1.0, "a"));
        log.append(Event::critical(event_types::FACE_ABSENT, 9.0, "b"));
        log.append(Event::warning(event_types::FOCUS_LOST, 4.0, "c"));

        assert_eq!(log.len(), 3);
        assert_eq!(log.count_of(event_types::FACE_ABSENT), 2);
        assert_eq!(log.count_of("book_detected"), 0);
    }

    #[test]
    fn test_into_sorted_is_stable() {
        let mut log = EventLog::new();
        log.append(Event::critical(event_types::MULTIPLE_FACES, 5.0, "first"));
        log.append(Event::critical("book_detected", 2.0, "back-dated"));
        log.append(Event::critical(event_types::FACE_ABSENT, 5.0, "second"));

        let sorted = log.into_sorted();
        let messages: Vec<&str> = sorted.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, vec!["back-dated", "first", "second"]);
    }
}
