//! Forward-only cursor over a frozen event log.
//!
//! Resampling walks the log once, in lockstep with an advancing clock. The
//! cursor hands out borrowed windows of the log and only ever moves its own
//! position forward; the events themselves are never removed or reordered.

use bimatrix_types::Event;
use chrono::{DateTime, Utc};

/// A monotonic position into a time-ordered slice of events.
#[derive(Debug, Clone)]
pub struct EventCursor<'a> {
    events: &'a [Event],
    position: usize,
}

impl<'a> EventCursor<'a> {
    /// Start a cursor at the first event of `events`.
    ///
    /// `events` must already be ordered by timestamp.
    pub const fn new(events: &'a [Event]) -> Self {
        Self {
            events,
            position: 0,
        }
    }

    /// Consume every not-yet-visited event with `timestamp <= until` and
    /// return them as a window of the underlying slice.
    ///
    /// Each event is returned by at most one call. Moving `until` backwards
    /// returns an empty window.
    pub fn advance_through(&mut self, until: DateTime<Utc>) -> &'a [Event] {
        let remaining = self.events.get(self.position..).unwrap_or_default();
        let count = remaining
            .iter()
            .take_while(|event| event.timestamp <= until)
            .count();
        self.position = self.position.saturating_add(count);
        remaining.get(..count).unwrap_or_default()
    }

    /// The next unvisited event, if any.
    pub fn peek(&self) -> Option<&'a Event> {
        self.events.get(self.position)
    }

    /// Number of events visited so far.
    pub const fn position(&self) -> usize {
        self.position
    }

    /// Whether every event has been visited.
    pub const fn is_exhausted(&self) -> bool {
        self.position >= self.events.len()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use bimatrix_types::PeriodMarker;
    use chrono::{TimeDelta, TimeZone};

    use super::*;

    fn at(millis: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap() + TimeDelta::milliseconds(millis)
    }

    fn log() -> Vec<Event> {
        vec![
            Event::state(at(0), PeriodMarker::PeriodStart),
            Event::decision(at(0), "abc", 0.2),
            Event::decision(at(1_500), "abc", 0.6),
            Event::state(at(3_000), PeriodMarker::PeriodEnd),
        ]
    }

    #[test]
    fn windows_partition_the_log() {
        let events = log();
        let mut cursor = EventCursor::new(&events);

        assert_eq!(cursor.advance_through(at(0)).len(), 2);
        assert_eq!(cursor.advance_through(at(1_000)).len(), 0);
        assert_eq!(cursor.advance_through(at(2_000)).len(), 1);
        assert_eq!(cursor.position(), 3);
        assert!(!cursor.is_exhausted());
        assert_eq!(cursor.advance_through(at(10_000)).len(), 1);
        assert!(cursor.is_exhausted());
        assert!(cursor.advance_through(at(20_000)).is_empty());
    }

    #[test]
    fn moving_backwards_yields_nothing() {
        let events = log();
        let mut cursor = EventCursor::new(&events);
        let _ = cursor.advance_through(at(1_500));
        assert!(cursor.advance_through(at(0)).is_empty());
        assert_eq!(cursor.peek().map(|e| e.timestamp), Some(at(3_000)));
    }

    #[test]
    fn source_slice_is_untouched() {
        let events = log();
        let before = events.clone();
        let mut cursor = EventCursor::new(&events);
        while !cursor.is_exhausted() {
            let _ = cursor.advance_through(at(100_000));
        }
        assert_eq!(events, before);
    }
}
