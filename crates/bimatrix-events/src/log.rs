//! Immutable, time-ordered event log for one group's round.

use bimatrix_types::{Channel, Event, EventKind, PeriodMarker};
use chrono::{DateTime, Utc};

use crate::cursor::EventCursor;
use crate::time::seconds_between;

/// Errors raised when a frozen log lacks data a consumer requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum EventLogError {
    /// No `state` event carries the required marker.
    #[error("round has no {marker} marker")]
    MissingMarker {
        /// The marker that was looked for.
        marker: PeriodMarker,
    },
}

/// The span between a round's `period_start` and `period_end` markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Period {
    /// Timestamp of the `period_start` marker.
    pub start: DateTime<Utc>,
    /// Timestamp of the `period_end` marker.
    pub end: DateTime<Utc>,
}

impl Period {
    /// Measured length of the period in seconds.
    pub fn duration_seconds(&self) -> f64 {
        seconds_between(self.start, self.end)
    }

    /// Pull `timestamp` into `[start, end]`.
    pub fn clamp(&self, timestamp: DateTime<Utc>) -> DateTime<Utc> {
        if timestamp < self.start {
            self.start
        } else if timestamp > self.end {
            self.end
        } else {
            timestamp
        }
    }
}

/// A frozen snapshot of one round's events.
///
/// Events are stably sorted by timestamp when the log is built, so events
/// sharing a timestamp keep their arrival order. The log hands out shared
/// borrows only.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoundEvents {
    events: Vec<Event>,
}

impl RoundEvents {
    /// Freeze a copy of `events`; the caller's slice is left as it was.
    pub fn freeze(events: &[Event]) -> Self {
        Self::from_vec(events.to_vec())
    }

    /// Freeze an owned list of events.
    pub fn from_vec(mut events: Vec<Event>) -> Self {
        events.sort_by_key(|event| event.timestamp);
        tracing::debug!(count = events.len(), "Froze round event log");
        Self { events }
    }

    /// All events in time order.
    pub fn as_slice(&self) -> &[Event] {
        &self.events
    }

    /// Iterate over all events in time order.
    pub fn iter(&self) -> std::slice::Iter<'_, Event> {
        self.events.iter()
    }

    /// Number of events in the log.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether the log holds no events at all.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Events recorded on `channel`, in time order.
    pub fn by_channel(&self, channel: Channel) -> impl Iterator<Item = &Event> {
        self.events
            .iter()
            .filter(move |event| event.channel() == channel)
    }

    /// Timestamp of the first `state` event carrying `marker`.
    pub fn marker(&self, marker: PeriodMarker) -> Option<DateTime<Utc>> {
        self.events
            .iter()
            .find(|event| matches!(event.kind, EventKind::StateMarker(m) if m == marker))
            .map(|event| event.timestamp)
    }

    /// The round's period, from its start and end markers.
    pub fn period(&self) -> Result<Period, EventLogError> {
        let start = self
            .marker(PeriodMarker::PeriodStart)
            .ok_or(EventLogError::MissingMarker {
                marker: PeriodMarker::PeriodStart,
            })?;
        let end = self
            .marker(PeriodMarker::PeriodEnd)
            .ok_or(EventLogError::MissingMarker {
                marker: PeriodMarker::PeriodEnd,
            })?;
        Ok(Period { start, end })
    }

    /// Earliest and latest timestamps among all `state` events.
    pub fn state_span(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let first = self.by_channel(Channel::State).next()?.timestamp;
        let last = self.by_channel(Channel::State).last()?.timestamp;
        Some((first, last))
    }

    /// A fresh forward cursor positioned before the first event.
    pub fn cursor(&self) -> EventCursor<'_> {
        EventCursor::new(&self.events)
    }
}

impl<'a> IntoIterator for &'a RoundEvents {
    type Item = &'a Event;
    type IntoIter = std::slice::Iter<'a, Event>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
