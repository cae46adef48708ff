//! Round events recorded by the experiment framework.
//!
//! On the wire an event is a string-tagged record:
//!
//! ```text
//! {"channel": "decisions", "timestamp": "...", "participant": "abc", "value": 0.4}
//! {"channel": "group_decisions", "timestamp": "...", "value": {"abc": 0.4, "xyz": 1}}
//! {"channel": "state", "timestamp": "...", "value": "period_start"}
//! {"channel": "target", "timestamp": "...", "participant": "abc", "value": 0.7}
//! ```
//!
//! Inside the workspace the channel and value are fused into the closed
//! [`EventKind`] union, so consumers match exhaustively instead of comparing
//! channel strings. The conversion happens once, at the serde boundary.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::enums::{Channel, PeriodMarker};
use crate::ids::ParticipantCode;

/// A merged per-group decision snapshot keyed by participant code.
pub type DecisionSnapshot = BTreeMap<ParticipantCode, f64>;

/// Errors raised when a wire record does not match its channel's shape.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EventFormatError {
    /// The channel carries a single number but the value was something else.
    #[error("{channel} event value must be a number, got {found}")]
    ExpectedNumber {
        /// Channel of the offending record.
        channel: Channel,
        /// JSON rendering of the value that was found.
        found: String,
    },

    /// A `group_decisions` value was not a map of participant code to number.
    #[error("group_decisions event value must map participant codes to numbers: {reason}")]
    ExpectedSnapshot {
        /// Why the value was rejected.
        reason: String,
    },

    /// A `state` value was not a known period marker.
    #[error("state event value must be period_start or period_end, got {found}: {reason}")]
    UnknownMarker {
        /// JSON rendering of the value that was found.
        found: String,
        /// Why the value was rejected.
        reason: String,
    },
}

/// What happened at an event's timestamp.
#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    /// A participant switched to a new strategy value (`decisions`).
    DecisionChanged(f64),
    /// Snapshot of all group members' strategies (`group_decisions`).
    GroupDecisionChanged(DecisionSnapshot),
    /// The round opened or closed (`state`).
    StateMarker(PeriodMarker),
    /// A participant's target signal changed (`target`).
    TargetChanged(f64),
}

impl EventKind {
    /// The channel this kind is recorded on.
    pub const fn channel(&self) -> Channel {
        match self {
            Self::DecisionChanged(_) => Channel::Decisions,
            Self::GroupDecisionChanged(_) => Channel::GroupDecisions,
            Self::StateMarker(_) => Channel::State,
            Self::TargetChanged(_) => Channel::Target,
        }
    }
}

/// A single immutable round event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawEvent", into = "RawEvent")]
pub struct Event {
    /// When the framework recorded the event.
    pub timestamp: DateTime<Utc>,
    /// The participant that produced the event, if it is individual.
    pub participant: Option<ParticipantCode>,
    /// Channel and payload.
    pub kind: EventKind,
}

impl Event {
    /// An individual strategy change.
    pub fn decision(
        timestamp: DateTime<Utc>,
        participant: impl Into<ParticipantCode>,
        value: f64,
    ) -> Self {
        Self {
            timestamp,
            participant: Some(participant.into()),
            kind: EventKind::DecisionChanged(value),
        }
    }

    /// A merged group snapshot.
    pub const fn group_decision(timestamp: DateTime<Utc>, snapshot: DecisionSnapshot) -> Self {
        Self {
            timestamp,
            participant: None,
            kind: EventKind::GroupDecisionChanged(snapshot),
        }
    }

    /// A lifecycle marker.
    pub const fn state(timestamp: DateTime<Utc>, marker: PeriodMarker) -> Self {
        Self {
            timestamp,
            participant: None,
            kind: EventKind::StateMarker(marker),
        }
    }

    /// A target signal change.
    pub fn target(
        timestamp: DateTime<Utc>,
        participant: impl Into<ParticipantCode>,
        value: f64,
    ) -> Self {
        Self {
            timestamp,
            participant: Some(participant.into()),
            kind: EventKind::TargetChanged(value),
        }
    }

    /// The channel this event was recorded on.
    pub const fn channel(&self) -> Channel {
        self.kind.channel()
    }
}

/// Wire representation of an [`Event`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawEvent {
    /// Framework channel name.
    pub channel: Channel,
    /// When the framework recorded the event.
    pub timestamp: DateTime<Utc>,
    /// Producing participant, absent for group-level channels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub participant: Option<ParticipantCode>,
    /// Channel-specific payload.
    pub value: serde_json::Value,
}

impl TryFrom<RawEvent> for Event {
    type Error = EventFormatError;

    fn try_from(raw: RawEvent) -> Result<Self, Self::Error> {
        let kind = match raw.channel {
            Channel::Decisions => EventKind::DecisionChanged(number(raw.channel, &raw.value)?),
            Channel::Target => EventKind::TargetChanged(number(raw.channel, &raw.value)?),
            Channel::GroupDecisions => EventKind::GroupDecisionChanged(
                serde_json::from_value(raw.value).map_err(|e| {
                    EventFormatError::ExpectedSnapshot {
                        reason: e.to_string(),
                    }
                })?,
            ),
            Channel::State => {
                let found = raw.value.to_string();
                let marker = serde_json::from_value(raw.value).map_err(|e| {
                    EventFormatError::UnknownMarker {
                        found,
                        reason: e.to_string(),
                    }
                })?;
                EventKind::StateMarker(marker)
            }
        };

        Ok(Self {
            timestamp: raw.timestamp,
            participant: raw.participant,
            kind,
        })
    }
}

impl From<Event> for RawEvent {
    fn from(event: Event) -> Self {
        let channel = event.channel();
        let value = match event.kind {
            EventKind::DecisionChanged(v) | EventKind::TargetChanged(v) => {
                serde_json::Value::from(v)
            }
            EventKind::GroupDecisionChanged(snapshot) => serde_json::Value::Object(
                snapshot
                    .into_iter()
                    .map(|(code, v)| (code.into_inner(), serde_json::Value::from(v)))
                    .collect(),
            ),
            EventKind::StateMarker(marker) => serde_json::Value::from(marker.as_str()),
        };

        Self {
            channel,
            timestamp: event.timestamp,
            participant: event.participant,
            value,
        }
    }
}

fn number(channel: Channel, value: &serde_json::Value) -> Result<f64, EventFormatError> {
    value.as_f64().ok_or_else(|| EventFormatError::ExpectedNumber {
        channel,
        found: value.to_string(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn decision_record_parses() {
        let json = r#"{"channel":"decisions","timestamp":"2023-11-14T22:13:20Z","participant":"abc","value":0.4}"#;
        let event: Event = serde_json::from_str(json).unwrap();
        assert_eq!(event.channel(), Channel::Decisions);
        assert_eq!(event.participant, Some(ParticipantCode::from("abc")));
        assert_eq!(event.timestamp, at(0));
        assert!(matches!(event.kind, EventKind::DecisionChanged(v) if (v - 0.4).abs() < 1e-12));
    }

    #[test]
    fn group_record_accepts_integer_values() {
        let json = r#"{"channel":"group_decisions","timestamp":"2023-11-14T22:13:20Z","value":{"abc":1,"xyz":0.5}}"#;
        let event: Event = serde_json::from_str(json).unwrap();
        let abc = match &event.kind {
            EventKind::GroupDecisionChanged(snapshot) => {
                snapshot.get(&ParticipantCode::from("abc")).copied()
            }
            _ => None,
        };
        assert_eq!(abc, Some(1.0));
    }

    #[test]
    fn state_record_parses_marker() {
        let json = r#"{"channel":"state","timestamp":"2023-11-14T22:13:20Z","value":"period_end"}"#;
        let event: Event = serde_json::from_str(json).unwrap();
        assert_eq!(event.kind, EventKind::StateMarker(PeriodMarker::PeriodEnd));
    }

    #[test]
    fn wrong_value_shape_is_rejected() {
        let json = r#"{"channel":"target","timestamp":"2023-11-14T22:13:20Z","participant":"abc","value":"high"}"#;
        assert!(serde_json::from_str::<Event>(json).is_err());

        let json = r#"{"channel":"state","timestamp":"2023-11-14T22:13:20Z","value":"paused"}"#;
        assert!(serde_json::from_str::<Event>(json).is_err());
    }

    #[test]
    fn unknown_channel_is_rejected() {
        let json = r#"{"channel":"chat","timestamp":"2023-11-14T22:13:20Z","value":"hi"}"#;
        assert!(serde_json::from_str::<Event>(json).is_err());
    }

    #[test]
    fn event_survives_wire_conversion() {
        let mut snapshot = DecisionSnapshot::new();
        snapshot.insert(ParticipantCode::from("abc"), 0.25);
        let original = Event::group_decision(at(3), snapshot);
        let json = serde_json::to_string(&original).unwrap();
        assert!(json.contains("\"group_decisions\""));
        let restored: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, original);
    }
}
