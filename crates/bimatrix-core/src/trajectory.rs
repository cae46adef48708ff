//! Piecewise-constant strategy trajectories.
//!
//! A participant's strategy only changes at recorded decision events. Between
//! events it holds the value of the latest event at or before that instant,
//! and before the first event it holds the participant's initial decision.
//! [`reconstruct`] turns the sparse event list into an explicit sequence of
//! [`Segment`]s covering the round's period without gaps or overlaps.
//!
//! # Invariants
//!
//! - The first segment starts at `period_start`.
//! - Each segment ends where the next one starts.
//! - The last segment ends at `period_end`.
//! - Events sharing a timestamp collapse; the latest arrival wins.

use bimatrix_events::{Period, RoundEvents, seconds_between};
use bimatrix_types::{EventKind, ParticipantCode, Player, RoundConfig};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::decision::InitialDecisionSource;
use crate::error::RoundError;

/// Which channel a participant's strategy is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionChannel {
    /// Individual `decisions` events produced by the participant.
    Individual,
    /// The participant's entry in merged `group_decisions` snapshots.
    Group,
}

/// A span of time during which a strategy value held.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Segment {
    /// The strategy value.
    pub value: f64,
    /// When the value took effect.
    pub start: DateTime<Utc>,
    /// When the next value took effect, or `period_end`.
    pub end: DateTime<Utc>,
}

impl Segment {
    /// Length of the segment in seconds.
    pub fn duration_seconds(&self) -> f64 {
        seconds_between(self.start, self.end)
    }
}

/// A participant's strategy over one round.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trajectory {
    participant: ParticipantCode,
    #[serde(skip)]
    period: Period,
    segments: Vec<Segment>,
}

impl Trajectory {
    /// The participant this trajectory belongs to.
    pub const fn participant(&self) -> &ParticipantCode {
        &self.participant
    }

    /// The segments, in time order.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// The period the trajectory covers.
    pub const fn period(&self) -> Period {
        self.period
    }

    /// The strategy in force at `at`, or `None` outside the period.
    ///
    /// At a segment boundary the later segment's value applies.
    pub fn value_at(&self, at: DateTime<Utc>) -> Option<f64> {
        if at < self.period.start || at > self.period.end {
            return None;
        }
        self.segments
            .iter()
            .rev()
            .find(|segment| segment.start <= at)
            .map(|segment| segment.value)
    }

    /// Duration-weighted mean of the strategy over the covered period.
    ///
    /// NaN when the period has no positive length.
    pub fn time_average(&self) -> f64 {
        let total = self.period.duration_seconds();
        if total <= 0.0 {
            return f64::NAN;
        }
        let weighted: f64 = self
            .segments
            .iter()
            .map(|segment| segment.value * segment.duration_seconds())
            .sum();
        weighted / total
    }

    /// Whether the segments tile `[period_start, period_end]` exactly.
    pub fn covers_period(&self) -> bool {
        let (Some(first), Some(last)) = (self.segments.first(), self.segments.last()) else {
            return false;
        };
        first.start == self.period.start
            && last.end == self.period.end
            && self
                .segments
                .windows(2)
                .all(|pair| matches!(pair, [a, b] if a.end == b.start))
    }
}

/// Every `(timestamp, value)` strategy change of `participant` on `channel`,
/// in time order.
///
/// Group snapshots that do not mention the participant are skipped.
pub fn decision_changes<'a>(
    events: &'a RoundEvents,
    participant: &'a ParticipantCode,
    channel: DecisionChannel,
) -> impl Iterator<Item = (DateTime<Utc>, f64)> + 'a {
    events
        .iter()
        .filter_map(move |event| match (&event.kind, channel) {
            (EventKind::DecisionChanged(value), DecisionChannel::Individual)
                if event.participant.as_ref() == Some(participant) =>
            {
                Some((event.timestamp, *value))
            }
            (EventKind::GroupDecisionChanged(snapshot), DecisionChannel::Group) => snapshot
                .get(participant)
                .map(|value| (event.timestamp, *value)),
            (
                EventKind::DecisionChanged(_)
                | EventKind::GroupDecisionChanged(_)
                | EventKind::StateMarker(_)
                | EventKind::TargetChanged(_),
                _,
            ) => None,
        })
}

/// Rebuild `participant`'s trajectory from a frozen round.
///
/// `initial_decision` holds from `period_start` until the participant's
/// first change. Changes at or before `period_start` set the opening value;
/// changes after `period_end` are ignored.
///
/// # Errors
///
/// Returns [`RoundError::IncompleteRound`] when either period marker is
/// missing, and [`RoundError::EmptyPeriod`] when `period_end` precedes
/// `period_start`.
pub fn reconstruct(
    events: &RoundEvents,
    participant: &ParticipantCode,
    channel: DecisionChannel,
    initial_decision: f64,
) -> Result<Trajectory, RoundError> {
    let period = events.period()?;
    if period.end < period.start {
        return Err(RoundError::EmptyPeriod);
    }

    let mut segments = Vec::new();
    let mut current_start = period.start;
    let mut current_value = initial_decision;

    for (timestamp, value) in decision_changes(events, participant, channel) {
        if timestamp > period.end {
            break;
        }
        if timestamp > current_start {
            segments.push(Segment {
                value: current_value,
                start: current_start,
                end: timestamp,
            });
            current_start = timestamp;
        }
        current_value = value;
    }

    segments.push(Segment {
        value: current_value,
        start: current_start,
        end: period.end,
    });

    tracing::debug!(
        participant = %participant,
        segments = segments.len(),
        "Reconstructed trajectory"
    );

    Ok(Trajectory {
        participant: participant.clone(),
        period,
        segments,
    })
}

/// Rebuild `player`'s trajectory, drawing the initial decision from
/// `source` according to the round's strategy mode.
///
/// # Errors
///
/// See [`reconstruct`].
pub fn reconstruct_player(
    events: &RoundEvents,
    player: &Player,
    channel: DecisionChannel,
    config: &RoundConfig,
    source: &mut impl InitialDecisionSource,
) -> Result<Trajectory, RoundError> {
    let initial = source.initial_decision(config.pure_strategy);
    reconstruct(events, &player.participant, channel, initial)
}
