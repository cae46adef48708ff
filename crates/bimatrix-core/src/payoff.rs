//! Flow-payoff integration and time-averaged strategies.
//!
//! A player's round payoff is the time average of the bimatrix flow payoff
//! over `[period_start, period_end]`:
//!
//! ```text
//! flow(q1, q2) = Aa*q1*q2 + Ab*q1*(1-q2) + Ba*(1-q1)*q2 + Bb*(1-q1)*(1-q2)
//! ```
//!
//! where `q1` is the row player's current strategy, `q2` the column
//! player's, and `Aa..Bb` the evaluated player's component of each cell.
//! Both strategies sit at `0.5` until their owner's first `decisions` event.

use bimatrix_events::{RoundEvents, seconds_between};
use bimatrix_types::{
    Channel, EventKind, ParticipantCode, PayoffMatrix, PeriodMarker, Player, Role,
};

use crate::error::RoundError;
use crate::trajectory::{DecisionChannel, decision_changes};

/// Strategy assumed for a player who has not yet decided.
pub const NEUTRAL_STRATEGY: f64 = 0.5;

/// One player's payoff in each cell of the matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RolePayoffs {
    /// Payoff when row plays A and column plays a.
    pub aa: f64,
    /// Payoff when row plays A and column plays b.
    pub ab: f64,
    /// Payoff when row plays B and column plays a.
    pub ba: f64,
    /// Payoff when row plays B and column plays b.
    pub bb: f64,
}

impl RolePayoffs {
    /// Select `role`'s component of every cell.
    pub fn for_role(matrix: &PayoffMatrix, role: Role) -> Self {
        Self {
            aa: f64::from(matrix.aa.for_role(role)),
            ab: f64::from(matrix.ab.for_role(role)),
            ba: f64::from(matrix.ba.for_role(role)),
            bb: f64::from(matrix.bb.for_role(role)),
        }
    }

    /// Instantaneous payoff for row strategy `q1` and column strategy `q2`.
    pub fn flow(&self, q1: f64, q2: f64) -> f64 {
        self.aa * q1 * q2
            + self.ab * q1 * (1.0 - q2)
            + self.ba * (1.0 - q1) * q2
            + self.bb * (1.0 - q1) * (1.0 - q2)
    }
}

/// Time-averaged flow payoff of the player in `role`.
///
/// `players` identifies the row and column players. `decisions` events from
/// anyone else, or without a participant, are ignored.
///
/// # Errors
///
/// [`RoundError::IncompleteRound`] when a period marker is missing,
/// [`RoundError::EmptyPeriod`] when the markers enclose no time, and
/// [`RoundError::MalformedGroup`] when no player holds the row or the column
/// role.
pub fn compute_payoff(
    events: &RoundEvents,
    matrix: &PayoffMatrix,
    role: Role,
    players: &[Player],
) -> Result<f64, RoundError> {
    let period = events.period()?;
    let duration = period.duration_seconds();
    if duration <= 0.0 {
        return Err(RoundError::EmptyPeriod);
    }
    let row_player = seat(players, Role::Row)?;
    let column_player = seat(players, Role::Column)?;

    let payoffs = RolePayoffs::for_role(matrix, role);
    let mut q1 = NEUTRAL_STRATEGY;
    let mut q2 = NEUTRAL_STRATEGY;
    let mut since = period.start;
    let mut accumulated = 0.0;

    for event in events.by_channel(Channel::Decisions) {
        let EventKind::DecisionChanged(value) = event.kind else {
            continue;
        };
        let Some(participant) = event.participant.as_ref() else {
            continue;
        };
        let is_row = *participant == row_player.participant;
        if !is_row && *participant != column_player.participant {
            continue;
        }
        let at = period.clamp(event.timestamp);
        accumulated += payoffs.flow(q1, q2) * seconds_between(since, at);
        since = at;
        if is_row {
            q1 = value;
        } else {
            q2 = value;
        }
    }
    accumulated += payoffs.flow(q1, q2) * seconds_between(since, period.end);

    Ok(accumulated / duration)
}

/// Time-averaged flow payoff of the player in `role`, NaN when unavailable.
///
/// See [`compute_payoff`] for the conditions that produce NaN.
pub fn integrate_payoff(
    events: &RoundEvents,
    matrix: &PayoffMatrix,
    role: Role,
    players: &[Player],
) -> f64 {
    nan_on_error(compute_payoff(events, matrix, role, players), "payoff")
}

/// Time-weighted mean of `participant`'s `group_decisions` value.
///
/// Weighting runs from the first snapshot carrying the participant to
/// `period_end`, and the sum is divided by the configured `period_length`
/// rather than the measured span. Snapshots without the participant keep
/// the previous value.
///
/// # Errors
///
/// [`RoundError::IncompleteRound`] without a `period_end` marker,
/// [`RoundError::ZeroPeriodLength`] when `period_length` is zero, and
/// [`RoundError::NoDecisions`] when no snapshot mentions the participant.
pub fn compute_average_strategy(
    events: &RoundEvents,
    participant: &ParticipantCode,
    period_length: u32,
) -> Result<f64, RoundError> {
    let end = events
        .marker(PeriodMarker::PeriodEnd)
        .ok_or(RoundError::IncompleteRound {
            marker: PeriodMarker::PeriodEnd,
        })?;
    if period_length == 0 {
        return Err(RoundError::ZeroPeriodLength);
    }

    let mut current = None;
    let mut weighted = 0.0;
    for (timestamp, value) in decision_changes(events, participant, DecisionChannel::Group) {
        let at = timestamp.min(end);
        if let Some((since, held)) = current {
            weighted += held * seconds_between(since, at);
        }
        current = Some((at, value));
    }
    let (since, held) = current.ok_or_else(|| RoundError::NoDecisions {
        participant: participant.clone(),
    })?;
    weighted += held * seconds_between(since, end);

    Ok(weighted / f64::from(period_length))
}

/// Time-weighted mean strategy of `participant`, NaN when unavailable.
pub fn average_strategy(
    events: &RoundEvents,
    participant: &ParticipantCode,
    period_length: u32,
) -> f64 {
    nan_on_error(
        compute_average_strategy(events, participant, period_length),
        "average strategy",
    )
}

/// Recompute every player's payoff and overwrite `Player::payoff`.
///
/// Players whose payoff cannot be computed (incomplete round, no role) are
/// left with `None`. Returns how many payoffs were written.
pub fn settle_payoffs(
    players: &mut [Player],
    events: &RoundEvents,
    matrix: &PayoffMatrix,
) -> usize {
    let settled: Vec<Option<f64>> = players
        .iter()
        .map(|player| {
            player
                .role()
                .map(|role| integrate_payoff(events, matrix, role, players))
                .filter(|payoff| !payoff.is_nan())
        })
        .collect();

    let mut written = 0_usize;
    for (player, payoff) in players.iter_mut().zip(settled) {
        if payoff.is_some() {
            written = written.saturating_add(1);
        }
        player.payoff = payoff;
    }
    tracing::debug!(players = players.len(), written, "Settled payoffs");
    written
}

fn seat(players: &[Player], role: Role) -> Result<&Player, RoundError> {
    players
        .iter()
        .find(|player| player.role() == Some(role))
        .ok_or_else(|| RoundError::MalformedGroup {
            reason: format!("no {role} player"),
        })
}

fn nan_on_error(result: Result<f64, RoundError>, quantity: &'static str) -> f64 {
    result.unwrap_or_else(|err| {
        tracing::warn!(quantity, error = %err, "Round value unavailable, using NaN");
        f64::NAN
    })
}
