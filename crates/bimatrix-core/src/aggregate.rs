//! Per-group summaries and per-role averages across a round's groups.
//!
//! Every figure here is a mean of per-player values that may be NaN. NaN is
//! carried through the mean rather than skipped, so one incomplete group
//! makes its role's average NaN, and a role with no players averages to NaN.

use bimatrix_events::RoundEvents;
use bimatrix_types::{GroupRound, PlayerSummary, Role, RoundConfig};
use serde::Serialize;

use crate::error::RoundError;
use crate::payoff::{average_strategy, integrate_payoff};

/// Averages of one role across all groups of a round.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RoleAverages {
    /// The role averaged over.
    pub role: Role,
    /// Number of players that contributed.
    pub players: usize,
    /// Mean round payoff.
    pub payoff: f64,
    /// Mean time-averaged strategy.
    pub average_strategy: f64,
}

/// Summaries of both players in a group, row player first.
///
/// # Errors
///
/// [`RoundError::MalformedGroup`] unless the group holds exactly one row
/// player and one column player.
pub fn summarize_group(
    round: &GroupRound,
    config: &RoundConfig,
) -> Result<Vec<PlayerSummary>, RoundError> {
    if round.players.len() != 2 {
        return Err(RoundError::MalformedGroup {
            reason: format!("expected 2 players, found {}", round.players.len()),
        });
    }
    let events = RoundEvents::freeze(&round.events);

    [Role::Row, Role::Column]
        .into_iter()
        .map(|role| {
            let player = round
                .player_with_role(role)
                .ok_or_else(|| RoundError::MalformedGroup {
                    reason: format!("no {role} player"),
                })?;
            Ok(PlayerSummary {
                participant: player.participant.clone(),
                role,
                payoff: integrate_payoff(&events, &config.payoff_matrix, role, &round.players),
                average_strategy: average_strategy(
                    &events,
                    &player.participant,
                    config.period_length,
                ),
            })
        })
        .collect()
}

/// Mean payoff of every `role` player across `rounds`.
///
/// A player's recorded payoff is used when present; otherwise it is
/// computed from the group's events.
pub fn average_payoff(rounds: &[GroupRound], config: &RoundConfig, role: Role) -> f64 {
    mean_or_nan(rounds.iter().flat_map(|round| {
        let events = RoundEvents::freeze(&round.events);
        round
            .players
            .iter()
            .filter(move |player| player.role() == Some(role))
            .map(move |player| {
                player.payoff.unwrap_or_else(|| {
                    integrate_payoff(&events, &config.payoff_matrix, role, &round.players)
                })
            })
            .collect::<Vec<_>>()
    }))
}

/// Mean time-averaged strategy of every `role` player across `rounds`.
pub fn average_strategy_for_role(rounds: &[GroupRound], config: &RoundConfig, role: Role) -> f64 {
    mean_or_nan(rounds.iter().flat_map(|round| {
        let events = RoundEvents::freeze(&round.events);
        round
            .players
            .iter()
            .filter(|player| player.role() == Some(role))
            .map(|player| average_strategy(&events, &player.participant, config.period_length))
            .collect::<Vec<_>>()
    }))
}

/// Both averages for `role`, plus the number of contributing players.
pub fn role_averages(rounds: &[GroupRound], config: &RoundConfig, role: Role) -> RoleAverages {
    let players = rounds
        .iter()
        .flat_map(|round| round.players.iter())
        .filter(|player| player.role() == Some(role))
        .count();
    let averages = RoleAverages {
        role,
        players,
        payoff: average_payoff(rounds, config, role),
        average_strategy: average_strategy_for_role(rounds, config, role),
    };
    tracing::debug!(
        role = %role,
        players,
        payoff = averages.payoff,
        average_strategy = averages.average_strategy,
        "Computed role averages"
    );
    averages
}

/// Arithmetic mean; NaN for an empty input or when any value is NaN.
pub fn mean_or_nan(values: impl IntoIterator<Item = f64>) -> f64 {
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0.0), |(sum, count), value| (sum + value, count + 1.0));
    if count > 0.0 { sum / count } else { f64::NAN }
}
