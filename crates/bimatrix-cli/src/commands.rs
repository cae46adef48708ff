//! Subcommand bodies, kept apart from argument parsing and output.

use std::collections::BTreeMap;
use std::path::Path;

use bimatrix_core::aggregate::{RoleAverages, role_averages, summarize_group};
use bimatrix_core::decision::InitialDecisionSource;
use bimatrix_core::export::{ExportOptions, ExportTable, build_export_rows};
use bimatrix_core::payoff::settle_payoffs;
use bimatrix_core::round_table::RoundTable;
use bimatrix_core::trajectory::{DecisionChannel, Trajectory, reconstruct_player};
use bimatrix_events::RoundEvents;
use bimatrix_types::{GroupRound, PlayerSummary, Role, RoundConfig};
use serde::Serialize;
use tracing::{info, warn};

use crate::error::CliError;

/// Results of one round across all its groups.
#[derive(Debug, Serialize)]
pub struct RoundReport {
    /// 1-based round number.
    pub round_number: u32,
    /// Per-group player summaries.
    pub groups: Vec<GroupReport>,
    /// Row-player averages across groups.
    pub row: RoleAverages,
    /// Column-player averages across groups.
    pub column: RoleAverages,
}

/// Player summaries of one group.
#[derive(Debug, Serialize)]
pub struct GroupReport {
    /// Group number within the subsession.
    pub id_in_subsession: u32,
    /// Row player first.
    pub players: Vec<PlayerSummary>,
}

/// One player's reconstructed trajectory.
#[derive(Debug, Serialize)]
pub struct TrajectoryReport {
    /// 1-based round number.
    pub round_number: u32,
    /// Group number within the subsession.
    pub id_in_subsession: u32,
    /// The player's seat.
    pub id_in_group: u32,
    /// The reconstructed trajectory.
    pub trajectory: Trajectory,
}

/// Read a JSON array of recorded group rounds.
pub fn load_rounds(path: &Path) -> Result<Vec<GroupRound>, CliError> {
    let contents = std::fs::read_to_string(path)?;
    let rounds: Vec<GroupRound> =
        serde_json::from_str(&contents).map_err(|source| CliError::Events {
            path: path.to_path_buf(),
            source,
        })?;
    info!(groups = rounds.len(), path = %path.display(), "Loaded recorded rounds");
    Ok(rounds)
}

/// Settle payoffs and summarize every active round.
///
/// Rounds beyond the table are skipped as inactive. Malformed groups are
/// logged and left out of their round's group list.
pub fn payoff_report(table: &RoundTable, rounds: Vec<GroupRound>) -> Vec<RoundReport> {
    let mut reports = Vec::new();
    for (round_number, mut groups) in by_round(rounds) {
        let Some(config) = active_config(table, round_number) else {
            continue;
        };
        for group in &mut groups {
            let events = RoundEvents::freeze(&group.events);
            settle_payoffs(&mut group.players, &events, &config.payoff_matrix);
        }

        let summaries = groups
            .iter()
            .filter_map(|group| match summarize_group(group, config) {
                Ok(players) => Some(GroupReport {
                    id_in_subsession: group.group.id_in_subsession,
                    players,
                }),
                Err(err) => {
                    warn!(
                        round_number,
                        group = group.group.id_in_subsession,
                        error = %err,
                        "Skipping group"
                    );
                    None
                }
            })
            .collect();

        reports.push(RoundReport {
            round_number,
            groups: summaries,
            row: role_averages(&groups, config, Role::Row),
            column: role_averages(&groups, config, Role::Column),
        });
    }
    reports
}

/// Concatenate the export tables of every active group round, in file order.
pub fn export_table(
    table: &RoundTable,
    rounds: &[GroupRound],
    options: ExportOptions,
) -> Result<ExportTable, CliError> {
    let mut combined = ExportTable::default();
    for round in rounds {
        let Some(config) = active_config(table, round.group.round_number) else {
            continue;
        };
        combined.append(build_export_rows(round, config, options)?)?;
    }
    info!(rows = combined.rows.len(), "Built export table");
    Ok(combined)
}

/// Reconstruct every player's trajectory in every active round.
///
/// Players whose round is incomplete are logged and skipped.
pub fn trajectory_report(
    table: &RoundTable,
    rounds: &[GroupRound],
    channel: DecisionChannel,
    source: &mut impl InitialDecisionSource,
) -> Vec<TrajectoryReport> {
    let mut reports = Vec::new();
    for round in rounds {
        let round_number = round.group.round_number;
        let Some(config) = active_config(table, round_number) else {
            continue;
        };
        let events = RoundEvents::freeze(&round.events);
        let mut players: Vec<_> = round.players.iter().collect();
        players.sort_by_key(|player| player.id_in_group);
        for player in players {
            match reconstruct_player(&events, player, channel, config, source) {
                Ok(trajectory) => reports.push(TrajectoryReport {
                    round_number,
                    id_in_subsession: round.group.id_in_subsession,
                    id_in_group: player.id_in_group,
                    trajectory,
                }),
                Err(err) => warn!(
                    round_number,
                    participant = %player.participant,
                    error = %err,
                    "Skipping trajectory"
                ),
            }
        }
    }
    reports
}

/// One human-readable line per round of the table.
pub fn round_lines(table: &RoundTable) -> Vec<String> {
    table
        .iter()
        .map(|(round_number, config)| {
            let mode = if config.is_discrete() {
                format!("{} subperiods", config.num_subperiods)
            } else {
                "continuous".to_owned()
            };
            let strategy = if config.pure_strategy { "pure" } else { "mixed" };
            let m = &config.payoff_matrix;
            format!(
                "round {round_number}: {}s {mode}, {strategy}, \
                 Aa={},{} Ab={},{} Ba={},{} Bb={},{}",
                config.period_length,
                m.aa.row,
                m.aa.column,
                m.ab.row,
                m.ab.column,
                m.ba.row,
                m.ba.column,
                m.bb.row,
                m.bb.column,
            )
        })
        .collect()
}

fn by_round(rounds: Vec<GroupRound>) -> BTreeMap<u32, Vec<GroupRound>> {
    let mut grouped: BTreeMap<u32, Vec<GroupRound>> = BTreeMap::new();
    for round in rounds {
        grouped.entry(round.group.round_number).or_default().push(round);
    }
    grouped
}

fn active_config(table: &RoundTable, round_number: u32) -> Option<&RoundConfig> {
    match table.config_for_round(round_number) {
        Ok(config) => Some(config),
        Err(err) => {
            info!(round_number, reason = %err, "Round inactive, skipping");
            None
        }
    }
}
