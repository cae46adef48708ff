//! Players, groups, and the per-round records exchanged with the framework.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::Role;
use crate::event::Event;
use crate::ids::{ParticipantCode, SessionCode};

/// A participant's seat in a group for one round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Player {
    /// Participant code, the key inside merged decision snapshots.
    pub participant: ParticipantCode,
    /// 1 for the row player, 2 for the column player.
    pub id_in_group: u32,
    /// Round payoff written back after computation.
    #[serde(default)]
    pub payoff: Option<f64>,
}

impl Player {
    /// A player with no payoff recorded yet.
    pub fn new(participant: impl Into<ParticipantCode>, id_in_group: u32) -> Self {
        Self {
            participant: participant.into(),
            id_in_group,
            payoff: None,
        }
    }

    /// The player's role, if `id_in_group` names one.
    pub const fn role(&self) -> Option<Role> {
        Role::from_id_in_group(self.id_in_group)
    }
}

/// Identity columns of a group within a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct GroupIdentity {
    /// Session the group belongs to.
    pub session_code: SessionCode,
    /// Framework id of the round's subsession.
    pub subsession_id: u32,
    /// Group number within the subsession.
    pub id_in_subsession: u32,
    /// 1-based round number, used to look up the round's settings.
    pub round_number: u32,
}

/// Everything the framework hands over for one group in one finished round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupRound {
    /// Which group and round this is.
    pub group: GroupIdentity,
    /// The group's players.
    pub players: Vec<Player>,
    /// The round's recorded events, in arrival order.
    pub events: Vec<Event>,
}

impl GroupRound {
    /// The player holding `role`, if any.
    pub fn player_with_role(&self, role: Role) -> Option<&Player> {
        self.players.iter().find(|p| p.role() == Some(role))
    }
}

/// Per-player result of a round, as shown on the results page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct PlayerSummary {
    /// Participant code.
    pub participant: ParticipantCode,
    /// Role held in the round.
    pub role: Role,
    /// Time-averaged flow payoff (NaN when the round is incomplete).
    pub payoff: f64,
    /// Time-averaged strategy (NaN when the round is incomplete).
    pub average_strategy: f64,
}
