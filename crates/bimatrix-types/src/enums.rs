//! Enumeration types for the bimatrix experiment.
//!
//! Channels name the four kinds of events the framework records during a
//! round, period markers delimit the round, and roles distinguish the row
//! player from the column player.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Event channels
// ---------------------------------------------------------------------------

/// The channel an event was recorded on.
///
/// The wire format uses the framework's channel names verbatim
/// (`decisions`, `group_decisions`, `state`, `target`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    /// A single participant changed their strategy.
    Decisions,
    /// Snapshot of every group member's current strategy.
    GroupDecisions,
    /// Round lifecycle marker (`period_start` / `period_end`).
    State,
    /// Auxiliary per-participant target signal.
    Target,
}

impl Channel {
    /// The framework's name for this channel.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Decisions => "decisions",
            Self::GroupDecisions => "group_decisions",
            Self::State => "state",
            Self::Target => "target",
        }
    }
}

impl core::fmt::Display for Channel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Round lifecycle
// ---------------------------------------------------------------------------

/// Value carried by a `state` event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "snake_case")]
pub enum PeriodMarker {
    /// The round's decision period opened.
    PeriodStart,
    /// The round's decision period closed.
    PeriodEnd,
}

impl PeriodMarker {
    /// The framework's name for this marker.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PeriodStart => "period_start",
            Self::PeriodEnd => "period_end",
        }
    }
}

impl core::fmt::Display for PeriodMarker {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Roles
// ---------------------------------------------------------------------------

/// A player's role in the bimatrix game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Chooses between rows `A` and `B` (`id_in_group == 1`).
    Row,
    /// Chooses between columns `a` and `b` (`id_in_group == 2`).
    Column,
}

impl Role {
    /// Map the framework's `id_in_group` to a role.
    ///
    /// Returns `None` for anything other than 1 or 2.
    pub const fn from_id_in_group(id_in_group: u32) -> Option<Self> {
        match id_in_group {
            1 => Some(Self::Row),
            2 => Some(Self::Column),
            _ => None,
        }
    }

    /// The framework's `id_in_group` for this role.
    pub const fn id_in_group(self) -> u32 {
        match self {
            Self::Row => 1,
            Self::Column => 2,
        }
    }

    /// The opposing role.
    pub const fn other(self) -> Self {
        match self {
            Self::Row => Self::Column,
            Self::Column => Self::Row,
        }
    }

    /// Lowercase name used in reports and logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Row => "row",
            Self::Column => "column",
        }
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
