//! Shared type definitions for the bimatrix flow-payoff experiment.
//!
//! This crate is the single source of truth for the types exchanged between
//! the experiment framework and the payoff engine. Types consumed by the
//! results pages flow downstream to `TypeScript` via `ts-rs`.
//!
//! # Modules
//!
//! - [`ids`] -- Newtype wrappers for participant and session codes
//! - [`enums`] -- Event channels, period markers, and player roles
//! - [`event`] -- Round events and their wire format
//! - [`game`] -- Payoff matrix and per-round configuration
//! - [`group`] -- Players, group identities, and round summaries

pub mod enums;
pub mod event;
pub mod game;
pub mod group;
pub mod ids;

// Re-export all public types at crate root for convenience.
pub use enums::{Channel, PeriodMarker, Role};
pub use event::{DecisionSnapshot, Event, EventFormatError, EventKind, RawEvent};
pub use game::{PayoffCell, PayoffMatrix, RoundConfig};
pub use group::{GroupIdentity, GroupRound, Player, PlayerSummary};
pub use ids::{ParticipantCode, SessionCode};
