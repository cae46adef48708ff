//! Trajectory reconstruction, flow-payoff integration, and export resampling
//! for the bimatrix experiment.
//!
//! Every computation here runs on a frozen [`RoundEvents`] log and an
//! explicitly passed [`RoundConfig`]; nothing reads global state. Values that
//! cannot be computed (incomplete rounds, empty periods) come back as NaN
//! from the scalar entry points and as [`RoundError`] from the `compute_*`
//! forms.
//!
//! # Modules
//!
//! - [`config`] -- Session settings from YAML.
//! - [`round_table`] -- Per-round settings from the CSV round table.
//! - [`decision`] -- [`InitialDecisionSource`] trait and its RNG and fixed
//!   implementations.
//! - [`trajectory`] -- Piecewise-constant strategy trajectories.
//! - [`payoff`] -- Flow-payoff integration and time-averaged strategies.
//! - [`aggregate`] -- Group summaries and per-role averages.
//! - [`export`] -- Fixed-tick and event-tick export tables.
//! - [`error`] -- [`RoundError`].
//!
//! [`RoundEvents`]: bimatrix_events::RoundEvents
//! [`RoundConfig`]: bimatrix_types::RoundConfig
//! [`InitialDecisionSource`]: decision::InitialDecisionSource
//! [`RoundError`]: error::RoundError

pub mod aggregate;
pub mod config;
pub mod decision;
pub mod error;
pub mod export;
pub mod payoff;
pub mod round_table;
pub mod trajectory;
