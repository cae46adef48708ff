//! Frozen event logs for finished bimatrix rounds.
//!
//! Events are the source of truth for a round -- strategy trajectories,
//! payoffs, and export tables are all reconstructed by replaying them. This
//! crate owns the read-only view every consumer replays from:
//!
//! - [`log`] -- [`RoundEvents`], a stably time-ordered snapshot of one
//!   round's events with channel queries and period-marker lookup.
//! - [`cursor`] -- [`EventCursor`], a forward-only position into a frozen
//!   log that never consumes or reorders the underlying events.
//! - [`time`] -- Conversions between timestamps and fractional seconds.
//!
//! A [`RoundEvents`] value is built once and never mutated, so replaying it
//! any number of times yields identical results.

pub mod cursor;
pub mod log;
pub mod time;

pub use cursor::EventCursor;
pub use log::{EventLogError, Period, RoundEvents};
pub use time::seconds_between;
