//! Initial-decision sources.
//!
//! Before a participant's first recorded decision, their strategy is an
//! initial decision drawn once per player per round: a coin flip between 0
//! and 1 in pure-strategy rounds, a uniform real in `[0, 1)` otherwise. The
//! [`InitialDecisionSource`] trait abstracts where that draw comes from, so
//! replays can be seeded and tests can pin the value.

use rand::Rng;
use rand::SeedableRng;
use rand::rngs::SmallRng;

/// A source of initial strategy values.
pub trait InitialDecisionSource {
    /// Draw one initial decision.
    ///
    /// With `pure_strategy` the result is exactly `0.0` or `1.0`; otherwise
    /// it lies in `[0, 1)`.
    fn initial_decision(&mut self, pure_strategy: bool) -> f64;
}

/// Draws initial decisions from a random number generator.
#[derive(Debug, Clone)]
pub struct RngDecisionSource<R> {
    rng: R,
}

impl<R: Rng> RngDecisionSource<R> {
    /// Wrap an existing generator.
    pub const fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl RngDecisionSource<SmallRng> {
    /// A reproducible source: the same seed yields the same draws.
    pub fn seeded(seed: u64) -> Self {
        Self::new(SmallRng::seed_from_u64(seed))
    }

    /// A source seeded from OS entropy.
    pub fn from_entropy() -> Self {
        Self::new(SmallRng::from_os_rng())
    }
}

impl<R: Rng> InitialDecisionSource for RngDecisionSource<R> {
    fn initial_decision(&mut self, pure_strategy: bool) -> f64 {
        if pure_strategy {
            if self.rng.random_bool(0.5) { 1.0 } else { 0.0 }
        } else {
            self.rng.random::<f64>()
        }
    }
}

/// Always returns the same value, regardless of the strategy mode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedDecisionSource(pub f64);

impl InitialDecisionSource for FixedDecisionSource {
    fn initial_decision(&mut self, _pure_strategy: bool) -> f64 {
        self.0
    }
}
