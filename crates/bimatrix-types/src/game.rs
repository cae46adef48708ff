//! The bimatrix game played in each round and its per-round settings.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::Role;

/// One cell of the bimatrix: what each role earns for a pair of choices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct PayoffCell {
    /// Payoff to the row player.
    pub row: i32,
    /// Payoff to the column player.
    pub column: i32,
}

impl PayoffCell {
    /// Build a cell from `(row, column)` payoffs.
    pub const fn new(row: i32, column: i32) -> Self {
        Self { row, column }
    }

    /// The payoff this cell pays to `role`.
    pub const fn for_role(self, role: Role) -> i32 {
        match role {
            Role::Row => self.row,
            Role::Column => self.column,
        }
    }
}

/// The 2x2 payoff matrix.
///
/// Upper-case letters are the row player's choice (`A` / `B`), lower-case
/// letters the column player's (`a` / `b`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct PayoffMatrix {
    /// Row plays `A`, column plays `a`.
    pub aa: PayoffCell,
    /// Row plays `A`, column plays `b`.
    pub ab: PayoffCell,
    /// Row plays `B`, column plays `a`.
    pub ba: PayoffCell,
    /// Row plays `B`, column plays `b`.
    pub bb: PayoffCell,
}

impl PayoffMatrix {
    /// Build a matrix from its four cells in `Aa, Ab, Ba, Bb` order.
    pub const fn new(aa: PayoffCell, ab: PayoffCell, ba: PayoffCell, bb: PayoffCell) -> Self {
        Self { aa, ab, ba, bb }
    }

    /// The four cells in `Aa, Ab, Ba, Bb` order.
    pub const fn cells(&self) -> [PayoffCell; 4] {
        [self.aa, self.ab, self.ba, self.bb]
    }

    /// Smallest and largest payoff `role` can receive from any cell.
    pub fn bounds_for(&self, role: Role) -> (i32, i32) {
        let values = self.cells().map(|cell| cell.for_role(role));
        let lo = values.iter().copied().min().unwrap_or(0);
        let hi = values.iter().copied().max().unwrap_or(0);
        (lo, hi)
    }
}

/// Settings for one round, one row of the round table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct RoundConfig {
    /// Whether roles are reshuffled when groups are formed for this round.
    pub shuffle_role: bool,
    /// Configured round length in seconds.
    pub period_length: u32,
    /// Number of discrete subperiods; 0 means continuous time.
    pub num_subperiods: u32,
    /// Whether initial choices are a coin flip between 0 and 1.
    pub pure_strategy: bool,
    /// Front-end flag: display the worst-case payoff.
    pub show_at_worst: bool,
    /// Front-end flag: display the best response.
    pub show_best_response: bool,
    /// Front-end rate limit on decision changes (0 = unlimited).
    pub rate_limit: u32,
    /// Whether players are matched against the mean of the other role.
    pub mean_matching: bool,
    /// The game played in this round.
    pub payoff_matrix: PayoffMatrix,
}

impl RoundConfig {
    /// Whether the round is sampled at each decision rather than on a fixed
    /// clock.
    pub const fn is_discrete(&self) -> bool {
        self.num_subperiods > 0
    }
}
