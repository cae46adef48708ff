//! Error types for replaying a finished round.
//!
//! Round computations return [`RoundError`] from their `compute_*` forms.
//! The public scalar entry points (payoff, average strategy) convert every
//! variant into NaN, because an unavailable number must not abort a results
//! page or an aggregate across groups.

use bimatrix_events::EventLogError;
use bimatrix_types::{ParticipantCode, PeriodMarker};

/// Errors that can occur while replaying a round's events.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoundError {
    /// A `period_start` or `period_end` marker was never recorded.
    #[error("incomplete round: no {marker} marker")]
    IncompleteRound {
        /// The missing marker.
        marker: PeriodMarker,
    },

    /// The markers enclose no time (or `period_end` precedes
    /// `period_start`).
    #[error("round period has no positive duration")]
    EmptyPeriod,

    /// The configured round length is zero.
    #[error("configured period length is zero")]
    ZeroPeriodLength,

    /// No decision carrying this participant was recorded.
    #[error("no decisions recorded for participant {participant}")]
    NoDecisions {
        /// The participant that was looked for.
        participant: ParticipantCode,
    },

    /// The group does not consist of one row and one column player.
    #[error("malformed group: {reason}")]
    MalformedGroup {
        /// What is wrong with the group.
        reason: String,
    },
}

impl From<EventLogError> for RoundError {
    fn from(err: EventLogError) -> Self {
        match err {
            EventLogError::MissingMarker { marker } => Self::IncompleteRound { marker },
        }
    }
}
