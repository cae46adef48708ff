//! Timestamp arithmetic in fractional seconds.

use chrono::{DateTime, Utc};

/// Signed number of seconds from `from` to `to`, with sub-second precision.
///
/// Negative when `to` precedes `from`.
#[allow(clippy::cast_precision_loss)]
pub fn seconds_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    let delta = to.signed_duration_since(from);
    // Whole seconds of any realistic round fit in f64's 53-bit mantissa.
    delta.num_seconds() as f64 + f64::from(delta.subsec_nanos()) / 1e9
}
