use std::time::Duration;

/// Converts seconds to a `Duration`. Anything not strictly positive becomes
/// zero and values too large to represent saturate.
pub(crate) fn secs_to_duration(secs: f64) -> Duration {
    if secs.is_nan() || secs <= 0.0 {
        return Duration::ZERO;
    }

    Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
}
