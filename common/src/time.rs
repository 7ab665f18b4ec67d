//! Time utilities and constants for Ratewatch.

use chrono::{Duration, Utc};

/// Rate freshness constants.
pub mod constants {
    use super::Duration;

    /// Age after which a cached snapshot needs a refetch (1 hour).
    pub fn staleness_threshold() -> Duration {
        Duration::hours(1)
    }

    /// Upper bound on a single rate fetch (10 seconds).
    pub fn fetch_timeout() -> std::time::Duration {
        std::time::Duration::from_secs(10)
    }
}

/// Epoch seconds, as reported by the upstream rate source.
pub type Timestamp = i64;

/// Current local time in epoch seconds.
pub fn now_seconds() -> Timestamp {
    Utc::now().timestamp()
}

/// Check whether a fetch at `fetched_at` is older than `threshold` at `now`.
///
/// An age exactly equal to the threshold is still fresh.
pub fn is_older_than(fetched_at: Timestamp, now: Timestamp, threshold: Duration) -> bool {
    now - fetched_at > threshold.num_seconds()
}
