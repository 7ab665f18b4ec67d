//! Rate freshness policy: when to fetch, and how a fetch is merged.

use chrono::Duration;
use ratewatch_common::{constants, is_older_than, RateSnapshot, Timestamp};
use rust_decimal::Decimal;
use tracing::{debug, warn};

/// Configuration for the freshness policy.
#[derive(Debug, Clone)]
pub struct FreshnessConfig {
    /// Maximum age of a snapshot before a refetch is required.
    pub staleness_threshold: Duration,
    /// Deadline for a single fetch.
    pub fetch_timeout: std::time::Duration,
}

impl Default for FreshnessConfig {
    fn default() -> Self {
        Self {
            staleness_threshold: constants::staleness_threshold(),
            fetch_timeout: constants::fetch_timeout(),
        }
    }
}

impl FreshnessConfig {
    /// Load overrides from `RATEWATCH_STALENESS_SECS` and
    /// `RATEWATCH_FETCH_TIMEOUT_SECS`.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(secs) = std::env::var("RATEWATCH_STALENESS_SECS") {
            if let Ok(secs) = secs.parse::<i64>() {
                config.staleness_threshold = Duration::seconds(secs);
            }
        }

        if let Ok(secs) = std::env::var("RATEWATCH_FETCH_TIMEOUT_SECS") {
            if let Ok(secs) = secs.parse::<u64>() {
                config.fetch_timeout = std::time::Duration::from_secs(secs);
            }
        }

        config
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.staleness_threshold <= Duration::zero() {
            return Err("Staleness threshold must be positive".to_string());
        }
        if self.fetch_timeout.is_zero() {
            return Err("Fetch timeout must be positive".to_string());
        }
        Ok(())
    }
}

/// What a refresh should do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FreshnessDecision {
    /// Fetch from the rate source.
    Fetch,
    /// Serve the cached snapshot without fetching.
    UseCached,
    /// Nothing cached and no way to fetch.
    Unavailable,
}

/// How an incoming snapshot was folded into the existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeKind {
    /// Store was empty; the whole incoming table was inserted.
    Inserted { inserted: usize },
    /// Store was stale; known rates were updated in place.
    Updated { updated: usize, ignored: usize },
}

/// Result of a merge.
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    pub snapshot: RateSnapshot,
    pub kind: MergeKind,
}

/// Decides when rates must be refetched and merges fetched snapshots.
#[derive(Debug, Clone, Default)]
pub struct FreshnessPolicy {
    config: FreshnessConfig,
}

impl FreshnessPolicy {
    /// Create a policy with the given configuration.
    pub fn new(config: FreshnessConfig) -> Self {
        Self { config }
    }

    /// Get the policy configuration.
    pub fn config(&self) -> &FreshnessConfig {
        &self.config
    }

    /// Check if a snapshot is stale at `now`. An empty snapshot is always stale.
    pub fn is_stale(&self, snapshot: &RateSnapshot, now: Timestamp) -> bool {
        snapshot.is_empty() || is_older_than(snapshot.fetched_at, now, self.config.staleness_threshold)
    }

    /// Apply the connectivity / empty / stale decision table.
    pub fn decide(&self, connected: bool, snapshot: &RateSnapshot, now: Timestamp) -> FreshnessDecision {
        let decision = match (connected, snapshot.is_empty()) {
            (false, true) => FreshnessDecision::Unavailable,
            (false, false) => FreshnessDecision::UseCached,
            (true, true) => FreshnessDecision::Fetch,
            (true, false) if self.is_stale(snapshot, now) => FreshnessDecision::Fetch,
            (true, false) => FreshnessDecision::UseCached,
        };

        debug!(
            connected,
            empty = snapshot.is_empty(),
            fetched_at = snapshot.fetched_at,
            now,
            ?decision,
            "Freshness decision"
        );

        decision
    }

    /// Check whether a fetch is required.
    pub fn needs_fetch(&self, connected: bool, snapshot: &RateSnapshot, now: Timestamp) -> bool {
        self.decide(connected, snapshot, now) == FreshnessDecision::Fetch
    }

    /// Merge a fetched snapshot into the existing one.
    ///
    /// An empty store takes the whole incoming table. A non-empty store only
    /// has its known rates updated; codes it does not know are ignored and
    /// codes missing from the payload keep their previous rate. The result
    /// always carries the incoming (upstream) timestamp. Non-positive rates
    /// are dropped.
    pub fn merge_snapshot(existing: &RateSnapshot, incoming: RateSnapshot) -> MergeOutcome {
        let fetched_at = incoming.fetched_at;
        let valid = incoming.rates.into_iter().filter(|(code, rate)| {
            if *rate <= Decimal::ZERO {
                warn!(code = %code, rate = %rate, "Dropping non-positive rate");
                return false;
            }
            true
        });

        if existing.is_empty() {
            let rates: std::collections::BTreeMap<_, _> = valid.collect();
            let inserted = rates.len();
            return MergeOutcome {
                snapshot: RateSnapshot::new(rates, fetched_at),
                kind: MergeKind::Inserted { inserted },
            };
        }

        let mut rates = existing.rates.clone();
        let mut updated = 0;
        let mut ignored = 0;
        for (code, rate) in valid {
            match rates.get_mut(&code) {
                Some(slot) => {
                    *slot = rate;
                    updated += 1;
                }
                None => ignored += 1,
            }
        }

        MergeOutcome {
            snapshot: RateSnapshot::new(rates, fetched_at),
            kind: MergeKind::Updated { updated, ignored },
        }
    }
}
