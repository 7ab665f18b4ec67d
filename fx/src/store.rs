//! In-memory exchange rate store.

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;
use ratewatch_common::{metadata, CurrencyCode, CurrencyRate, RateSnapshot, Timestamp};
use tracing::{debug, info};

use crate::freshness::{FreshnessPolicy, MergeOutcome};

/// Display metadata kept alongside a rate.
#[derive(Debug, Clone, PartialEq, Eq)]
struct CurrencyMeta {
    name: String,
    symbol_or_flag_ref: String,
}

impl CurrencyMeta {
    fn builtin(code: &CurrencyCode) -> Self {
        Self {
            name: metadata::display_name(code),
            symbol_or_flag_ref: metadata::flag_ref(code),
        }
    }
}

/// Latest known rates plus per-currency display metadata.
///
/// Readers take an `Arc` of the current snapshot and keep using it while a
/// fetch is in flight. A merge swaps the snapshot under the write lock, so
/// nobody ever observes a partially applied fetch.
pub struct RateStore {
    snapshot: RwLock<Arc<RateSnapshot>>,
    metadata: DashMap<CurrencyCode, CurrencyMeta>,
}

impl RateStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            snapshot: RwLock::new(Arc::new(RateSnapshot::empty())),
            metadata: DashMap::new(),
        }
    }

    /// Create a store from a persisted catalog.
    pub fn from_catalog(catalog: Vec<CurrencyRate>, fetched_at: Timestamp) -> Self {
        let store = Self::new();
        let mut snapshot = RateSnapshot::new(Default::default(), fetched_at);
        for entry in catalog {
            store.metadata.insert(
                entry.code.clone(),
                CurrencyMeta {
                    name: entry.name,
                    symbol_or_flag_ref: entry.symbol_or_flag_ref,
                },
            );
            snapshot.rates.insert(entry.code, entry.rate_to_base);
        }
        *store.snapshot.write() = Arc::new(snapshot);
        store
    }

    /// Get the current snapshot.
    pub fn snapshot(&self) -> Arc<RateSnapshot> {
        self.snapshot.read().clone()
    }

    /// Check if the store holds no rates.
    pub fn is_empty(&self) -> bool {
        self.snapshot.read().is_empty()
    }

    /// Number of currencies in the store.
    pub fn len(&self) -> usize {
        self.snapshot.read().len()
    }

    /// Upstream timestamp of the current snapshot, if any rates are held.
    pub fn fetched_at(&self) -> Option<Timestamp> {
        let snapshot = self.snapshot.read();
        (!snapshot.is_empty()).then_some(snapshot.fetched_at)
    }

    /// Get a catalog entry for a currency.
    pub fn get(&self, code: &CurrencyCode) -> Option<CurrencyRate> {
        let rate = self.snapshot.read().rate(code)?;
        Some(self.entry(code.clone(), rate))
    }

    /// The full catalog, sorted by code.
    pub fn catalog(&self) -> Vec<CurrencyRate> {
        self.catalog_of(&self.snapshot())
    }

    /// Catalog entries for the rates of a given snapshot, such as the one a
    /// merge produced.
    pub fn catalog_of(&self, snapshot: &RateSnapshot) -> Vec<CurrencyRate> {
        snapshot
            .rates
            .iter()
            .map(|(code, rate)| self.entry(code.clone(), *rate))
            .collect()
    }

    /// Merge a fetched snapshot into the store.
    ///
    /// The merge runs against whatever snapshot is current when the write
    /// lock is taken, so concurrent fetches cannot lose each other's updates.
    pub fn apply_fetch(&self, incoming: RateSnapshot) -> MergeOutcome {
        let mut guard = self.snapshot.write();
        let outcome = FreshnessPolicy::merge_snapshot(&guard, incoming);

        for code in outcome.snapshot.rates.keys() {
            if !self.metadata.contains_key(code) {
                self.metadata.insert(code.clone(), CurrencyMeta::builtin(code));
            }
        }

        *guard = Arc::new(outcome.snapshot.clone());
        drop(guard);

        info!(
            kind = ?outcome.kind,
            fetched_at = outcome.snapshot.fetched_at,
            currencies = outcome.snapshot.len(),
            "Applied rate snapshot"
        );

        outcome
    }

    /// Get store statistics.
    pub fn stats(&self) -> RateStoreStats {
        let snapshot = self.snapshot();
        RateStoreStats {
            currencies: snapshot.len(),
            fetched_at: (!snapshot.is_empty()).then_some(snapshot.fetched_at),
        }
    }

    fn entry(&self, code: CurrencyCode, rate_to_base: rust_decimal::Decimal) -> CurrencyRate {
        let meta = self
            .metadata
            .get(&code)
            .map(|m| m.clone())
            .unwrap_or_else(|| {
                debug!(code = %code, "No metadata for currency, using built-in");
                CurrencyMeta::builtin(&code)
            });
        CurrencyRate {
            code,
            name: meta.name,
            symbol_or_flag_ref: meta.symbol_or_flag_ref,
            rate_to_base,
        }
    }
}

impl Default for RateStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Store statistics.
#[derive(Debug, Clone)]
pub struct RateStoreStats {
    pub currencies: usize,
    pub fetched_at: Option<Timestamp>,
}

/// Shared rate store.
pub type SharedRateStore = Arc<RateStore>;
