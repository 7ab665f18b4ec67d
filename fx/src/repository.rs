//! Persistence collaborator for the currency catalog and the watchlist.

use std::collections::BTreeMap;

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use ratewatch_common::{CurrencyCode, CurrencyRate, Timestamp};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::FxResult;

/// A currency the user has selected, with its watchlist position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedCurrency {
    pub code: CurrencyCode,
    pub position: usize,
}

/// Key-value store keyed on currency code, with a selected flag and a
/// position column.
#[async_trait]
pub trait CurrencyRepository: Send + Sync {
    /// The whole catalog, sorted by code.
    async fn get_all(&self) -> FxResult<Vec<CurrencyRate>>;

    /// Selected currencies, sorted by position.
    async fn get_selected(&self) -> FxResult<Vec<SelectedCurrency>>;

    /// Insert or replace catalog entries.
    async fn upsert_rates(&self, rates: Vec<CurrencyRate>, fetched_at: Timestamp) -> FxResult<()>;

    /// Update the rate of already known currencies; unknown codes are ignored.
    async fn update_rates(&self, rates: &BTreeMap<CurrencyCode, Decimal>, fetched_at: Timestamp) -> FxResult<()>;

    /// Replace the selected set and positions.
    async fn save_selection(&self, selection: Vec<SelectedCurrency>) -> FxResult<()>;

    /// Upstream timestamp of the persisted rates.
    async fn fetched_at(&self) -> FxResult<Option<Timestamp>>;

    /// Whether the application has never completed a launch.
    async fn is_first_launch(&self) -> FxResult<bool>;

    /// Record that the first launch completed.
    async fn mark_launched(&self) -> FxResult<()>;
}

/// Persisted row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyRecord {
    pub rate: CurrencyRate,
    pub position: Option<usize>,
}

/// In-memory repository.
#[derive(Debug, Default)]
pub struct InMemoryCurrencyRepository {
    records: DashMap<CurrencyCode, CurrencyRecord>,
    fetched_at: Mutex<Option<Timestamp>>,
    launched: Mutex<bool>,
}

impl InMemoryCurrencyRepository {
    /// Create an empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a repository from persisted rows.
    pub fn from_records(records: Vec<CurrencyRecord>, fetched_at: Option<Timestamp>, launched: bool) -> Self {
        let repo = Self::new();
        for record in records {
            repo.records.insert(record.rate.code.clone(), record);
        }
        *repo.fetched_at.lock() = fetched_at;
        *repo.launched.lock() = launched;
        repo
    }

    /// All rows, sorted by code.
    pub fn records(&self) -> Vec<CurrencyRecord> {
        let mut records: Vec<CurrencyRecord> = self.records.iter().map(|r| r.value().clone()).collect();
        records.sort_by(|a, b| a.rate.code.cmp(&b.rate.code));
        records
    }

    /// Persisted timestamp, without going through the async trait.
    pub fn timestamp(&self) -> Option<Timestamp> {
        *self.fetched_at.lock()
    }

    /// Whether a launch completed, without going through the async trait.
    pub fn launched(&self) -> bool {
        *self.launched.lock()
    }
}

#[async_trait]
impl CurrencyRepository for InMemoryCurrencyRepository {
    async fn get_all(&self) -> FxResult<Vec<CurrencyRate>> {
        Ok(self.records().into_iter().map(|r| r.rate).collect())
    }

    async fn get_selected(&self) -> FxResult<Vec<SelectedCurrency>> {
        let mut selected: Vec<SelectedCurrency> = self
            .records
            .iter()
            .filter_map(|r| {
                r.position.map(|position| SelectedCurrency {
                    code: r.rate.code.clone(),
                    position,
                })
            })
            .collect();
        selected.sort_by_key(|s| s.position);
        Ok(selected)
    }

    async fn upsert_rates(&self, rates: Vec<CurrencyRate>, fetched_at: Timestamp) -> FxResult<()> {
        debug!(count = rates.len(), fetched_at, "Upserting rates");
        for rate in rates {
            let position = self.records.get(&rate.code).and_then(|r| r.position);
            self.records.insert(rate.code.clone(), CurrencyRecord { rate, position });
        }
        *self.fetched_at.lock() = Some(fetched_at);
        Ok(())
    }

    async fn update_rates(&self, rates: &BTreeMap<CurrencyCode, Decimal>, fetched_at: Timestamp) -> FxResult<()> {
        debug!(count = rates.len(), fetched_at, "Updating rates");
        for (code, rate) in rates {
            if let Some(mut record) = self.records.get_mut(code) {
                record.rate.rate_to_base = *rate;
            }
        }
        *self.fetched_at.lock() = Some(fetched_at);
        Ok(())
    }

    async fn save_selection(&self, selection: Vec<SelectedCurrency>) -> FxResult<()> {
        let positions: BTreeMap<CurrencyCode, usize> =
            selection.into_iter().map(|s| (s.code, s.position)).collect();
        for mut record in self.records.iter_mut() {
            record.position = positions.get(&record.rate.code).copied();
        }
        Ok(())
    }

    async fn fetched_at(&self) -> FxResult<Option<Timestamp>> {
        Ok(self.timestamp())
    }

    async fn is_first_launch(&self) -> FxResult<bool> {
        Ok(!self.launched())
    }

    async fn mark_launched(&self) -> FxResult<()> {
        *self.launched.lock() = true;
        Ok(())
    }
}
