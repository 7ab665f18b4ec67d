//! Currency repository persisted to a JSON file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use ratewatch_common::{CurrencyCode, CurrencyRate, Timestamp};
use ratewatch_fx::{CurrencyRecord, CurrencyRepository, FxError, FxResult, InMemoryCurrencyRepository, SelectedCurrency};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

/// On-disk state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StateFile {
    pub fetched_at: Option<Timestamp>,
    pub launched: bool,
    pub records: Vec<CurrencyRecord>,
}

/// Repository that keeps rows in memory and rewrites the file after every
/// mutation. Without a path it behaves like the in-memory repository.
///
/// Saves are serialized and each one replaces the file through a rename, so
/// the file always holds one complete state, never older than the last save.
pub struct JsonFileRepository {
    inner: InMemoryCurrencyRepository,
    path: Option<PathBuf>,
    save_lock: Mutex<()>,
}

impl JsonFileRepository {
    /// Open the state at `path`, starting empty if the file does not exist.
    pub async fn open(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut state = StateFile::default();
        if let Some(path) = path {
            if tokio::fs::try_exists(path).await? {
                let bytes = tokio::fs::read(path).await?;
                state = serde_json::from_slice(&bytes)?;
                info!(path = %path.display(), records = state.records.len(), "Loaded state");
            }
        }

        Ok(Self {
            inner: InMemoryCurrencyRepository::from_records(state.records, state.fetched_at, state.launched),
            path: path.map(Path::to_path_buf),
            save_lock: Mutex::new(()),
        })
    }

    async fn save(&self) -> FxResult<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        // Held across the snapshot and the rename.
        let _guard = self.save_lock.lock().await;
        let state = StateFile {
            fetched_at: self.inner.timestamp(),
            launched: self.inner.launched(),
            records: self.inner.records(),
        };
        let bytes = serde_json::to_vec_pretty(&state).map_err(|e| FxError::Store(e.to_string()))?;
        let staging = path.with_extension("json.tmp");
        tokio::fs::write(&staging, bytes)
            .await
            .map_err(|e| FxError::Store(e.to_string()))?;
        tokio::fs::rename(&staging, path)
            .await
            .map_err(|e| FxError::Store(e.to_string()))?;
        debug!(path = %path.display(), "Saved state");
        Ok(())
    }
}

#[async_trait]
impl CurrencyRepository for JsonFileRepository {
    async fn get_all(&self) -> FxResult<Vec<CurrencyRate>> {
        self.inner.get_all().await
    }

    async fn get_selected(&self) -> FxResult<Vec<SelectedCurrency>> {
        self.inner.get_selected().await
    }

    async fn upsert_rates(&self, rates: Vec<CurrencyRate>, fetched_at: Timestamp) -> FxResult<()> {
        self.inner.upsert_rates(rates, fetched_at).await?;
        self.save().await
    }

    async fn update_rates(&self, rates: &BTreeMap<CurrencyCode, Decimal>, fetched_at: Timestamp) -> FxResult<()> {
        self.inner.update_rates(rates, fetched_at).await?;
        self.save().await
    }

    async fn save_selection(&self, selection: Vec<SelectedCurrency>) -> FxResult<()> {
        self.inner.save_selection(selection).await?;
        self.save().await
    }

    async fn fetched_at(&self) -> FxResult<Option<Timestamp>> {
        self.inner.fetched_at().await
    }

    async fn is_first_launch(&self) -> FxResult<bool> {
        self.inner.is_first_launch().await
    }

    async fn mark_launched(&self) -> FxResult<()> {
        self.inner.mark_launched().await?;
        self.save().await
    }
}
