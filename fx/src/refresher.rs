//! Rate refresh orchestration.

use std::sync::Arc;

use ratewatch_common::{RateSnapshot, Timestamp};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{info, instrument, warn};

use crate::error::{FxError, FxResult, TIMEOUT_MESSAGE, UNAVAILABLE_MESSAGE};
use crate::freshness::{FreshnessDecision, FreshnessPolicy, MergeKind};
use crate::provider::{Connectivity, RateTransport};
use crate::repository::CurrencyRepository;
use crate::store::RateStore;

/// What a successful refresh did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// A fetch was merged into the store.
    Fetched { kind: MergeKind, fetched_at: Timestamp },
    /// The cached snapshot was served as is.
    Cached { fetched_at: Timestamp },
}

/// Decides whether to fetch, fetches, merges and persists.
pub struct RateRefresher {
    transport: Arc<dyn RateTransport>,
    connectivity: Arc<dyn Connectivity>,
    store: Arc<RateStore>,
    repository: Arc<dyn CurrencyRepository>,
    policy: FreshnessPolicy,
    api_key: String,
}

impl RateRefresher {
    /// Create a new refresher.
    pub fn new(
        transport: Arc<dyn RateTransport>,
        connectivity: Arc<dyn Connectivity>,
        store: Arc<RateStore>,
        repository: Arc<dyn CurrencyRepository>,
        policy: FreshnessPolicy,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            connectivity,
            store,
            repository,
            policy,
            api_key: api_key.into(),
        }
    }

    /// Get the shared rate store.
    pub fn store(&self) -> &Arc<RateStore> {
        &self.store
    }

    /// Refresh rates if the freshness policy requires it.
    ///
    /// On any failure the store keeps its previous snapshot.
    #[instrument(skip(self), fields(transport = self.transport.name()))]
    pub async fn refresh(&self, now: Timestamp) -> FxResult<RefreshOutcome> {
        let snapshot = self.store.snapshot();
        let connected = self.connectivity.is_available();

        match self.policy.decide(connected, &snapshot, now) {
            FreshnessDecision::Unavailable => {
                warn!("No connectivity and no cached rates");
                Err(FxError::Unavailable(UNAVAILABLE_MESSAGE.to_string()))
            }
            FreshnessDecision::UseCached => Ok(RefreshOutcome::Cached {
                fetched_at: snapshot.fetched_at,
            }),
            FreshnessDecision::Fetch => self.fetch_and_merge().await,
        }
    }

    /// Run a refresh on its own task, off any latency-sensitive path.
    pub fn spawn_refresh(self: Arc<Self>, now: Timestamp) -> JoinHandle<FxResult<RefreshOutcome>> {
        tokio::spawn(async move { self.refresh(now).await })
    }

    async fn fetch_and_merge(&self) -> FxResult<RefreshOutcome> {
        let fetched = match timeout(self.policy.config().fetch_timeout, self.transport.fetch_rates(&self.api_key)).await {
            Ok(Ok(fetched)) => fetched,
            Ok(Err(failure)) => {
                warn!(error = %failure, "Rate fetch failed");
                return Err(failure.into());
            }
            Err(_) => {
                warn!(timeout = ?self.policy.config().fetch_timeout, "Rate fetch exceeded deadline");
                return Err(FxError::Timeout(TIMEOUT_MESSAGE.to_string()));
            }
        };

        let outcome = self.store.apply_fetch(RateSnapshot::from(fetched));
        let fetched_at = outcome.snapshot.fetched_at;

        let persisted = match outcome.kind {
            MergeKind::Inserted { .. } => {
                let catalog = self.store.catalog_of(&outcome.snapshot);
                self.repository.upsert_rates(catalog, fetched_at).await
            }
            MergeKind::Updated { .. } => self.repository.update_rates(&outcome.snapshot.rates, fetched_at).await,
        };
        if let Err(e) = persisted {
            // The in-memory store is authoritative; the next refresh persists again.
            warn!(error = %e, "Failed to persist fetched rates");
        }

        info!(kind = ?outcome.kind, fetched_at, "Rates refreshed");

        Ok(RefreshOutcome::Fetched {
            kind: outcome.kind,
            fetched_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::freshness::FreshnessConfig;
    use crate::provider::{MockRateTransport, StaticConnectivity, TransportFailure};
    use crate::repository::InMemoryCurrencyRepository;
    use chrono::Duration;
    use ratewatch_common::CurrencyCode;
    use rust_decimal_macros::dec;

    struct Harness {
        transport: Arc<MockRateTransport>,
        connectivity: Arc<StaticConnectivity>,
        store: Arc<RateStore>,
        repository: Arc<InMemoryCurrencyRepository>,
        refresher: RateRefresher,
    }

    fn harness(transport: MockRateTransport, connected: bool) -> Harness {
        let transport = Arc::new(transport);
        let connectivity = Arc::new(StaticConnectivity::new(connected));
        let store = Arc::new(RateStore::new());
        let repository = Arc::new(InMemoryCurrencyRepository::new());
        let policy = FreshnessPolicy::new(FreshnessConfig {
            staleness_threshold: Duration::seconds(3600),
            fetch_timeout: std::time::Duration::from_millis(50),
        });
        let refresher = RateRefresher::new(
            transport.clone(),
            connectivity.clone(),
            store.clone(),
            repository.clone(),
            policy,
            "test-key",
        );
        Harness {
            transport,
            connectivity,
            store,
            repository,
            refresher,
        }
    }

    #[tokio::test]
    async fn test_offline_and_empty_is_unavailable() {
        let h = harness(MockRateTransport::new("test"), false);

        let result = h.refresher.refresh(1_000).await;

        assert_eq!(result, Err(FxError::Unavailable(UNAVAILABLE_MESSAGE.to_string())));
        assert_eq!(h.transport.calls(), 0);
    }

    #[tokio::test]
    async fn test_first_fetch_inserts_and_persists() {
        let transport = MockRateTransport::new("test");
        transport.push_rates(&[("USD", dec!(1)), ("EUR", dec!(0.9))], 5_000);
        let h = harness(transport, true);

        let outcome = h.refresher.refresh(5_010).await.unwrap();

        assert_eq!(
            outcome,
            RefreshOutcome::Fetched {
                kind: MergeKind::Inserted { inserted: 2 },
                fetched_at: 5_000
            }
        );
        assert_eq!(h.store.len(), 2);
        assert_eq!(h.repository.get_all().await.unwrap().len(), 2);
        assert_eq!(h.repository.fetched_at().await.unwrap(), Some(5_000));
    }

    #[tokio::test]
    async fn test_persisted_rows_match_merged_snapshot() {
        let transport = MockRateTransport::new("test");
        transport.push_rates(&[("USD", dec!(1)), ("EUR", dec!(0.9))], 5_000);
        let h = harness(transport, true);
        h.refresher.refresh(5_010).await.unwrap();

        // A later merge must not leak into rows persisted for the first one.
        let merged = h.store.snapshot();
        h.store
            .apply_fetch(RateSnapshot::new([(CurrencyCode::eur(), dec!(0.95))].into_iter().collect(), 6_000));
        assert_eq!(h.store.get(&CurrencyCode::eur()).unwrap().rate_to_base, dec!(0.95));
        let eur = h.store.catalog_of(&merged).into_iter().find(|r| r.code == CurrencyCode::eur()).unwrap();
        assert_eq!(eur.rate_to_base, dec!(0.9));

        let persisted = h.repository.get_all().await.unwrap();
        let rows: Vec<_> = persisted.iter().map(|r| (r.code.clone(), r.rate_to_base)).collect();
        let expected: Vec<_> = merged.rates.iter().map(|(code, rate)| (code.clone(), *rate)).collect();
        assert_eq!(rows, expected);
        assert_eq!(h.repository.fetched_at().await.unwrap(), Some(merged.fetched_at));
    }

    #[tokio::test]
    async fn test_fresh_store_skips_fetch() {
        let transport = MockRateTransport::new("test");
        transport.push_rates(&[("USD", dec!(1))], 5_000);
        let h = harness(transport, true);
        tokio_test::assert_ok!(h.refresher.refresh(5_000).await);

        let outcome = h.refresher.refresh(5_100).await.unwrap();

        assert_eq!(outcome, RefreshOutcome::Cached { fetched_at: 5_000 });
        assert_eq!(h.transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_offline_stale_store_serves_cache() {
        let transport = MockRateTransport::new("test");
        transport.push_rates(&[("USD", dec!(1))], 5_000);
        let h = harness(transport, true);
        h.refresher.refresh(5_000).await.unwrap();

        h.connectivity.set_available(false);
        let outcome = h.refresher.refresh(50_000).await.unwrap();

        assert_eq!(outcome, RefreshOutcome::Cached { fetched_at: 5_000 });
        assert_eq!(h.transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_stale_store_updates_in_place() {
        let transport = MockRateTransport::new("test");
        transport.push_rates(&[("USD", dec!(1)), ("EUR", dec!(0.9)), ("GBP", dec!(0.8))], 1_000);
        transport.push_rates(&[("EUR", dec!(0.92))], 9_000);
        let h = harness(transport, true);
        h.refresher.refresh(1_000).await.unwrap();

        let outcome = h.refresher.refresh(9_000).await.unwrap();

        assert!(matches!(
            outcome,
            RefreshOutcome::Fetched {
                kind: MergeKind::Updated { updated: 1, ignored: 0 },
                fetched_at: 9_000
            }
        ));
        let snapshot = h.store.snapshot();
        assert_eq!(snapshot.rate(&CurrencyCode::eur()), Some(dec!(0.92)));
        assert_eq!(snapshot.rate(&CurrencyCode::gbp()), Some(dec!(0.8)));
    }

    #[tokio::test]
    async fn test_remote_error_keeps_cache() {
        let transport = MockRateTransport::new("test");
        transport.push_rates(&[("USD", dec!(1))], 1_000);
        transport.push_failure(TransportFailure::Remote {
            status: 401,
            message: Some("invalid_app_id".to_string()),
        });
        let h = harness(transport, true);
        h.refresher.refresh(1_000).await.unwrap();

        let result = h.refresher.refresh(99_000).await;

        assert!(matches!(result, Err(FxError::RemoteError { status: 401, .. })));
        assert_eq!(h.store.fetched_at(), Some(1_000));
    }

    #[tokio::test]
    async fn test_slow_transport_times_out() {
        let transport = MockRateTransport::new("test").with_delay(std::time::Duration::from_millis(500));
        transport.push_rates(&[("USD", dec!(1))], 1_000);
        let h = harness(transport, true);

        let result = h.refresher.refresh(1_000).await;

        assert!(matches!(result, Err(FxError::Timeout(_))));
        assert!(result.unwrap_err().is_retryable());
        assert!(h.store.is_empty());
    }

    #[tokio::test]
    async fn test_spawned_refresh() {
        let transport = MockRateTransport::new("test");
        transport.push_rates(&[("USD", dec!(1))], 1_000);
        let h = harness(transport, true);
        let store = h.store.clone();

        let handle = Arc::new(h.refresher).spawn_refresh(1_000);
        handle.await.unwrap().unwrap();

        assert_eq!(store.len(), 1);
    }
}
