//! Ratewatch FX Engine
//!
//! Exchange rate storage, multi-way conversion and rate freshness.
//!
//! # Features
//!
//! - Shared rate store serving the last good snapshot while a fetch runs
//! - Conversion of one focused amount into every other watched currency
//! - Staleness policy deciding when a refetch is required
//! - Partial-update merge of fetched snapshots
//!
//! # Example
//!
//! ```rust,ignore
//! use ratewatch_fx::{FreshnessPolicy, RateRefresher, RateStore};
//!
//! let store = Arc::new(RateStore::new());
//! let refresher = RateRefresher::new(transport, connectivity, store.clone(), repository,
//!     FreshnessPolicy::default(), api_key);
//!
//! refresher.refresh(ratewatch_common::now_seconds()).await?;
//! let snapshot = store.snapshot();
//! ```

pub mod conversion;
pub mod error;
pub mod freshness;
pub mod provider;
pub mod refresher;
pub mod repository;
pub mod store;

pub use conversion::{ConversionEngine, ConversionRow, ConvertedAmount};
pub use error::{FxError, FxResult};
pub use freshness::{FreshnessConfig, FreshnessDecision, FreshnessPolicy, MergeKind, MergeOutcome};
pub use provider::{Connectivity, FetchedRates, RateTransport, StaticConnectivity, TransportFailure};
pub use refresher::{RateRefresher, RefreshOutcome};
pub use repository::{CurrencyRecord, CurrencyRepository, InMemoryCurrencyRepository, SelectedCurrency};
pub use store::{RateStore, SharedRateStore};

#[cfg(any(test, feature = "test-utils"))]
pub use provider::MockRateTransport;
