//! Rate transport and connectivity collaborators.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use ratewatch_common::{CurrencyCode, RateSnapshot, Timestamp};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{FxError, TIMEOUT_MESSAGE};

/// Rates as returned by a transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchedRates {
    /// Rate to base per currency.
    pub rates: BTreeMap<CurrencyCode, Decimal>,
    /// Upstream timestamp in epoch seconds.
    pub timestamp: Timestamp,
}

impl From<FetchedRates> for RateSnapshot {
    fn from(fetched: FetchedRates) -> Self {
        RateSnapshot::new(fetched.rates, fetched.timestamp)
    }
}

/// Classified transport failure.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportFailure {
    /// The request did not complete in time.
    #[error("request timed out")]
    Timeout,

    /// Non-2xx response, with the server-supplied body if any.
    #[error("remote returned {status}")]
    Remote { status: u16, message: Option<String> },
}

impl From<TransportFailure> for FxError {
    fn from(failure: TransportFailure) -> Self {
        match failure {
            TransportFailure::Timeout => FxError::Timeout(TIMEOUT_MESSAGE.to_string()),
            TransportFailure::Remote { status, message } => FxError::RemoteError { status, message },
        }
    }
}

/// Trait for exchange rate sources.
#[async_trait]
pub trait RateTransport: Send + Sync {
    /// Get the transport name.
    fn name(&self) -> &str;

    /// Fetch the full rate table.
    async fn fetch_rates(&self, api_key: &str) -> Result<FetchedRates, TransportFailure>;
}

/// Trait for the connectivity check polled before fetching.
pub trait Connectivity: Send + Sync {
    /// Whether a network is currently reachable.
    fn is_available(&self) -> bool;
}

/// Connectivity flag set by the host application.
#[derive(Debug)]
pub struct StaticConnectivity {
    available: AtomicBool,
}

impl StaticConnectivity {
    /// Create with an initial state.
    pub fn new(available: bool) -> Self {
        Self {
            available: AtomicBool::new(available),
        }
    }

    /// Update the connectivity state.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }
}

impl Connectivity for StaticConnectivity {
    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }
}

/// Mock transport for testing.
#[cfg(any(test, feature = "test-utils"))]
pub struct MockRateTransport {
    name: String,
    responses: parking_lot::Mutex<std::collections::VecDeque<Result<FetchedRates, TransportFailure>>>,
    delay: Option<std::time::Duration>,
    calls: std::sync::atomic::AtomicUsize,
}

#[cfg(any(test, feature = "test-utils"))]
impl MockRateTransport {
    /// Create a new mock transport with no queued responses.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            responses: parking_lot::Mutex::new(std::collections::VecDeque::new()),
            delay: None,
            calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    /// Delay every response.
    pub fn with_delay(mut self, delay: std::time::Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Queue a successful response.
    pub fn push_rates(&self, entries: &[(&str, Decimal)], timestamp: Timestamp) {
        let rates = entries
            .iter()
            .filter_map(|(code, rate)| CurrencyCode::new(code).ok().map(|code| (code, *rate)))
            .collect();
        self.responses.lock().push_back(Ok(FetchedRates { rates, timestamp }));
    }

    /// Queue a failure.
    pub fn push_failure(&self, failure: TransportFailure) {
        self.responses.lock().push_back(Err(failure));
    }

    /// Number of fetches performed.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[cfg(any(test, feature = "test-utils"))]
#[async_trait]
impl RateTransport for MockRateTransport {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_rates(&self, _api_key: &str) -> Result<FetchedRates, TransportFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.responses
            .lock()
            .pop_front()
            .unwrap_or(Err(TransportFailure::Remote {
                status: 503,
                message: Some("no response queued".to_string()),
            }))
    }
}
