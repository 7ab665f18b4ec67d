//! Rate transport reading a JSON rate table from disk.

use std::collections::BTreeMap;
use std::path::PathBuf;

use async_trait::async_trait;
use ratewatch_common::{CurrencyCode, Timestamp};
use ratewatch_fx::{FetchedRates, RateTransport, TransportFailure};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// On-disk rate table, shaped like the upstream latest-rates response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatesFile {
    /// Upstream timestamp in epoch seconds.
    pub timestamp: Timestamp,
    /// Rate to base per currency code.
    pub rates: BTreeMap<String, Decimal>,
}

impl RatesFile {
    /// Convert into fetched rates, dropping malformed codes.
    pub fn into_fetched(self) -> FetchedRates {
        let rates = self
            .rates
            .into_iter()
            .filter_map(|(code, rate)| match CurrencyCode::new(&code) {
                Ok(code) => Some((code, rate)),
                Err(e) => {
                    warn!(code = %code, error = %e, "Skipping malformed currency code");
                    None
                }
            })
            .collect();
        FetchedRates {
            rates,
            timestamp: self.timestamp,
        }
    }
}

/// Serves the rate table stored at a path.
///
/// A missing file is reported as a 404 and a malformed one as a 502, so
/// both surface as remote errors.
pub struct FileRateTransport {
    path: PathBuf,
}

impl FileRateTransport {
    /// Create a transport for a rate file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl RateTransport for FileRateTransport {
    fn name(&self) -> &str {
        "file"
    }

    async fn fetch_rates(&self, _api_key: &str) -> Result<FetchedRates, TransportFailure> {
        debug!(path = %self.path.display(), "Reading rate table");
        let bytes = tokio::fs::read(&self.path).await.map_err(|e| TransportFailure::Remote {
            status: 404,
            message: Some(e.to_string()),
        })?;
        let file: RatesFile = serde_json::from_slice(&bytes).map_err(|e| TransportFailure::Remote {
            status: 502,
            message: Some(e.to_string()),
        })?;
        Ok(file.into_fetched())
    }
}
