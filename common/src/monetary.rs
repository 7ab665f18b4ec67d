//! Currency and exchange rate types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{CommonError, CommonResult};
use crate::metadata;
use crate::time::Timestamp;

/// ISO 4217 currency code, normalized to upper case.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyCode(String);

impl CurrencyCode {
    /// Create a currency code, normalizing case.
    pub fn new(code: impl AsRef<str>) -> CommonResult<Self> {
        let code = code.as_ref().trim();
        if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(CommonError::InvalidCurrencyCode(code.to_string()));
        }
        Ok(Self(code.to_ascii_uppercase()))
    }

    /// Get the code as a string slice.
    pub fn code(&self) -> &str {
        &self.0
    }

    /// First character of the code, used as a fast-scroll section title.
    pub fn section_title(&self) -> char {
        // Construction guarantees three ASCII letters.
        self.0.chars().next().unwrap_or('?')
    }

    /// Common currencies
    pub fn usd() -> Self {
        Self("USD".to_string())
    }

    pub fn eur() -> Self {
        Self("EUR".to_string())
    }

    pub fn gbp() -> Self {
        Self("GBP".to_string())
    }

    pub fn jpy() -> Self {
        Self("JPY".to_string())
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CurrencyCode {
    type Err = CommonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for CurrencyCode {
    type Error = CommonError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CurrencyCode> for String {
    fn from(code: CurrencyCode) -> Self {
        code.0
    }
}

/// A catalog entry: one currency with its display metadata and its rate
/// against the implicit base currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyRate {
    /// Unique currency code.
    pub code: CurrencyCode,
    /// Display name.
    pub name: String,
    /// Currency symbol or flag resource reference.
    pub symbol_or_flag_ref: String,
    /// Value of one base-currency unit expressed in this currency.
    pub rate_to_base: Decimal,
}

impl CurrencyRate {
    /// Create a catalog entry, rejecting non-positive rates.
    pub fn new(
        code: CurrencyCode,
        name: impl Into<String>,
        symbol_or_flag_ref: impl Into<String>,
        rate_to_base: Decimal,
    ) -> CommonResult<Self> {
        if rate_to_base <= Decimal::ZERO {
            return Err(CommonError::NonPositiveRate {
                code: code.to_string(),
                rate: rate_to_base.to_string(),
            });
        }
        Ok(Self {
            code,
            name: name.into(),
            symbol_or_flag_ref: symbol_or_flag_ref.into(),
            rate_to_base,
        })
    }

    /// Create a catalog entry using the built-in metadata table.
    pub fn with_builtin_metadata(code: CurrencyCode, rate_to_base: Decimal) -> CommonResult<Self> {
        let name = metadata::display_name(&code);
        let flag = metadata::flag_ref(&code);
        Self::new(code, name, flag, rate_to_base)
    }

    /// Check whether the query matches code or name, case-insensitively.
    pub fn matches(&self, query_lower: &str) -> bool {
        self.code.code().to_lowercase().contains(query_lower)
            || self.name.to_lowercase().contains(query_lower)
    }
}

/// A complete set of rates as reported by one fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateSnapshot {
    /// Rate to base per currency code.
    pub rates: BTreeMap<CurrencyCode, Decimal>,
    /// Upstream timestamp of the fetch, in epoch seconds.
    pub fetched_at: Timestamp,
}

impl RateSnapshot {
    /// Create a snapshot from a rate table and its upstream timestamp.
    pub fn new(rates: BTreeMap<CurrencyCode, Decimal>, fetched_at: Timestamp) -> Self {
        Self { rates, fetched_at }
    }

    /// A snapshot holding no rates.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Check if the snapshot holds no rates.
    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }

    /// Number of currencies in the snapshot.
    pub fn len(&self) -> usize {
        self.rates.len()
    }

    /// Get the rate for a currency.
    pub fn rate(&self, code: &CurrencyCode) -> Option<Decimal> {
        self.rates.get(code).copied()
    }

    /// Check if the snapshot knows a currency.
    pub fn contains(&self, code: &CurrencyCode) -> bool {
        self.rates.contains_key(code)
    }

    /// Seconds elapsed between the fetch and `now`.
    pub fn age_seconds(&self, now: Timestamp) -> i64 {
        now - self.fetched_at
    }
}
