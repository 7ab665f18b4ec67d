//! Error types for shared Ratewatch types.

use thiserror::Error;

/// Errors raised while constructing shared values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommonError {
    /// Currency code is not three ASCII letters.
    #[error("Invalid currency code: {0:?}")]
    InvalidCurrencyCode(String),

    /// Exchange rates must be strictly positive.
    #[error("Rate for {code} must be positive, got {rate}")]
    NonPositiveRate { code: String, rate: String },
}

/// Result type alias for shared type construction.
pub type CommonResult<T> = std::result::Result<T, CommonError>;
