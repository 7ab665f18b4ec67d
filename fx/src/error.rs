//! FX engine error types.

use thiserror::Error;

/// Message reported when there is neither connectivity nor cached data.
pub const UNAVAILABLE_MESSAGE: &str = "Network is unavailable and no local data found.";

/// Message reported when a fetch exceeds its deadline.
pub const TIMEOUT_MESSAGE: &str = "Network request timed out.";

/// Errors that can occur in the FX engine.
///
/// None of these are fatal: the last good snapshot stays usable.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FxError {
    /// No connectivity and nothing cached.
    #[error("Rates unavailable: {0}")]
    Unavailable(String),

    /// Transport deadline exceeded.
    #[error("Rate fetch timed out: {0}")]
    Timeout(String),

    /// Rate source answered with a non-success status.
    #[error("Rate source returned {status}: {}", message.as_deref().unwrap_or("no message"))]
    RemoteError { status: u16, message: Option<String> },

    /// Persistence collaborator failed.
    #[error("Currency store error: {0}")]
    Store(String),
}

impl FxError {
    /// Check if the caller may retry the same operation.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FxError::Timeout(_))
    }

    /// Get a stable error code for display layers.
    pub fn error_code(&self) -> &'static str {
        match self {
            FxError::Unavailable(_) => "UNAVAILABLE",
            FxError::Timeout(_) => "TIMEOUT",
            FxError::RemoteError { .. } => "REMOTE_ERROR",
            FxError::Store(_) => "STORE_ERROR",
        }
    }
}

/// Result type for FX operations.
pub type FxResult<T> = Result<T, FxError>;
