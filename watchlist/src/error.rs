//! Watchlist error types.

use ratewatch_common::CurrencyCode;
use ratewatch_fx::FxError;
use thiserror::Error;

/// Errors that can occur while operating on the watchlist.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WatchlistError {
    /// Position argument outside `[0, len)` (or `[0, len]` for reinsertion).
    #[error("Position {position} out of range for watchlist of {len}")]
    OutOfRange { position: usize, len: usize },

    /// Keystroke rejected by the validation gate.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Currency is not in the catalog.
    #[error("Unknown currency: {0}")]
    UnknownCurrency(String),

    /// Currency is already in the watchlist.
    #[error("Currency already selected: {0}")]
    AlreadySelected(CurrencyCode),

    /// Undo requested with no removal pending.
    #[error("Nothing to undo")]
    NothingToUndo,

    /// Persistence collaborator failed.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Rate engine error.
    #[error(transparent)]
    Fx(#[from] FxError),
}

impl WatchlistError {
    /// Errors that can only come from a misbehaving caller.
    pub fn is_caller_bug(&self) -> bool {
        matches!(
            self,
            WatchlistError::OutOfRange { .. } | WatchlistError::InvalidInput(_) | WatchlistError::NothingToUndo
        )
    }

    /// Get a stable error code for display layers.
    pub fn error_code(&self) -> &'static str {
        match self {
            WatchlistError::OutOfRange { .. } => "OUT_OF_RANGE",
            WatchlistError::InvalidInput(_) => "INVALID_INPUT",
            WatchlistError::UnknownCurrency(_) => "UNKNOWN_CURRENCY",
            WatchlistError::AlreadySelected(_) => "ALREADY_SELECTED",
            WatchlistError::NothingToUndo => "NOTHING_TO_UNDO",
            WatchlistError::Persistence(_) => "PERSISTENCE_ERROR",
            WatchlistError::Fx(e) => e.error_code(),
        }
    }
}

/// Result type for watchlist operations.
pub type WatchlistResult<T> = Result<T, WatchlistError>;
