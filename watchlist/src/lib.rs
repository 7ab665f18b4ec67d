//! Ratewatch Watchlist
//!
//! The user's ordered list of currencies and the event handling around it.
//!
//! # Features
//!
//! - Dense positions with exactly one focused row
//! - Removal with undo that restores position and prior focus
//! - Keystroke gate keeping typed amounts well formed
//! - Ordered background persistence of the selection
//!
//! # Example
//!
//! ```rust,ignore
//! use ratewatch_watchlist::{Key, PersistenceHandle, WatchlistConfig, WatchlistSession};
//!
//! let (persistence, _writer) = PersistenceHandle::spawn(repository.clone());
//! let mut session = WatchlistSession::new(store, persistence, &WatchlistConfig::from_env());
//! session.restore(repository.as_ref()).await?;
//!
//! let rows = session.on_key_press(Key::Digit(5))?;
//! ```

pub mod config;
pub mod entry;
pub mod error;
pub mod filter;
pub mod input;
pub mod ordering;
pub mod persistence;
pub mod session;

pub use config::WatchlistConfig;
pub use entry::{RowView, WatchlistEntry};
pub use error::{WatchlistError, WatchlistResult};
pub use filter::SelectionFilter;
pub use input::{InputGate, InputLimits, Key};
pub use ordering::{RemovalToken, WatchlistOrdering};
pub use persistence::PersistenceHandle;
pub use session::WatchlistSession;
