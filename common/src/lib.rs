//! Ratewatch Common Types
//!
//! This crate contains shared types used across Ratewatch, including
//! currency codes, catalog entries, rate snapshots and the display amount
//! conventions every other crate relies on.

pub mod amount;
pub mod error;
pub mod metadata;
pub mod monetary;
pub mod time;

pub use amount::*;
pub use error::*;
pub use monetary::*;
pub use time::*;
