//! Core ledger and settlement logic for RemitGL.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! Persistence is reached through repository traits implemented by the db crate.
//!
//! # Modules
//!
//! - `ledger` - GL accounts, double-entry posting and reversal
//! - `settlement` - Charges payment batching, approval and reversal
//! - `stats` - Read-only rollups for the dashboard
//! - `memory` - In-memory store for tests (`testing` feature)

pub mod error;
pub mod ledger;
pub mod settlement;
pub mod stats;

#[cfg(any(test, feature = "testing"))]
pub mod memory;

pub use error::ErrorKind;
