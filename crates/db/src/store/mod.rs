//! PostgreSQL implementation of the core repository traits.
//!
//! Every multi-row write runs inside one database transaction. Balance changes
//! are applied as in-database increments and status flips are guarded by their
//! expected prior status, so concurrent writers cannot lose updates.

mod accounts;
mod convert;
mod settlement;
mod transactions;

use sea_orm::DatabaseConnection;

/// Ledger and settlement store backed by `SeaORM`.
#[derive(Debug, Clone)]
pub struct LedgerStore {
    db: DatabaseConnection,
}

impl LedgerStore {
    /// Creates a new store.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Returns the underlying connection.
    #[must_use]
    pub const fn connection(&self) -> &DatabaseConnection {
        &self.db
    }
}
