//! Double-entry ledger core.
//!
//! This module implements:
//! - GL accounts bound to financial entities, with lifecycle and bounds
//! - Debit/credit sign convention per account type
//! - Entry validation (non-empty, positive, balanced within 0.01)
//! - The account registry and the transaction poster
//! - Repository traits implemented by the db crate

pub mod account;
pub mod balance;
pub mod entry;
pub mod error;
pub mod policy;
pub mod poster;
pub mod registry;
pub mod repository;
pub mod transaction;
pub mod validation;

#[cfg(test)]
mod poster_props;
#[cfg(test)]
mod validation_props;

pub use account::{
    AccountState, BoundEntity, BoundEntityKind, GenerateAccountsOptions, GenerateAccountsResult,
    GlAccount, GlAccountChanges, GlAccountFilter, GlAccountType, NewGlAccount, SourceEntity,
};
pub use balance::{balance_delta, normal_balance_side};
pub use entry::{DrCr, EntryInput, GlEntry};
pub use error::LedgerError;
pub use policy::LedgerPolicy;
pub use poster::GlPoster;
pub use registry::{GlAccountRegistry, apply_changes};
pub use repository::{GlAccountRepository, GlTransactionRepository};
pub use transaction::{
    AccountDelta, GlTransaction, GlTransactionFilter, GlTransactionStatus, GlTransactionType,
    PostTransactionInput, PostedTransaction, PostingContext, PreparedPosting, ReversalResult,
    ReversalWrite,
};
pub use validation::{BALANCE_TOLERANCE, EntryTotals, is_balanced, validate_entries};
