//! Ledger policy switches.

use remitgl_shared::config::LedgerSettings;

/// Runtime switches for the registry and the poster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerPolicy {
    /// Let `create_account` bind a second account to an entity that already has one.
    pub allow_duplicate_entity_accounts: bool,
    /// Reject non-reversal postings that push an account outside its bounds.
    pub enforce_balance_bounds: bool,
}

impl Default for LedgerPolicy {
    fn default() -> Self {
        Self {
            allow_duplicate_entity_accounts: false,
            enforce_balance_bounds: true,
        }
    }
}

impl From<&LedgerSettings> for LedgerPolicy {
    fn from(settings: &LedgerSettings) -> Self {
        Self {
            allow_duplicate_entity_accounts: settings.allow_duplicate_entity_accounts,
            enforce_balance_bounds: settings.enforce_balance_bounds,
        }
    }
}
