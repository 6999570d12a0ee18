//! Ledger entries (debits and credits).

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Debit/credit marker of one entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DrCr {
    /// Debit entry.
    Debit,
    /// Credit entry.
    Credit,
}

impl DrCr {
    /// Returns the other side.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Debit => Self::Credit,
            Self::Credit => Self::Debit,
        }
    }

    /// Returns the stored representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Debit => "DEBIT",
            Self::Credit => "CREDIT",
        }
    }
}

impl fmt::Display for DrCr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One requested leg of a posting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryInput {
    /// The account to post to.
    pub account_id: Uuid,
    /// The amount (must be positive).
    pub amount: Decimal,
    /// Debit or credit.
    pub dr_cr: DrCr,
    /// Free-text description.
    pub description: Option<String>,
}

/// A persisted leg of a GL transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlEntry {
    /// Entry ID.
    pub id: Uuid,
    /// Owning GL transaction.
    pub gl_transaction_id: Uuid,
    /// The account posted to.
    pub gl_account_id: Uuid,
    /// The amount.
    pub amount: Decimal,
    /// Debit or credit.
    pub dr_cr: DrCr,
    /// Free-text description.
    pub description: Option<String>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl GlEntry {
    /// Returns the same leg with its direction inverted, as a new input.
    #[must_use]
    pub fn flipped(&self) -> EntryInput {
        EntryInput {
            account_id: self.gl_account_id,
            amount: self.amount,
            dr_cr: self.dr_cr.opposite(),
            description: Some(format!(
                "Reversal: {}",
                self.description.clone().unwrap_or_default()
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opposite() {
        assert_eq!(DrCr::Debit.opposite(), DrCr::Credit);
        assert_eq!(DrCr::Credit.opposite(), DrCr::Debit);
    }

    #[test]
    fn test_flipped_entry_keeps_account_and_amount() {
        let entry = GlEntry {
            id: Uuid::new_v4(),
            gl_transaction_id: Uuid::new_v4(),
            gl_account_id: Uuid::new_v4(),
            amount: Decimal::new(1250, 2),
            dr_cr: DrCr::Debit,
            description: Some("Till float".to_string()),
            created_at: Utc::now(),
        };
        let flipped = entry.flipped();
        assert_eq!(flipped.account_id, entry.gl_account_id);
        assert_eq!(flipped.amount, entry.amount);
        assert_eq!(flipped.dr_cr, DrCr::Credit);
        assert_eq!(flipped.description.as_deref(), Some("Reversal: Till float"));
    }
}
