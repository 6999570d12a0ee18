//! GL account domain types.
//!
//! A GL account is a named ledger account with a running balance. It may be
//! bound to exactly one underlying financial entity of its organisation.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::entry::DrCr;
use super::error::LedgerError;

/// Account type classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GlAccountType {
    /// Resources held (cash, bank, till and vault balances).
    Asset,
    /// Amounts owed to others.
    Liability,
    /// Owner's residual interest.
    Equity,
    /// Income earned (charges, fees).
    Revenue,
    /// Costs incurred.
    Expense,
}

impl GlAccountType {
    /// All account types.
    pub const ALL: [Self; 5] = [
        Self::Asset,
        Self::Liability,
        Self::Equity,
        Self::Revenue,
        Self::Expense,
    ];

    /// Returns the stored representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asset => "ASSET",
            Self::Liability => "LIABILITY",
            Self::Equity => "EQUITY",
            Self::Revenue => "REVENUE",
            Self::Expense => "EXPENSE",
        }
    }

    /// Returns the side on which this account type increases.
    #[must_use]
    pub const fn normal_balance_side(self) -> DrCr {
        super::balance::normal_balance_side(self)
    }
}

impl fmt::Display for GlAccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GlAccountType {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| LedgerError::InvalidAccountType(s.to_string()))
    }
}

/// Kind of financial entity a GL account can be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BoundEntityKind {
    /// A bank account.
    BankAccount,
    /// A cashier till.
    Till,
    /// A cash vault.
    Vault,
    /// A charge definition.
    Charge,
    /// An inter-organisation balance.
    OrgBalance,
}

impl BoundEntityKind {
    /// Returns the stored representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BankAccount => "BANK_ACCOUNT",
            Self::Till => "TILL",
            Self::Vault => "VAULT",
            Self::Charge => "CHARGE",
            Self::OrgBalance => "ORG_BALANCE",
        }
    }

    /// Human label used when naming generated accounts.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::BankAccount => "Bank Account",
            Self::Till => "Till",
            Self::Vault => "Vault",
            Self::Charge => "Charge",
            Self::OrgBalance => "Org Balance",
        }
    }

    /// Account type given to generated accounts of this kind.
    #[must_use]
    pub const fn generated_account_type(self) -> GlAccountType {
        match self {
            Self::Charge => GlAccountType::Revenue,
            Self::BankAccount | Self::Till | Self::Vault | Self::OrgBalance => GlAccountType::Asset,
        }
    }

    /// Whether generated accounts carry the entity's current balance.
    #[must_use]
    pub const fn carries_balance(self) -> bool {
        !matches!(self, Self::Charge)
    }
}

impl FromStr for BoundEntityKind {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [
            Self::BankAccount,
            Self::Till,
            Self::Vault,
            Self::Charge,
            Self::OrgBalance,
        ]
        .into_iter()
        .find(|k| k.as_str().eq_ignore_ascii_case(s.trim()))
        .ok_or_else(|| LedgerError::InvalidEntityKind(s.to_string()))
    }
}

/// The financial entity a GL account is linked to.
///
/// An account without a link holds `None` in its `bound_entity` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BoundEntity {
    /// Bank account ID.
    BankAccount(Uuid),
    /// Till ID.
    Till(Uuid),
    /// Vault ID.
    Vault(Uuid),
    /// Charge definition ID.
    Charge(Uuid),
    /// Inter-organisation balance ID.
    OrgBalance(Uuid),
}

impl BoundEntity {
    /// Builds a bound entity from its kind and ID.
    #[must_use]
    pub const fn new(kind: BoundEntityKind, id: Uuid) -> Self {
        match kind {
            BoundEntityKind::BankAccount => Self::BankAccount(id),
            BoundEntityKind::Till => Self::Till(id),
            BoundEntityKind::Vault => Self::Vault(id),
            BoundEntityKind::Charge => Self::Charge(id),
            BoundEntityKind::OrgBalance => Self::OrgBalance(id),
        }
    }

    /// Returns the entity kind.
    #[must_use]
    pub const fn kind(&self) -> BoundEntityKind {
        match self {
            Self::BankAccount(_) => BoundEntityKind::BankAccount,
            Self::Till(_) => BoundEntityKind::Till,
            Self::Vault(_) => BoundEntityKind::Vault,
            Self::Charge(_) => BoundEntityKind::Charge,
            Self::OrgBalance(_) => BoundEntityKind::OrgBalance,
        }
    }

    /// Returns the entity ID.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        match self {
            Self::BankAccount(id)
            | Self::Till(id)
            | Self::Vault(id)
            | Self::Charge(id)
            | Self::OrgBalance(id) => *id,
        }
    }
}

impl fmt::Display for BoundEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind().label(), self.id())
    }
}

/// Lifecycle state derived from the close/freeze stamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AccountState {
    /// Accepts postings.
    Open,
    /// Closed; no new postings.
    Closed,
    /// Frozen; no new postings until unfrozen.
    Frozen,
}

impl AccountState {
    /// Returns the stored representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::Closed => "CLOSED",
            Self::Frozen => "FROZEN",
        }
    }
}

impl FromStr for AccountState {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [Self::Open, Self::Closed, Self::Frozen]
            .into_iter()
            .find(|st| st.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| LedgerError::InvalidStatus(s.to_string()))
    }
}

impl fmt::Display for AccountState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str().to_lowercase())
    }
}

/// A ledger account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlAccount {
    /// Account ID.
    pub id: Uuid,
    /// Owning organisation.
    pub organisation_id: Uuid,
    /// Human-readable name.
    pub name: String,
    /// Account type.
    #[serde(rename = "type")]
    pub account_type: GlAccountType,
    /// Running balance.
    pub balance: Decimal,
    /// Reserved, non-spendable part of the balance.
    pub locked_balance: Decimal,
    /// Optional lower bound.
    pub min_balance: Option<Decimal>,
    /// Optional upper bound.
    pub max_balance: Option<Decimal>,
    /// Currency code, when the account is single-currency.
    pub currency_code: Option<String>,
    /// Linked financial entity.
    pub bound_entity: Option<BoundEntity>,
    /// When the account was opened.
    pub opened_at: DateTime<Utc>,
    /// Who opened it.
    pub opened_by: Option<Uuid>,
    /// When it was closed.
    pub closed_at: Option<DateTime<Utc>>,
    /// Why it was closed.
    pub close_reason: Option<String>,
    /// When it was frozen.
    pub frozen_at: Option<DateTime<Utc>>,
    /// Why it was frozen.
    pub frozen_reason: Option<String>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

impl GlAccount {
    /// Returns the lifecycle state. Closed wins over frozen.
    #[must_use]
    pub const fn state(&self) -> AccountState {
        if self.closed_at.is_some() {
            AccountState::Closed
        } else if self.frozen_at.is_some() {
            AccountState::Frozen
        } else {
            AccountState::Open
        }
    }

    /// Balance minus locked balance.
    #[must_use]
    pub fn available_balance(&self) -> Decimal {
        self.balance - self.locked_balance
    }

    /// Returns true if `balance` lies within the account's bounds.
    #[must_use]
    pub fn within_bounds(&self, balance: Decimal) -> bool {
        self.min_balance.is_none_or(|min| balance >= min)
            && self.max_balance.is_none_or(|max| balance <= max)
    }
}

/// Input for creating a GL account.
#[derive(Debug, Clone)]
pub struct NewGlAccount {
    /// Owning organisation.
    pub organisation_id: Uuid,
    /// Account name (must not be blank).
    pub name: String,
    /// Account type.
    pub account_type: GlAccountType,
    /// Currency code.
    pub currency_code: Option<String>,
    /// Linked financial entity.
    pub bound_entity: Option<BoundEntity>,
    /// Opening balance.
    pub initial_balance: Decimal,
    /// Optional lower bound.
    pub min_balance: Option<Decimal>,
    /// Optional upper bound.
    pub max_balance: Option<Decimal>,
    /// The user opening the account.
    pub opened_by: Option<Uuid>,
}

/// Partial update for a GL account.
///
/// Outer `None` leaves a field untouched; `Some(None)` clears it.
#[derive(Debug, Clone, Default)]
pub struct GlAccountChanges {
    /// New name.
    pub name: Option<String>,
    /// New account type.
    pub account_type: Option<GlAccountType>,
    /// New currency code.
    pub currency_code: Option<Option<String>>,
    /// New locked balance.
    pub locked_balance: Option<Decimal>,
    /// New lower bound.
    pub min_balance: Option<Option<Decimal>>,
    /// New upper bound.
    pub max_balance: Option<Option<Decimal>>,
    /// Close (with reason) or reopen (clear).
    pub close_reason: Option<Option<String>>,
    /// Freeze (with reason) or unfreeze (clear).
    pub frozen_reason: Option<Option<String>>,
}

/// Filter for listing GL accounts.
#[derive(Debug, Clone, Default)]
pub struct GlAccountFilter {
    /// Restrict to one organisation.
    pub organisation_id: Option<Uuid>,
    /// Restrict to one account type.
    pub account_type: Option<GlAccountType>,
    /// Restrict to one currency.
    pub currency_code: Option<String>,
    /// Restrict to one lifecycle state.
    pub state: Option<AccountState>,
    /// Restrict to accounts bound to this entity kind.
    pub entity_kind: Option<BoundEntityKind>,
    /// Case-insensitive substring match on the name.
    pub search: Option<String>,
}

impl GlAccountFilter {
    /// Returns true if the account satisfies every set predicate.
    #[must_use]
    pub fn matches(&self, account: &GlAccount) -> bool {
        self.organisation_id.is_none_or(|org| account.organisation_id == org)
            && self.account_type.is_none_or(|t| account.account_type == t)
            && self.currency_code.as_deref().is_none_or(|c| {
                account
                    .currency_code
                    .as_deref()
                    .is_some_and(|own| own.eq_ignore_ascii_case(c))
            })
            && self.state.is_none_or(|s| account.state() == s)
            && self
                .entity_kind
                .is_none_or(|k| account.bound_entity.is_some_and(|e| e.kind() == k))
            && self.search.as_deref().is_none_or(|q| {
                account.name.to_lowercase().contains(&q.trim().to_lowercase())
            })
    }
}

/// Which entity kinds `generate_accounts` should scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateAccountsOptions {
    /// Scan bank accounts.
    #[serde(default)]
    pub for_bank_accounts: bool,
    /// Scan tills.
    #[serde(default)]
    pub for_tills: bool,
    /// Scan vaults.
    #[serde(default)]
    pub for_vaults: bool,
    /// Scan charge definitions.
    #[serde(default)]
    pub for_charges: bool,
    /// Scan inter-organisation balances.
    #[serde(default)]
    pub for_org_balances: bool,
}

impl GenerateAccountsOptions {
    /// Returns the enabled kinds in a fixed order.
    #[must_use]
    pub fn kinds(&self) -> Vec<BoundEntityKind> {
        [
            (self.for_bank_accounts, BoundEntityKind::BankAccount),
            (self.for_tills, BoundEntityKind::Till),
            (self.for_vaults, BoundEntityKind::Vault),
            (self.for_charges, BoundEntityKind::Charge),
            (self.for_org_balances, BoundEntityKind::OrgBalance),
        ]
        .into_iter()
        .filter_map(|(enabled, kind)| enabled.then_some(kind))
        .collect()
    }
}

/// A financial entity that may need a GL account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceEntity {
    /// The entity.
    pub entity: BoundEntity,
    /// Display name.
    pub name: String,
    /// Current balance (zero for charge definitions).
    pub balance: Decimal,
    /// Currency code.
    pub currency_code: Option<String>,
}

/// Result of a bulk generate run.
#[derive(Debug, Clone, Serialize)]
pub struct GenerateAccountsResult {
    /// Number of accounts created.
    pub generated_count: usize,
    /// The created accounts.
    pub accounts: Vec<GlAccount>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn account() -> GlAccount {
        let now = Utc::now();
        GlAccount {
            id: Uuid::new_v4(),
            organisation_id: Uuid::new_v4(),
            name: "Vault - Main".to_string(),
            account_type: GlAccountType::Asset,
            balance: dec!(100),
            locked_balance: dec!(25),
            min_balance: Some(dec!(0)),
            max_balance: Some(dec!(1000)),
            currency_code: Some("USD".to_string()),
            bound_entity: Some(BoundEntity::Vault(Uuid::new_v4())),
            opened_at: now,
            opened_by: None,
            closed_at: None,
            close_reason: None,
            frozen_at: None,
            frozen_reason: None,
            updated_at: now,
        }
    }

    #[rstest]
    #[case("ASSET", GlAccountType::Asset)]
    #[case("liability", GlAccountType::Liability)]
    #[case(" Revenue ", GlAccountType::Revenue)]
    fn test_parse_account_type(#[case] raw: &str, #[case] expected: GlAccountType) {
        assert_eq!(raw.parse::<GlAccountType>().unwrap(), expected);
    }

    #[test]
    fn test_parse_unknown_account_type() {
        assert!(matches!(
            "CASH".parse::<GlAccountType>(),
            Err(LedgerError::InvalidAccountType(_))
        ));
    }

    #[test]
    fn test_state_precedence() {
        let mut acc = account();
        assert_eq!(acc.state(), AccountState::Open);
        acc.frozen_at = Some(Utc::now());
        assert_eq!(acc.state(), AccountState::Frozen);
        acc.closed_at = Some(Utc::now());
        assert_eq!(acc.state(), AccountState::Closed);
    }

    #[test]
    fn test_bounds_and_available_balance() {
        let acc = account();
        assert_eq!(acc.available_balance(), dec!(75));
        assert!(acc.within_bounds(dec!(0)));
        assert!(acc.within_bounds(dec!(1000)));
        assert!(!acc.within_bounds(dec!(-0.01)));
        assert!(!acc.within_bounds(dec!(1000.01)));
    }

    #[test]
    fn test_bound_entity_serializes_as_tagged() {
        let id = Uuid::nil();
        let json = serde_json::to_value(BoundEntity::OrgBalance(id)).unwrap();
        assert_eq!(json["kind"], "ORG_BALANCE");
        assert_eq!(json["id"], id.to_string());
        assert_eq!(BoundEntity::new(BoundEntityKind::Till, id), BoundEntity::Till(id));
    }

    #[test]
    fn test_filter_matches() {
        let acc = account();
        let mut filter = GlAccountFilter {
            organisation_id: Some(acc.organisation_id),
            currency_code: Some("usd".to_string()),
            entity_kind: Some(BoundEntityKind::Vault),
            search: Some("main".to_string()),
            ..GlAccountFilter::default()
        };
        assert!(filter.matches(&acc));

        filter.state = Some(AccountState::Closed);
        assert!(!filter.matches(&acc));
    }

    #[test]
    fn test_generate_options_kinds() {
        let opts = GenerateAccountsOptions {
            for_tills: true,
            for_charges: true,
            ..GenerateAccountsOptions::default()
        };
        assert_eq!(opts.kinds(), vec![BoundEntityKind::Till, BoundEntityKind::Charge]);
        assert_eq!(
            BoundEntityKind::Charge.generated_account_type(),
            GlAccountType::Revenue
        );
        assert_eq!(BoundEntityKind::Till.generated_account_type(), GlAccountType::Asset);
    }
}
