//! `SeaORM` entity definitions.

pub mod bank_accounts;
pub mod charges;
pub mod charges_payment_items;
pub mod charges_payments;
pub mod gl_accounts;
pub mod gl_entries;
pub mod gl_transactions;
pub mod org_balances;
pub mod organisations;
pub mod reference_sequences;
pub mod sea_orm_active_enums;
pub mod tills;
pub mod transaction_charges;
pub mod transactions;
pub mod vaults;
