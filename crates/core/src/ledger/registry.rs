//! GL account registry.
//!
//! Creates, reads, updates, closes, freezes and deletes ledger accounts, and
//! bulk-generates accounts for an organisation's financial entities.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use remitgl_shared::types::{PageRequest, PageResponse};
use rust_decimal::Decimal;
use tracing::{debug, info};
use uuid::Uuid;

use super::account::{
    GenerateAccountsOptions, GenerateAccountsResult, GlAccount, GlAccountChanges, GlAccountFilter,
    NewGlAccount,
};
use super::error::LedgerError;
use super::policy::LedgerPolicy;
use super::repository::GlAccountRepository;
use crate::stats::{AccountStats, account_stats};

/// Service owning the GL account lifecycle.
pub struct GlAccountRegistry<R> {
    repo: Arc<R>,
    policy: LedgerPolicy,
}

impl<R: GlAccountRepository> GlAccountRegistry<R> {
    /// Create a new registry.
    #[must_use]
    pub fn new(repo: Arc<R>, policy: LedgerPolicy) -> Self {
        Self { repo, policy }
    }

    /// Create an account.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - the name is blank
    /// - min balance exceeds max balance
    /// - the bound entity already has an account and duplicates are not allowed
    pub async fn create_account(&self, input: NewGlAccount) -> Result<GlAccount, LedgerError> {
        let name = input.name.trim();
        if name.is_empty() {
            return Err(LedgerError::EmptyName);
        }
        check_bounds(input.min_balance, input.max_balance)?;

        if let Some(entity) = input.bound_entity
            && !self.policy.allow_duplicate_entity_accounts
            && self
                .repo
                .find_account_by_entity(input.organisation_id, entity)
                .await?
                .is_some()
        {
            return Err(LedgerError::DuplicateEntityAccount(entity));
        }

        let now = Utc::now();
        let account = GlAccount {
            id: Uuid::new_v4(),
            organisation_id: input.organisation_id,
            name: name.to_string(),
            account_type: input.account_type,
            balance: input.initial_balance,
            locked_balance: Decimal::ZERO,
            min_balance: input.min_balance,
            max_balance: input.max_balance,
            currency_code: input.currency_code,
            bound_entity: input.bound_entity,
            opened_at: now,
            opened_by: input.opened_by,
            closed_at: None,
            close_reason: None,
            frozen_at: None,
            frozen_reason: None,
            updated_at: now,
        };

        let account = self.repo.insert_account(&account).await?;
        info!(
            account_id = %account.id,
            org_id = %account.organisation_id,
            account_type = %account.account_type,
            "GL account created"
        );
        Ok(account)
    }

    /// Apply a partial update.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` if the account does not exist, or a validation
    /// error if the patch is invalid.
    pub async fn update_account(
        &self,
        id: Uuid,
        changes: GlAccountChanges,
    ) -> Result<GlAccount, LedgerError> {
        let mut account = self.get_account(id).await?;
        apply_changes(&mut account, changes, Utc::now())?;

        let account = self.repo.update_account(&account).await?;
        info!(account_id = %id, state = %account.state(), "GL account updated");
        Ok(account)
    }

    /// Fetch one account.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` if the account does not exist.
    pub async fn get_account(&self, id: Uuid) -> Result<GlAccount, LedgerError> {
        self.repo
            .find_account(id)
            .await?
            .ok_or(LedgerError::AccountNotFound(id))
    }

    /// List accounts matching a filter.
    pub async fn list_accounts(
        &self,
        filter: &GlAccountFilter,
        page: PageRequest,
    ) -> Result<PageResponse<GlAccount>, LedgerError> {
        let page = page.normalized();
        let (items, total) = self.repo.list_accounts(filter, page).await?;
        Ok(PageResponse::new(items, page, total))
    }

    /// Hard-delete an account that no entry references.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` if absent and `AccountInUse` if entries reference it.
    pub async fn delete_account(&self, id: Uuid) -> Result<(), LedgerError> {
        let account = self.get_account(id).await?;
        if self.repo.account_has_entries(id).await? {
            return Err(LedgerError::AccountInUse(id));
        }
        if !self.repo.delete_account(id).await? {
            return Err(LedgerError::AccountNotFound(id));
        }
        info!(account_id = %id, org_id = %account.organisation_id, "GL account deleted");
        Ok(())
    }

    /// Create an account for every enabled entity kind's entities that lack one.
    ///
    /// Running it again with the same options creates nothing new.
    pub async fn generate_accounts(
        &self,
        organisation_id: Uuid,
        options: GenerateAccountsOptions,
        opened_by: Option<Uuid>,
    ) -> Result<GenerateAccountsResult, LedgerError> {
        let mut created = Vec::new();

        for kind in options.kinds() {
            let entities = self.repo.list_source_entities(organisation_id, kind).await?;
            debug!(
                org_id = %organisation_id,
                kind = kind.as_str(),
                count = entities.len(),
                "Scanning entities"
            );

            for source in entities {
                if self
                    .repo
                    .find_account_by_entity(organisation_id, source.entity)
                    .await?
                    .is_some()
                {
                    continue;
                }

                let now = Utc::now();
                let account = GlAccount {
                    id: Uuid::new_v4(),
                    organisation_id,
                    name: format!("{} - {}", kind.label(), source.name),
                    account_type: kind.generated_account_type(),
                    balance: if kind.carries_balance() {
                        source.balance
                    } else {
                        Decimal::ZERO
                    },
                    locked_balance: Decimal::ZERO,
                    min_balance: None,
                    max_balance: None,
                    currency_code: source.currency_code,
                    bound_entity: Some(source.entity),
                    opened_at: now,
                    opened_by,
                    closed_at: None,
                    close_reason: None,
                    frozen_at: None,
                    frozen_reason: None,
                    updated_at: now,
                };
                created.push(self.repo.insert_account(&account).await?);
            }
        }

        info!(org_id = %organisation_id, generated = created.len(), "GL accounts generated");
        Ok(GenerateAccountsResult {
            generated_count: created.len(),
            accounts: created,
        })
    }

    /// Aggregate balances, optionally for one organisation.
    pub async fn get_stats(
        &self,
        organisation_id: Option<Uuid>,
    ) -> Result<AccountStats, LedgerError> {
        let accounts = self.repo.accounts_for_stats(organisation_id).await?;
        Ok(account_stats(&accounts))
    }
}

fn check_bounds(min: Option<Decimal>, max: Option<Decimal>) -> Result<(), LedgerError> {
    match (min, max) {
        (Some(min), Some(max)) if min > max => Err(LedgerError::InvalidBounds { min, max }),
        _ => Ok(()),
    }
}

/// Blank reasons count as clearing.
fn normalise_reason(reason: Option<String>) -> Option<String> {
    reason
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty())
}

/// Applies a patch to an account in place.
///
/// Setting a close or freeze reason stamps its timestamp with `now`; clearing it
/// clears the timestamp.
///
/// # Errors
///
/// Returns `EmptyName` for a blank name and `InvalidBounds` if the resulting
/// bounds are inverted.
pub fn apply_changes(
    account: &mut GlAccount,
    changes: GlAccountChanges,
    now: DateTime<Utc>,
) -> Result<(), LedgerError> {
    if let Some(name) = changes.name {
        let name = name.trim();
        if name.is_empty() {
            return Err(LedgerError::EmptyName);
        }
        account.name = name.to_string();
    }
    if let Some(account_type) = changes.account_type {
        account.account_type = account_type;
    }
    if let Some(currency_code) = changes.currency_code {
        account.currency_code = currency_code;
    }
    if let Some(locked) = changes.locked_balance {
        account.locked_balance = locked;
    }
    if let Some(min) = changes.min_balance {
        account.min_balance = min;
    }
    if let Some(max) = changes.max_balance {
        account.max_balance = max;
    }
    check_bounds(account.min_balance, account.max_balance)?;

    if let Some(reason) = changes.close_reason {
        account.close_reason = normalise_reason(reason);
        account.closed_at = account.close_reason.as_ref().map(|_| now);
    }
    if let Some(reason) = changes.frozen_reason {
        account.frozen_reason = normalise_reason(reason);
        account.frozen_at = account.frozen_reason.as_ref().map(|_| now);
    }

    account.updated_at = now;
    Ok(())
}
