//! GL account routes.

use axum::{
    Router,
    extract::State,
    routing::{get, post},
};
use remitgl_core::ledger::{
    AccountState, BoundEntity, BoundEntityKind, GenerateAccountsOptions, GlAccount,
    GlAccountChanges, GlAccountFilter, GlAccountType, NewGlAccount,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::{double_option, page_request, parse_opt};
use crate::extract::{Json, Path, Query};
use crate::middleware::AuthUser;
use crate::response::{ApiResponse, ApiResult};
use crate::{AppState, LedgerBackend};

/// Creates the GL account routes (requires auth middleware to be applied externally).
pub fn routes<R: LedgerBackend>() -> Router<AppState<R>> {
    Router::new()
        .route("/gl-accounts", get(list_accounts::<R>).post(create_account::<R>))
        .route("/gl-accounts/stats", get(account_stats::<R>))
        .route("/gl-accounts/generate", post(generate_accounts::<R>))
        .route(
            "/gl-accounts/{id}",
            get(get_account::<R>)
                .put(update_account::<R>)
                .delete(delete_account::<R>),
        )
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Query parameters for listing accounts.
#[derive(Debug, Default, Deserialize)]
pub struct ListAccountsQuery {
    /// Filter by account type.
    #[serde(rename = "type")]
    pub account_type: Option<String>,
    /// Filter by currency.
    pub currency_code: Option<String>,
    /// Filter by lifecycle state: open, closed or frozen.
    pub state: Option<String>,
    /// Filter by bound entity kind.
    pub entity_kind: Option<String>,
    /// Substring of the name.
    pub search: Option<String>,
    /// Page number (1-indexed).
    pub page: Option<u32>,
    /// Page size.
    pub limit: Option<u32>,
}

/// Request body for creating an account.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateAccountRequest {
    /// Owning organisation; defaults to the caller's.
    pub organisation_id: Option<Uuid>,
    /// Display name.
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    /// Account type.
    #[serde(rename = "type")]
    pub account_type: GlAccountType,
    /// ISO currency code.
    #[validate(length(equal = 3))]
    pub currency_code: Option<String>,
    /// Linked financial entity, e.g. `{"kind": "VAULT", "id": "..."}`.
    pub bound_entity: Option<BoundEntity>,
    /// Opening balance.
    #[serde(default)]
    pub initial_balance: Decimal,
    /// Lowest allowed balance.
    pub min_balance: Option<Decimal>,
    /// Highest allowed balance.
    pub max_balance: Option<Decimal>,
}

/// Request body for updating an account. Explicit `null` clears a field.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateAccountRequest {
    /// New name.
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    /// New type.
    #[serde(rename = "type")]
    pub account_type: Option<GlAccountType>,
    /// New currency.
    #[serde(default, deserialize_with = "double_option")]
    pub currency_code: Option<Option<String>>,
    /// New locked balance.
    pub locked_balance: Option<Decimal>,
    /// New lower bound.
    #[serde(default, deserialize_with = "double_option")]
    pub min_balance: Option<Option<Decimal>>,
    /// New upper bound.
    #[serde(default, deserialize_with = "double_option")]
    pub max_balance: Option<Option<Decimal>>,
    /// Close (set) or reopen (null).
    #[serde(default, deserialize_with = "double_option")]
    pub close_reason: Option<Option<String>>,
    /// Freeze (set) or unfreeze (null).
    #[serde(default, deserialize_with = "double_option")]
    pub frozen_reason: Option<Option<String>>,
}

/// Request body for bulk generation.
#[derive(Debug, Deserialize)]
pub struct GenerateAccountsRequest {
    /// Target organisation; defaults to the caller's.
    pub organisation_id: Option<Uuid>,
    /// Which entity kinds to scan.
    #[serde(flatten)]
    pub options: GenerateAccountsOptions,
}

/// Account with its derived lifecycle state.
#[derive(Debug, Serialize)]
pub struct AccountResponse {
    /// The stored account.
    #[serde(flatten)]
    pub account: GlAccount,
    /// Open, closed or frozen.
    pub state: AccountState,
    /// Balance minus locked balance.
    pub available_balance: Decimal,
}

impl From<GlAccount> for AccountResponse {
    fn from(account: GlAccount) -> Self {
        Self {
            state: account.state(),
            available_balance: account.available_balance(),
            account,
        }
    }
}

impl From<UpdateAccountRequest> for GlAccountChanges {
    fn from(req: UpdateAccountRequest) -> Self {
        Self {
            name: req.name,
            account_type: req.account_type,
            currency_code: req.currency_code,
            locked_balance: req.locked_balance,
            min_balance: req.min_balance,
            max_balance: req.max_balance,
            close_reason: req.close_reason,
            frozen_reason: req.frozen_reason,
        }
    }
}

// ============================================================================
// Route Handlers
// ============================================================================

/// GET `/gl-accounts` - List the caller's accounts.
async fn list_accounts<R: LedgerBackend>(
    State(state): State<AppState<R>>,
    auth: AuthUser,
    Query(query): Query<ListAccountsQuery>,
) -> ApiResult {
    let filter = GlAccountFilter {
        organisation_id: Some(auth.organisation_id()),
        account_type: parse_opt::<GlAccountType, _>(query.account_type.as_deref())?,
        currency_code: query.currency_code,
        state: parse_opt::<AccountState, _>(query.state.as_deref())?,
        entity_kind: parse_opt::<BoundEntityKind, _>(query.entity_kind.as_deref())?,
        search: query.search,
    };

    let page = state
        .registry
        .list_accounts(&filter, page_request(query.page, query.limit))
        .await?;
    Ok(ApiResponse::ok(
        "GL accounts retrieved",
        page.map(AccountResponse::from),
    ))
}

/// POST `/gl-accounts` - Create an account.
async fn create_account<R: LedgerBackend>(
    State(state): State<AppState<R>>,
    auth: AuthUser,
    Json(payload): Json<CreateAccountRequest>,
) -> ApiResult {
    payload.validate()?;
    let organisation_id = payload.organisation_id.unwrap_or(auth.organisation_id());
    auth.require_organisation(organisation_id)?;

    let account = state
        .registry
        .create_account(NewGlAccount {
            organisation_id,
            name: payload.name,
            account_type: payload.account_type,
            currency_code: payload.currency_code,
            bound_entity: payload.bound_entity,
            initial_balance: payload.initial_balance,
            min_balance: payload.min_balance,
            max_balance: payload.max_balance,
            opened_by: Some(auth.user_id()),
        })
        .await?;
    Ok(ApiResponse::created(
        "GL account created",
        AccountResponse::from(account),
    ))
}

/// GET `/gl-accounts/{id}` - Fetch one account.
async fn get_account<R: LedgerBackend>(
    State(state): State<AppState<R>>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult {
    let account = state.registry.get_account(id).await?;
    auth.require_organisation(account.organisation_id)?;
    Ok(ApiResponse::ok(
        "GL account retrieved",
        AccountResponse::from(account),
    ))
}

/// PUT `/gl-accounts/{id}` - Patch metadata, close, reopen, freeze or unfreeze.
async fn update_account<R: LedgerBackend>(
    State(state): State<AppState<R>>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateAccountRequest>,
) -> ApiResult {
    payload.validate()?;
    let existing = state.registry.get_account(id).await?;
    auth.require_organisation(existing.organisation_id)?;

    let account = state.registry.update_account(id, payload.into()).await?;
    Ok(ApiResponse::ok(
        "GL account updated",
        AccountResponse::from(account),
    ))
}

/// DELETE `/gl-accounts/{id}` - Delete an account no entry references.
async fn delete_account<R: LedgerBackend>(
    State(state): State<AppState<R>>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult {
    let existing = state.registry.get_account(id).await?;
    auth.require_organisation(existing.organisation_id)?;

    state.registry.delete_account(id).await?;
    Ok(ApiResponse::ok(
        "GL account deleted",
        serde_json::json!({ "id": id }),
    ))
}

/// POST `/gl-accounts/generate` - Create accounts for entities that lack one.
async fn generate_accounts<R: LedgerBackend>(
    State(state): State<AppState<R>>,
    auth: AuthUser,
    Json(payload): Json<GenerateAccountsRequest>,
) -> ApiResult {
    let organisation_id = payload.organisation_id.unwrap_or(auth.organisation_id());
    auth.require_organisation(organisation_id)?;

    let result = state
        .registry
        .generate_accounts(organisation_id, payload.options, Some(auth.user_id()))
        .await?;
    let message = format!("Generated {} GL accounts", result.generated_count);
    Ok(ApiResponse::created(message, result))
}

/// GET `/gl-accounts/stats` - Balance rollups for the caller's organisation.
async fn account_stats<R: LedgerBackend>(
    State(state): State<AppState<R>>,
    auth: AuthUser,
) -> ApiResult {
    let stats = state
        .registry
        .get_stats(Some(auth.organisation_id()))
        .await?;
    Ok(ApiResponse::ok("GL account stats retrieved", stats))
}
