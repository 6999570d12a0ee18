//! GL transaction routes, scoped to an organisation.

use axum::{
    Router,
    extract::State,
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use remitgl_core::ledger::{
    DrCr, EntryInput, GlTransactionFilter, GlTransactionStatus, GlTransactionType,
    PostTransactionInput, PostingContext,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use super::{page_request, parse_opt};
use crate::extract::{Json, Path, Query};
use crate::middleware::AuthUser;
use crate::response::{ApiResponse, ApiResult};
use crate::{AppState, LedgerBackend};

/// Creates the GL transaction routes.
pub fn routes<R: LedgerBackend>() -> Router<AppState<R>> {
    Router::new()
        .route(
            "/organisations/{org_id}/gltransactions",
            get(list_transactions::<R>).post(post_transaction::<R>),
        )
        .route(
            "/organisations/{org_id}/gltransactions/stats",
            get(transaction_stats::<R>),
        )
        .route(
            "/organisations/{org_id}/gltransactions/{transaction_id}",
            get(get_transaction::<R>),
        )
        .route(
            "/organisations/{org_id}/gltransactions/{transaction_id}/reverse",
            post(reverse_transaction::<R>),
        )
}

/// Query parameters for listing transactions.
#[derive(Debug, Default, Deserialize)]
pub struct ListTransactionsQuery {
    /// Filter by type.
    #[serde(rename = "type")]
    pub transaction_type: Option<String>,
    /// Filter by status.
    pub status: Option<String>,
    /// Posted at or after.
    pub from: Option<DateTime<Utc>>,
    /// Posted at or before.
    pub to: Option<DateTime<Utc>>,
    /// Header amount at least.
    pub min_amount: Option<Decimal>,
    /// Header amount at most.
    pub max_amount: Option<Decimal>,
    /// Only transactions touching this account.
    pub account_id: Option<Uuid>,
    /// Substring of the description.
    pub search: Option<String>,
    /// Page number (1-indexed).
    pub page: Option<u32>,
    /// Page size.
    pub limit: Option<u32>,
}

/// One requested leg.
#[derive(Debug, Deserialize, Validate)]
pub struct EntryRequest {
    /// Account to post to.
    pub account_id: Uuid,
    /// Positive amount.
    pub amount: Decimal,
    /// `DEBIT` or `CREDIT`.
    pub dr_cr: DrCr,
    /// Optional line description.
    #[validate(length(max = 500))]
    pub description: Option<String>,
}

/// Request body for posting a transaction.
#[derive(Debug, Deserialize, Validate)]
pub struct PostTransactionRequest {
    /// Transaction type.
    #[serde(rename = "type")]
    pub transaction_type: GlTransactionType,
    /// Header amount; defaults to the debit total.
    pub amount: Option<Decimal>,
    /// ISO currency code.
    #[validate(length(equal = 3))]
    pub currency_code: Option<String>,
    /// Description.
    #[validate(length(min = 1, max = 500))]
    pub description: String,
    /// The legs.
    #[validate(nested)]
    pub entries: Vec<EntryRequest>,
    /// Causing records.
    #[serde(flatten)]
    pub context: PostingContext,
}

/// Request body for reversing a transaction.
#[derive(Debug, Deserialize, Validate)]
pub struct ReverseTransactionRequest {
    /// Why the transaction is reversed.
    #[validate(length(max = 1000))]
    pub reason: String,
}

/// GET `/organisations/{org_id}/gltransactions`
async fn list_transactions<R: LedgerBackend>(
    State(state): State<AppState<R>>,
    auth: AuthUser,
    Path(org_id): Path<Uuid>,
    Query(query): Query<ListTransactionsQuery>,
) -> ApiResult {
    auth.require_organisation(org_id)?;

    let filter = GlTransactionFilter {
        transaction_type: parse_opt::<GlTransactionType, _>(query.transaction_type.as_deref())?,
        status: parse_opt::<GlTransactionStatus, _>(query.status.as_deref())?,
        from: query.from,
        to: query.to,
        min_amount: query.min_amount,
        max_amount: query.max_amount,
        account_id: query.account_id,
        search: query.search,
    };
    let page = state
        .poster
        .list_transactions(org_id, &filter, page_request(query.page, query.limit))
        .await?;
    Ok(ApiResponse::ok("GL transactions retrieved", page))
}

/// POST `/organisations/{org_id}/gltransactions`
async fn post_transaction<R: LedgerBackend>(
    State(state): State<AppState<R>>,
    auth: AuthUser,
    Path(org_id): Path<Uuid>,
    Json(payload): Json<PostTransactionRequest>,
) -> ApiResult {
    auth.require_organisation(org_id)?;
    payload.validate()?;

    let entries = payload
        .entries
        .into_iter()
        .map(|e| EntryInput {
            account_id: e.account_id,
            amount: e.amount,
            dr_cr: e.dr_cr,
            description: e.description,
        })
        .collect();

    let posted = state
        .poster
        .post_transaction(PostTransactionInput {
            organisation_id: org_id,
            transaction_type: payload.transaction_type,
            amount: payload.amount,
            currency_code: payload.currency_code,
            description: payload.description,
            entries,
            context: payload.context,
            created_by: Some(auth.user_id()),
        })
        .await?;
    Ok(ApiResponse::created("GL transaction posted", posted))
}

/// GET `/organisations/{org_id}/gltransactions/stats`
async fn transaction_stats<R: LedgerBackend>(
    State(state): State<AppState<R>>,
    auth: AuthUser,
    Path(org_id): Path<Uuid>,
) -> ApiResult {
    auth.require_organisation(org_id)?;
    let stats = state.poster.get_stats(org_id).await?;
    Ok(ApiResponse::ok("GL transaction stats retrieved", stats))
}

/// GET `/organisations/{org_id}/gltransactions/{transaction_id}`
async fn get_transaction<R: LedgerBackend>(
    State(state): State<AppState<R>>,
    auth: AuthUser,
    Path((org_id, transaction_id)): Path<(Uuid, Uuid)>,
) -> ApiResult {
    auth.require_organisation(org_id)?;
    let tx = state.poster.get_transaction(org_id, transaction_id).await?;
    Ok(ApiResponse::ok("GL transaction retrieved", tx))
}

/// POST `/organisations/{org_id}/gltransactions/{transaction_id}/reverse`
async fn reverse_transaction<R: LedgerBackend>(
    State(state): State<AppState<R>>,
    auth: AuthUser,
    Path((org_id, transaction_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<ReverseTransactionRequest>,
) -> ApiResult {
    auth.require_organisation(org_id)?;
    payload.validate()?;

    let result = state
        .poster
        .reverse_transaction(org_id, transaction_id, &payload.reason, Some(auth.user_id()))
        .await?;
    Ok(ApiResponse::ok("GL transaction reversed", result))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::{Value, json};

    use super::*;
    use crate::routes::test_support::TestApp;

    async fn account(app: &TestApp, name: &str, account_type: &str) -> String {
        let (status, body) = app
            .send(
                "POST",
                "/gl-accounts",
                Some(json!({ "name": name, "type": account_type, "currency_code": "USD" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["data"]["id"].as_str().unwrap().to_string()
    }

    fn deposit(cash: &str, deposits: &str, debit: &str, credit: &str) -> Value {
        json!({
            "type": "DEPOSIT",
            "currency_code": "USD",
            "description": "Cash deposit",
            "entries": [
                { "account_id": cash, "amount": debit, "dr_cr": "DEBIT" },
                { "account_id": deposits, "amount": credit, "dr_cr": "CREDIT" }
            ]
        })
    }

    #[tokio::test]
    async fn test_post_get_and_reverse() {
        let app = TestApp::new();
        let cash = account(&app, "Cash", "ASSET").await;
        let deposits = account(&app, "Deposits", "LIABILITY").await;
        let base = format!("/organisations/{}/gltransactions", app.org);

        let (status, body) = app
            .send("POST", &base, Some(deposit(&cash, &deposits, "100", "100")))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        let tx_id = body["data"]["transaction"]["id"].as_str().unwrap().to_string();

        let (status, body) = app.send("GET", &format!("{base}/{tx_id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], "POSTED");
        assert_eq!(body["data"]["entries"].as_array().unwrap().len(), 2);

        let reverse_uri = format!("{base}/{tx_id}/reverse");
        let (status, body) = app
            .send("POST", &reverse_uri, Some(json!({ "reason": "Keyed twice" })))
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["data"]["original"]["status"], "REVERSED");

        let (status, body) = app
            .send("POST", &reverse_uri, Some(json!({ "reason": "Again" })))
            .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "ALREADY_REVERSED");
    }

    #[tokio::test]
    async fn test_unbalanced_posting_is_rejected() {
        let app = TestApp::new();
        let cash = account(&app, "Cash", "ASSET").await;
        let deposits = account(&app, "Deposits", "LIABILITY").await;

        let (status, body) = app
            .send(
                "POST",
                &format!("/organisations/{}/gltransactions", app.org),
                Some(deposit(&cash, &deposits, "100", "90")),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "UNBALANCED_ENTRIES");
        assert_eq!(app.store.transaction_count(), 0);
    }

    #[tokio::test]
    async fn test_other_organisation_is_forbidden() {
        let app = TestApp::new();
        let (status, body) = app
            .send(
                "GET",
                &format!("/organisations/{}/gltransactions", Uuid::new_v4()),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_posting_to_other_organisations_accounts_is_not_found() {
        let app = TestApp::new();
        let cash = account(&app, "Cash", "ASSET").await;
        let deposits = account(&app, "Deposits", "LIABILITY").await;
        let intruder = app.store.add_organisation("Other Remit");
        let token = app.token_for(intruder);

        let (status, body) = app
            .send_as(
                &token,
                "POST",
                &format!("/organisations/{intruder}/gltransactions"),
                Some(deposit(&cash, &deposits, "100", "100")),
            )
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{body}");
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "ACCOUNT_NOT_FOUND");
        assert_eq!(app.store.transaction_count(), 0);

        let (_, body) = app.send("GET", &format!("/gl-accounts/{cash}"), None).await;
        let balance: Decimal = body["data"]["balance"].as_str().unwrap().parse().unwrap();
        assert_eq!(balance, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_list_and_stats() {
        let app = TestApp::new();
        let cash = account(&app, "Cash", "ASSET").await;
        let deposits = account(&app, "Deposits", "LIABILITY").await;
        let base = format!("/organisations/{}/gltransactions", app.org);
        for amount in ["10", "20"] {
            app.send("POST", &base, Some(deposit(&cash, &deposits, amount, amount)))
                .await;
        }

        let (status, body) = app.send("GET", &format!("{base}?limit=1"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["pagination"]["total"], 2);
        assert_eq!(body["data"]["pagination"]["totalPages"], 2);
        assert_eq!(body["data"]["items"].as_array().unwrap().len(), 1);

        let (status, body) = app.send("GET", &format!("{base}/stats"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["total_transactions"], 2);
    }

    #[tokio::test]
    async fn test_missing_transaction_is_not_found() {
        let app = TestApp::new();
        let (status, body) = app
            .send(
                "GET",
                &format!("/organisations/{}/gltransactions/{}", app.org, Uuid::new_v4()),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "TRANSACTION_NOT_FOUND");
    }
}
