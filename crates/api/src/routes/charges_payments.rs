//! Charges payment and pending charge routes for the caller's organisation.

use axum::{
    Router,
    extract::State,
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use remitgl_core::settlement::{
    ApproveChargesPaymentInput, ChargeType, ChargesPaymentFilter, CreateChargesPaymentInput,
    PaymentStatus, PendingChargeFilter, ReverseChargesPaymentInput,
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

/// Creates the settlement routes.
pub fn routes<R: LedgerBackend>() -> Router<AppState<R>> {
    Router::new()
        .route(
            "/charges-payments",
            get(list_payments::<R>).post(create_payment::<R>),
        )
        .route("/charges-payments/{payment_id}", get(get_payment::<R>))
        .route(
            "/charges-payments/{payment_id}/approve",
            post(approve_payment::<R>),
        )
        .route(
            "/charges-payments/{payment_id}/reverse",
            post(reverse_payment::<R>),
        )
        .route("/pending-charges", get(list_pending_charges::<R>))
        .route("/pending-charges-stats", get(pending_charges_stats::<R>))
        .route("/charge-payments-stats", get(payment_stats::<R>))
}

/// Query parameters shared by the payment and pending charge listings.
#[derive(Debug, Default, Deserialize)]
pub struct SettlementQuery {
    /// Filter by charge type.
    #[serde(rename = "type")]
    pub charge_type: Option<String>,
    /// Filter by payment status (payments only).
    pub status: Option<String>,
    /// Filter by currency.
    pub currency_code: Option<String>,
    /// Created at or after.
    pub from: Option<DateTime<Utc>>,
    /// Created at or before.
    pub to: Option<DateTime<Utc>>,
    /// Internal amount at least.
    pub min_amount: Option<Decimal>,
    /// Internal amount at most.
    pub max_amount: Option<Decimal>,
    /// Free-text search.
    pub search: Option<String>,
    /// Page number (1-indexed).
    pub page: Option<u32>,
    /// Page size.
    pub limit: Option<u32>,
}

/// Request body for creating a payment.
#[derive(Debug, Deserialize, Validate)]
pub struct CreatePaymentRequest {
    /// Pending obligations to settle.
    #[serde(default)]
    pub transaction_charge_ids: Vec<Uuid>,
    /// Destination organisation.
    pub destination_org_id: Option<Uuid>,
    /// Initial notes.
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

/// Request body for approving a payment.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct ApprovePaymentRequest {
    /// Approval notes.
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
    /// Post the settlement to the ledger against this account.
    pub settlement_account_id: Option<Uuid>,
}

/// Request body for reversing a payment.
#[derive(Debug, Deserialize, Validate)]
pub struct ReversePaymentRequest {
    /// Why the payment is reversed.
    #[validate(length(max = 1000))]
    pub reason: String,
    /// Additional notes.
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

/// GET `/charges-payments`
async fn list_payments<R: LedgerBackend>(
    State(state): State<AppState<R>>,
    auth: AuthUser,
    Query(query): Query<SettlementQuery>,
) -> ApiResult {
    let filter = ChargesPaymentFilter {
        charge_type: parse_opt::<ChargeType, _>(query.charge_type.as_deref())?,
        status: parse_opt::<PaymentStatus, _>(query.status.as_deref())?,
        currency_code: query.currency_code,
        from: query.from,
        to: query.to,
        min_amount: query.min_amount,
        max_amount: query.max_amount,
        search: query.search,
    };
    let page = state
        .settlement
        .get_charges_payments(
            auth.organisation_id(),
            &filter,
            page_request(query.page, query.limit),
        )
        .await?;
    Ok(ApiResponse::ok("Charges payments retrieved", page))
}

/// POST `/charges-payments`
async fn create_payment<R: LedgerBackend>(
    State(state): State<AppState<R>>,
    auth: AuthUser,
    Json(payload): Json<CreatePaymentRequest>,
) -> ApiResult {
    payload.validate()?;
    let payment = state
        .settlement
        .create_charges_payment(CreateChargesPaymentInput {
            organisation_id: auth.organisation_id(),
            transaction_charge_ids: payload.transaction_charge_ids,
            destination_org_id: payload.destination_org_id,
            notes: payload.notes,
            created_by: Some(auth.user_id()),
        })
        .await?;
    Ok(ApiResponse::created("Charges payment created", payment))
}

/// GET `/charges-payments/{payment_id}`
async fn get_payment<R: LedgerBackend>(
    State(state): State<AppState<R>>,
    auth: AuthUser,
    Path(payment_id): Path<Uuid>,
) -> ApiResult {
    let payment = state
        .settlement
        .get_charges_payment(auth.organisation_id(), payment_id)
        .await?;
    Ok(ApiResponse::ok("Charges payment retrieved", payment))
}

/// POST `/charges-payments/{payment_id}/approve`
async fn approve_payment<R: LedgerBackend>(
    State(state): State<AppState<R>>,
    auth: AuthUser,
    Path(payment_id): Path<Uuid>,
    payload: Option<Json<ApprovePaymentRequest>>,
) -> ApiResult {
    let payload = payload.map(|Json(p)| p).unwrap_or_default();
    payload.validate()?;

    let payment = state
        .settlement
        .approve_charges_payment(ApproveChargesPaymentInput {
            organisation_id: auth.organisation_id(),
            payment_id,
            notes: payload.notes,
            settlement_account_id: payload.settlement_account_id,
            approved_by: Some(auth.user_id()),
        })
        .await?;
    Ok(ApiResponse::ok("Charges payment approved", payment))
}

/// POST `/charges-payments/{payment_id}/reverse`
async fn reverse_payment<R: LedgerBackend>(
    State(state): State<AppState<R>>,
    auth: AuthUser,
    Path(payment_id): Path<Uuid>,
    Json(payload): Json<ReversePaymentRequest>,
) -> ApiResult {
    payload.validate()?;
    let payment = state
        .settlement
        .reverse_charges_payment(ReverseChargesPaymentInput {
            organisation_id: auth.organisation_id(),
            payment_id,
            reason: payload.reason,
            notes: payload.notes,
            reversed_by: Some(auth.user_id()),
        })
        .await?;
    Ok(ApiResponse::ok("Charges payment reversed", payment))
}

/// GET `/pending-charges`
async fn list_pending_charges<R: LedgerBackend>(
    State(state): State<AppState<R>>,
    auth: AuthUser,
    Query(query): Query<SettlementQuery>,
) -> ApiResult {
    let filter = PendingChargeFilter {
        charge_type: parse_opt::<ChargeType, _>(query.charge_type.as_deref())?,
        currency_code: query.currency_code,
        from: query.from,
        to: query.to,
        min_amount: query.min_amount,
        max_amount: query.max_amount,
        search: query.search,
    };
    let page = state
        .settlement
        .get_pending_transaction_charges(
            auth.organisation_id(),
            &filter,
            page_request(query.page, query.limit),
        )
        .await?;
    Ok(ApiResponse::ok("Pending charges retrieved", page))
}

/// GET `/pending-charges-stats`
async fn pending_charges_stats<R: LedgerBackend>(
    State(state): State<AppState<R>>,
    auth: AuthUser,
) -> ApiResult {
    let stats = state
        .settlement
        .get_pending_charges_stats(auth.organisation_id())
        .await?;
    Ok(ApiResponse::ok("Pending charge stats retrieved", stats))
}

/// GET `/charge-payments-stats`
async fn payment_stats<R: LedgerBackend>(
    State(state): State<AppState<R>>,
    auth: AuthUser,
) -> ApiResult {
    let stats = state
        .settlement
        .get_charges_payment_stats(auth.organisation_id())
        .await?;
    Ok(ApiResponse::ok("Charges payment stats retrieved", stats))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use remitgl_core::settlement::{ChargeStatus, TransactionCharge};
    use rust_decimal_macros::dec;
    use serde_json::json;

    use super::*;
    use crate::routes::test_support::TestApp;

    fn pending_charge(app: &TestApp, charge_id: Uuid, amount: Decimal) -> Uuid {
        let id = Uuid::new_v4();
        app.store.add_charge(TransactionCharge {
            id,
            organisation_id: app.org,
            transaction_id: Uuid::new_v4(),
            charge_id,
            charge_type: ChargeType::Tax,
            internal_amount: amount,
            external_amount: amount,
            currency_code: Some("USD".to_string()),
            status: ChargeStatus::Pending,
            description: Some("Excise duty".to_string()),
            created_at: Utc::now(),
        });
        id
    }

    async fn create_payment(app: &TestApp, ids: &[Uuid]) -> serde_json::Value {
        let (status, body) = app
            .send(
                "POST",
                "/charges-payments",
                Some(json!({ "transaction_charge_ids": ids })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body
    }

    #[tokio::test]
    async fn test_create_approve_reverse_lifecycle() {
        let app = TestApp::new();
        let definition = Uuid::new_v4();
        let ids: Vec<Uuid> = [dec!(10), dec!(20), dec!(30)]
            .into_iter()
            .map(|a| pending_charge(&app, definition, a))
            .collect();

        let body = create_payment(&app, &ids).await;
        assert_eq!(body["data"]["status"], "PENDING");
        assert_eq!(body["data"]["internal_total_amount"], "60");
        let reference = body["data"]["reference_number"].as_str().unwrap();
        assert!(reference.starts_with("PAY-"));
        assert!(reference.ends_with("-TAX-ACM-001"));

        let payment_id = body["data"]["id"].as_str().unwrap().to_string();
        let (status, body) = app
            .send("POST", &format!("/charges-payments/{payment_id}/approve"), None)
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["data"]["status"], "COMPLETED");
        assert!(ids.iter().all(|id| app.store.charge(*id).unwrap().status == ChargeStatus::Paid));

        let (status, body) = app
            .send(
                "POST",
                &format!("/charges-payments/{payment_id}/reverse"),
                Some(json!({ "reason": "duplicate" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["data"]["status"], "FAILED");
        assert!(
            ids.iter()
                .all(|id| app.store.charge(*id).unwrap().status == ChargeStatus::Pending)
        );
    }

    #[tokio::test]
    async fn test_approve_twice_is_invalid_state() {
        let app = TestApp::new();
        let id = pending_charge(&app, Uuid::new_v4(), dec!(5));
        let body = create_payment(&app, &[id]).await;
        let uri = format!(
            "/charges-payments/{}/approve",
            body["data"]["id"].as_str().unwrap()
        );

        app.send("POST", &uri, Some(json!({}))).await;
        let (status, body) = app.send("POST", &uri, Some(json!({}))).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "INVALID_STATE");
    }

    #[tokio::test]
    async fn test_create_without_charges_is_rejected() {
        let app = TestApp::new();
        let (status, body) = app
            .send("POST", "/charges-payments", Some(json!({ "transaction_charge_ids": [] })))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "NO_CHARGES_SELECTED");
    }

    #[tokio::test]
    async fn test_reverse_requires_reason() {
        let app = TestApp::new();
        let id = pending_charge(&app, Uuid::new_v4(), dec!(5));
        let body = create_payment(&app, &[id]).await;
        let payment_id = body["data"]["id"].as_str().unwrap().to_string();
        app.send("POST", &format!("/charges-payments/{payment_id}/approve"), None)
            .await;

        let (status, body) = app
            .send(
                "POST",
                &format!("/charges-payments/{payment_id}/reverse"),
                Some(json!({ "reason": "   " })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "REASON_REQUIRED");
    }

    #[tokio::test]
    async fn test_approval_with_settlement_account_posts_to_ledger() {
        let app = TestApp::new();
        let definition = Uuid::new_v4();
        let id = pending_charge(&app, definition, dec!(40));

        let (_, revenue) = app
            .send(
                "POST",
                "/gl-accounts",
                Some(json!({
                    "name": "Charge - Excise duty",
                    "type": "REVENUE",
                    "initial_balance": "100",
                    "bound_entity": { "kind": "CHARGE", "id": definition }
                })),
            )
            .await;
        let (_, bank) = app
            .send(
                "POST",
                "/gl-accounts",
                Some(json!({ "name": "Bank", "type": "ASSET", "initial_balance": "100" })),
            )
            .await;
        let revenue_id: Uuid = revenue["data"]["id"].as_str().unwrap().parse().unwrap();
        let bank_id: Uuid = bank["data"]["id"].as_str().unwrap().parse().unwrap();

        let body = create_payment(&app, &[id]).await;
        let (status, body) = app
            .send(
                "POST",
                &format!("/charges-payments/{}/approve", body["data"]["id"].as_str().unwrap()),
                Some(json!({ "settlement_account_id": bank_id })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert!(body["data"]["gl_transaction_id"].is_string());
        assert_eq!(app.store.account(revenue_id).unwrap().balance, dec!(60));
        assert_eq!(app.store.account(bank_id).unwrap().balance, dec!(60));
    }

    #[tokio::test]
    async fn test_pending_listing_and_stats() {
        let app = TestApp::new();
        let definition = Uuid::new_v4();
        pending_charge(&app, definition, dec!(10));
        pending_charge(&app, definition, dec!(15));

        let (status, body) = app.send("GET", "/pending-charges?type=tax", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["pagination"]["total"], 2);

        let (status, body) = app.send("GET", "/pending-charges-stats", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["total_pending"], 2);
        assert_eq!(body["data"]["internal_total"], "25");

        let (status, body) = app.send("GET", "/charge-payments-stats", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["total_payments"], 0);
    }

    #[tokio::test]
    async fn test_unknown_status_filter_is_rejected() {
        let app = TestApp::new();
        let (status, body) = app
            .send("GET", "/charges-payments?status=LOST", None)
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "INVALID_FILTER");
    }
}
