//! API route definitions.

use std::str::FromStr;

use axum::{Router, middleware};
use remitgl_shared::types::PageRequest;
use serde::{Deserialize, Deserializer};

use crate::response::ApiError;
use crate::{AppState, LedgerBackend, middleware::auth_middleware};

pub mod charges_payments;
pub mod gl_accounts;
pub mod gl_transactions;
pub mod health;

/// Creates the API router: public health check plus authenticated routes.
pub fn api_routes<R: LedgerBackend>(state: AppState<R>) -> Router<AppState<R>> {
    let protected_routes = Router::new()
        .merge(gl_accounts::routes())
        .merge(gl_transactions::routes())
        .merge(charges_payments::routes())
        .layer(middleware::from_fn_with_state(state, auth_middleware::<R>));

    Router::new()
        .merge(health::routes())
        .merge(protected_routes)
}

/// Builds a page request from optional query values.
pub(crate) fn page_request(page: Option<u32>, limit: Option<u32>) -> PageRequest {
    let defaults = PageRequest::default();
    PageRequest::new(page.unwrap_or(defaults.page), limit.unwrap_or(defaults.limit))
}

/// Parses an optional query value, ignoring blanks.
pub(crate) fn parse_opt<T, E>(value: Option<&str>) -> Result<Option<T>, ApiError>
where
    T: FromStr<Err = E>,
    ApiError: From<E>,
{
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) => Ok(Some(v.parse()?)),
        None => Ok(None),
    }
}

/// Distinguishes an absent field from an explicit `null` in patch bodies.
pub(crate) fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use axum::{
        Router,
        body::Body,
        http::{Request, StatusCode, header::AUTHORIZATION},
    };
    use http_body_util::BodyExt;
    use remitgl_core::ledger::LedgerPolicy;
    use remitgl_core::memory::MemoryLedgerStore;
    use remitgl_shared::{JwtConfig, JwtService};
    use tower::ServiceExt;
    use uuid::Uuid;

    use crate::{AppState, create_router};

    pub struct TestApp {
        pub store: Arc<MemoryLedgerStore>,
        pub router: Router,
        pub org: Uuid,
        pub token: String,
    }

    impl TestApp {
        pub fn new() -> Self {
            let store = Arc::new(MemoryLedgerStore::new());
            let org = store.add_organisation("Acme Remit");
            let state = AppState::new(
                Arc::clone(&store),
                LedgerPolicy::default(),
                JwtService::new(JwtConfig::default()),
            );
            let token = state
                .jwt_service
                .issue_access_token(Uuid::new_v4(), org, "admin")
                .unwrap();
            Self {
                store,
                router: create_router(state),
                org,
                token,
            }
        }

        /// Sends a request and returns the status with the parsed body.
        pub async fn send(
            &self,
            method: &str,
            uri: &str,
            body: Option<serde_json::Value>,
        ) -> (StatusCode, serde_json::Value) {
            self.send_as(&self.token, method, uri, body).await
        }

        /// Admin token for a user of another organisation.
        pub fn token_for(&self, organisation_id: Uuid) -> String {
            JwtService::new(JwtConfig::default())
                .issue_access_token(Uuid::new_v4(), organisation_id, "admin")
                .unwrap()
        }

        /// Sends a request authenticated with `token`.
        pub async fn send_as(
            &self,
            token: &str,
            method: &str,
            uri: &str,
            body: Option<serde_json::Value>,
        ) -> (StatusCode, serde_json::Value) {
            let builder = Request::builder()
                .method(method)
                .uri(format!("/api/v1{uri}"))
                .header(AUTHORIZATION, format!("Bearer {token}"));
            let request = match body {
                Some(json) => builder
                    .header("Content-Type", "application/json")
                    .body(Body::from(json.to_string()))
                    .unwrap(),
                None => builder.body(Body::empty()).unwrap(),
            };

            let response = self.router.clone().oneshot(request).await.unwrap();
            let status = response.status();
            let bytes = response.into_body().collect().await.unwrap().to_bytes();
            let json = if bytes.is_empty() {
                serde_json::Value::Null
            } else {
                serde_json::from_slice(&bytes).unwrap()
            };
            (status, json)
        }
    }
}
