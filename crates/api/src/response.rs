//! Response envelope and error mapping.
//!
//! Every response body is `{success, message, data?, error?}`. Callers branch on
//! `success`, so failures always carry `success: false` regardless of status.

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use remitgl_core::ledger::LedgerError;
use remitgl_core::settlement::SettlementError;
use remitgl_shared::AppError;
use serde::Serialize;
use tracing::error;
use validator::ValidationErrors;

const INTERNAL_MESSAGE: &str = "An internal error occurred";

/// Success or failure envelope.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    /// Whether the call succeeded.
    pub success: bool,
    /// Human-readable outcome.
    pub message: String,
    /// Payload on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Machine-readable error code on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'static str>,
}

impl<T: Serialize> ApiResponse<T> {
    /// 200 with data.
    pub fn ok(message: impl Into<String>, data: T) -> Response {
        Self::with_status(StatusCode::OK, message, data)
    }

    /// 201 with data.
    pub fn created(message: impl Into<String>, data: T) -> Response {
        Self::with_status(StatusCode::CREATED, message, data)
    }

    fn with_status(status: StatusCode, message: impl Into<String>, data: T) -> Response {
        let body = Self {
            success: true,
            message: message.into(),
            data: Some(data),
            error: None,
        };
        (status, Json(body)).into_response()
    }
}

/// Handler error rendered as a failure envelope.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

/// Result type for route handlers.
pub type ApiResult = Result<Response, ApiError>;

impl ApiError {
    /// Builds an error from its parts.
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    /// Returns the HTTP status.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the machine-readable code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.code
    }

    fn from_domain(status: u16, code: &'static str, message: String) -> Self {
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            error!(error = %message, code, "Request failed with internal error");
            return Self::new(status, "INTERNAL_ERROR", INTERNAL_MESSAGE);
        }
        Self::new(status, code, message)
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        Self::from_domain(err.status_code(), err.error_code(), err.to_string())
    }
}

impl From<SettlementError> for ApiError {
    fn from(err: SettlementError) -> Self {
        Self::from_domain(err.status_code(), err.error_code(), err.to_string())
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self::from_domain(err.status_code(), err.error_code(), err.public_message())
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(err: ValidationErrors) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            "VALIDATION_ERROR",
            format!("Validation error: {err}"),
        )
    }
}

impl ApiError {
    /// An extractor rejection. Malformed input is a validation failure; a
    /// rejection axum reports as 5xx is a routing defect and stays masked.
    fn rejected(status: StatusCode, body: String) -> Self {
        if status.is_server_error() {
            return Self::from_domain(status.as_u16(), "INTERNAL_ERROR", body);
        }
        Self::new(
            StatusCode::BAD_REQUEST,
            "VALIDATION_ERROR",
            format!("Validation error: {body}"),
        )
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::rejected(rejection.status(), rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::rejected(rejection.status(), rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::rejected(rejection.status(), rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiResponse::<()> {
            success: false,
            message: self.message,
            data: None,
            error: Some(self.code),
        };
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use uuid::Uuid;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_success_envelope() {
        let response = ApiResponse::created("Created", serde_json::json!({ "id": 1 }));
        assert_eq!(response.status(), StatusCode::CREATED);

        let body = body_json(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["message"], "Created");
        assert_eq!(body["data"]["id"], 1);
        assert!(body.get("error").is_none());
    }

    #[tokio::test]
    async fn test_domain_error_keeps_code() {
        let response = ApiError::from(LedgerError::AlreadyReversed(Uuid::nil())).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "ALREADY_REVERSED");
        assert!(body.get("data").is_none());
    }

    #[tokio::test]
    async fn test_token_error_is_unauthorized() {
        let err = ApiError::from(AppError::TokenExpired);
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.code(), "TOKEN_EXPIRED");
    }

    #[tokio::test]
    async fn test_internal_error_hides_detail() {
        let err = ApiError::from(SettlementError::storage("duplicate key value violates unique"));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(err.into_response()).await;
        assert_eq!(body["message"], INTERNAL_MESSAGE);
        assert_eq!(body["error"], "INTERNAL_ERROR");
    }
}
