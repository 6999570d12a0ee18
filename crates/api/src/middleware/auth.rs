//! Authentication middleware for protected routes.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use remitgl_shared::{AppError, Claims};
use tracing::debug;
use uuid::Uuid;

use crate::AppState;
use crate::response::ApiError;

/// Extracts the bearer token from the Authorization header.
fn extract_bearer_token(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
}

/// Authentication middleware that validates JWT tokens.
///
/// Valid claims are stored in the request extensions for `AuthUser`.
pub async fn auth_middleware<R>(
    State(state): State<AppState<R>>,
    mut request: Request,
    next: Next,
) -> Response {
    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let Some(token) = auth_header.and_then(extract_bearer_token) else {
        return ApiError::from(AppError::MissingToken).into_response();
    };

    match state.jwt_service.validate_token(token) {
        Ok(claims) => {
            request.extensions_mut().insert(claims);
            next.run(request).await
        }
        Err(err) => {
            let err = AppError::from(err);
            debug!(code = err.error_code(), detail = ?err, "Rejected bearer token");
            ApiError::from(err).into_response()
        }
    }
}

/// Extractor for authenticated user claims.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);

impl AuthUser {
    /// Returns the user ID from the claims.
    #[must_use]
    pub const fn user_id(&self) -> Uuid {
        self.0.user_id()
    }

    /// Returns the organisation ID from the claims.
    #[must_use]
    pub const fn organisation_id(&self) -> Uuid {
        self.0.organisation_id()
    }

    /// Fails with 403 unless `organisation_id` is the caller's.
    ///
    /// # Errors
    ///
    /// Returns a `FORBIDDEN` error for any other organisation.
    pub fn require_organisation(&self, organisation_id: Uuid) -> Result<(), ApiError> {
        if self.organisation_id() == organisation_id {
            Ok(())
        } else {
            Err(AppError::Forbidden(format!("organisation {organisation_id}")).into())
        }
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Claims>()
            .cloned()
            .map(AuthUser)
            .ok_or_else(|| AppError::Unauthorized.into())
    }
}
