//! HTTP API layer with Axum routes and middleware.
//!
//! This crate provides:
//! - REST API routes for GL accounts, GL transactions and charges payments
//! - Bearer-token authentication middleware
//! - The `{success, message, data, error}` response envelope

pub mod extract;
pub mod middleware;
pub mod response;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use remitgl_core::ledger::{
    GlAccountRegistry, GlAccountRepository, GlPoster, GlTransactionRepository, LedgerPolicy,
};
use remitgl_core::settlement::{ChargesSettlement, SettlementRepository};
use remitgl_shared::JwtService;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Storage backend the HTTP layer can run against.
pub trait LedgerBackend:
    GlAccountRepository + GlTransactionRepository + SettlementRepository + 'static
{
}

impl<T> LedgerBackend for T where
    T: GlAccountRepository + GlTransactionRepository + SettlementRepository + 'static
{
}

/// Application state shared across handlers.
pub struct AppState<R> {
    /// GL account registry.
    pub registry: Arc<GlAccountRegistry<R>>,
    /// GL transaction poster.
    pub poster: Arc<GlPoster<R>>,
    /// Charges payment settlement.
    pub settlement: Arc<ChargesSettlement<R>>,
    /// JWT service for token operations.
    pub jwt_service: Arc<JwtService>,
}

impl<R> Clone for AppState<R> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            poster: Arc::clone(&self.poster),
            settlement: Arc::clone(&self.settlement),
            jwt_service: Arc::clone(&self.jwt_service),
        }
    }
}

impl<R: LedgerBackend> AppState<R> {
    /// Wires every service to one store.
    pub fn new(store: Arc<R>, policy: LedgerPolicy, jwt_service: JwtService) -> Self {
        Self {
            registry: Arc::new(GlAccountRegistry::new(Arc::clone(&store), policy)),
            poster: Arc::new(GlPoster::new(Arc::clone(&store), policy)),
            settlement: Arc::new(ChargesSettlement::new(store, policy)),
            jwt_service: Arc::new(jwt_service),
        }
    }
}

/// Creates the main application router.
pub fn create_router<R: LedgerBackend>(state: AppState<R>) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes(state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
