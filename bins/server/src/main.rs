//! RemitGL API server.
//!
//! Main entry point for the ledger and settlement service.

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use remitgl_api::{AppState, create_router};
use remitgl_core::ledger::LedgerPolicy;
use remitgl_db::{LedgerStore, connect};
use remitgl_shared::{AppConfig, JwtConfig, JwtService};

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "remitgl=debug,tower_http=debug".into());
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;
    init_tracing(config.log.json);

    let db = connect(&config.database)
        .await
        .context("Failed to connect to database")?;
    info!(max_connections = config.database.max_connections, "Connected to database");

    let jwt_service = JwtService::new(JwtConfig::from(&config.jwt));
    let policy = LedgerPolicy::from(&config.ledger);
    info!(
        allow_duplicate_entity_accounts = policy.allow_duplicate_entity_accounts,
        enforce_balance_bounds = policy.enforce_balance_bounds,
        "Ledger policy configured"
    );

    let state = AppState::new(Arc::new(LedgerStore::new(db)), policy, jwt_service);
    let app = create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
