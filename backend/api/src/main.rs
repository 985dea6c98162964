//! Crowdfunding API entry point.
//!
//! Serves the fundraiser creation wizard, the two-stage review workflow
//! (admin verifies, super-admin publishes), public discovery and the
//! donation ledger over a JSON REST interface backed by SQLite.

mod api;
mod auth;
mod config;
mod db;
mod errors;
mod models;
mod payments;
mod storage;

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialise structured logging (RUST_LOG controls verbosity).
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("crowdfund_api=info,tower_http=info")),
        )
        .init();

    // Load optional .env file (ignored if missing).
    let _ = dotenvy::dotenv();

    let config = Config::from_env().map_err(|e| anyhow::anyhow!("{e}"))?;

    let pool = db::init_pool(&config.database_url, config.database_max_connections).await?;

    if let Some(admin) = &config.bootstrap_superadmin {
        auth::seed_superadmin(&pool, admin).await?;
    }

    let state = Arc::new(api::ApiState {
        pool,
        tokens: auth::TokenKeys::new(&config.jwt_secret, config.token_ttl_secs),
        proofs: storage::ProofStore::from_config(
            &config.proof_storage,
            &config.proof_public_base_url,
        )?,
        payments: payments::PaymentGateway::new(&config.payment)?,
    });

    let app = api::router(state, &config.frontend_url, config.max_upload_bytes);

    let addr = format!("0.0.0.0:{}", config.api_port);
    info!("API listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("API shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
