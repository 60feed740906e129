//! HTTP gateway
//!
//! Thin request layer: decodes bodies, calls the account service or the
//! transfer coordinator and maps ledger errors onto status codes.

pub mod handlers;
pub mod state;
pub mod types;

use std::sync::Arc;

use anyhow::Context;
use axum::{
    Router,
    routing::{get, post},
};
use tokio::net::TcpListener;

use crate::config::GatewayConfig;
use crate::ledger::LedgerStore;
pub use state::AppState;

/// Build the router
pub fn router<S: LedgerStore>(state: Arc<AppState<S>>) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check::<S>))
        .route("/accounts", post(handlers::create_account::<S>))
        .route("/accounts/{account_id}", get(handlers::get_account::<S>))
        .route(
            "/accounts/{account_id}/transactions",
            get(handlers::list_transactions::<S>),
        )
        .route("/transactions", post(handlers::create_transfer::<S>))
        .with_state(state)
}

/// Bind and serve until Ctrl-C
pub async fn serve<S: LedgerStore>(
    config: &GatewayConfig,
    state: Arc<AppState<S>>,
) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    tracing::info!(%addr, store = state.store_name(), "Gateway listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Gateway server error")?;

    tracing::info!("Gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
