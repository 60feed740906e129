//! Transfer Ledger server
//!
//! ```text
//! ┌──────────┐    ┌──────────┐    ┌─────────────┐    ┌──────────┐
//! │   HTTP   │───▶│ Accounts │───▶│ LedgerStore │───▶│ Postgres │
//! │ Gateway  │───▶│ Transfer │───▶│ (trait)     │    │          │
//! └──────────┘    └──────────┘    └─────────────┘    └──────────┘
//! ```
//!
//! Flags:
//! - `--env <name>` / `-e <name>`: load `config/<name>.yaml` (default `dev`)
//! - `--memory`: serve from the in-memory store, no database

use std::sync::Arc;

use anyhow::Context;
use transfer_ledger::config::AppConfig;
use transfer_ledger::db::Database;
use transfer_ledger::gateway::{self, AppState};
use transfer_ledger::logging::{component_span, init_logging};
use transfer_ledger::{
    AccountService, InMemoryLedgerStore, LedgerStore, PgLedgerStore, TransferCoordinator,
};

fn get_env() -> String {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if (args[i] == "--env" || args[i] == "-e") && i + 1 < args.len() {
            return args[i + 1].clone();
        }
    }
    "dev".to_string()
}

fn use_memory_store() -> bool {
    std::env::args().any(|a| a == "--memory")
}

fn build_state<S: LedgerStore>(store: Arc<S>, config: &AppConfig) -> AppState<S> {
    let accounts = AccountService::new(store.clone(), component_span("accounts"));
    let mut transfers = TransferCoordinator::new(store, component_span("transfer"));
    if let Some(timeout) = config.transfer.timeout() {
        transfers = transfers.with_default_timeout(timeout);
    }
    AppState::new(accounts, transfers)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env = get_env();
    let config = AppConfig::load(&env)?;
    let _log_guard = init_logging(&config)?;

    tracing::info!("Starting Transfer Ledger in {} mode", env);

    if use_memory_store() {
        tracing::warn!("In-memory store selected, balances are lost on exit");
        let store = Arc::new(InMemoryLedgerStore::new(component_span("store")));
        let state = build_state(store, &config);
        return gateway::serve(&config.gateway, Arc::new(state)).await;
    }

    let db = Database::connect(&config.postgres)
        .await
        .context("Failed to connect to PostgreSQL")?;
    db.ensure_schema().await.context("Failed to prepare schema")?;

    let store = Arc::new(PgLedgerStore::new(db.pool().clone(), component_span("store")));
    let state = build_state(store, &config).with_database(db);
    gateway::serve(&config.gateway, Arc::new(state)).await
}
