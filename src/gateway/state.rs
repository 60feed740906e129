use crate::account::AccountService;
use crate::db::Database;
use crate::ledger::LedgerStore;
use crate::transfer::TransferCoordinator;

/// Gateway shared state
pub struct AppState<S: LedgerStore> {
    pub accounts: AccountService<S>,
    pub transfers: TransferCoordinator<S>,
    /// PostgreSQL pool, pinged by the health check when present
    pub pg_db: Option<Database>,
}

impl<S: LedgerStore> AppState<S> {
    pub fn new(accounts: AccountService<S>, transfers: TransferCoordinator<S>) -> Self {
        Self {
            accounts,
            transfers,
            pg_db: None,
        }
    }

    pub fn with_database(mut self, db: Database) -> Self {
        self.pg_db = Some(db);
        self
    }

    pub fn store_name(&self) -> &'static str {
        self.transfers.store().name()
    }
}
