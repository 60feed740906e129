//! Transfer Ledger - account ledger with an atomic transfer engine
//!
//! # Modules
//!
//! - [`ledger`] - Domain types, validation, error taxonomy and the storage trait
//! - [`transfer`] - Transfer coordinator and its phase state machine
//! - [`account`] - Standalone account operations
//! - [`db`] - PostgreSQL pool and schema
//! - [`gateway`] - HTTP request layer
//! - [`config`] - YAML configuration with environment overrides
//! - [`logging`] - Subscriber setup and component spans

pub mod account;
pub mod config;
pub mod db;
pub mod gateway;
pub mod ledger;
pub mod logging;
pub mod transfer;

// Convenient re-exports at crate root
pub use account::AccountService;
pub use ledger::{
    Account, AccountId, InMemoryLedgerStore, LedgerError, LedgerResult, LedgerStore,
    PgLedgerStore, Transaction, TransactionId, TransactionStatus,
};
pub use transfer::{TransferCoordinator, TransferPhase, TransferReport, TransferRequest};
