//! Ledger core
//!
//! Accounts, transaction records, validation, the domain error taxonomy and
//! the storage boundary.
//!
//! # Invariants
//!
//! 1. Every committed account balance is `>= 0`.
//! 2. A committed transfer of `a` from `S` to `D` debits `S` by exactly `a`
//!    and credits `D` by exactly `a`.
//! 3. Every persisted transaction has `amount > 0` and distinct endpoints.

pub mod error;
pub mod error_map;
pub mod models;
pub mod store;
pub mod validation;

pub use error::{LedgerError, LedgerResult};
pub use models::{Account, AccountId, Transaction, TransactionId, TransactionStatus};
pub use store::{InMemoryLedgerStore, LedgerStore, PgLedgerStore};
