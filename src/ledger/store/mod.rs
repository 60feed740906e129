//! Ledger Store
//!
//! The persistence boundary for accounts and transaction records. All
//! implementations must be safe to share between concurrent requests.
//!
//! # Operation families
//!
//! - **Standalone**: `create_account`, `get_account`, `list_transactions` run
//!   on their own at the store's default isolation level.
//! - **Scoped**: `get_account_for_update`, `update_balance`, `record_transfer`
//!   run inside a [`LedgerStore::Scope`] opened by `begin_serializable`. They
//!   never commit or roll back on their own.
//!
//! A scope dropped without `commit` is rolled back.

pub mod memory;
pub mod postgres;

pub use memory::{FailPoint, Fault, InMemoryLedgerStore, MemoryScope};
pub use postgres::{PgLedgerStore, PgScope};

use async_trait::async_trait;
use rust_decimal::Decimal;
use tokio::time::Instant;

use super::error::LedgerResult;
use super::models::{Account, AccountId, Transaction};

/// Storage capability consumed by the account service and the transfer
/// coordinator.
#[async_trait]
pub trait LedgerStore: Send + Sync + 'static {
    /// Active transaction handle
    type Scope: Send;

    /// Store name for logging
    fn name(&self) -> &'static str;

    // === Standalone ===

    /// Create an account. Negative or unrepresentable initial balances are
    /// rejected before I/O.
    async fn create_account(
        &self,
        account_id: AccountId,
        initial_balance: Decimal,
    ) -> LedgerResult<Account>;

    async fn get_account(&self, account_id: AccountId) -> LedgerResult<Account>;

    /// Transactions where the account is source or destination, newest first.
    async fn list_transactions(&self, account_id: AccountId) -> LedgerResult<Vec<Transaction>>;

    // === Scope management ===

    /// Open a scope at SERIALIZABLE isolation.
    ///
    /// With a deadline the store bounds its own statements by the time left.
    async fn begin_serializable(&self, deadline: Option<Instant>) -> LedgerResult<Self::Scope>;

    /// Commit the scope. Serialization conflicts surface as `ConflictRetryable`.
    async fn commit(&self, scope: Self::Scope) -> LedgerResult<()>;

    async fn rollback(&self, scope: Self::Scope) -> LedgerResult<()>;

    // === Scoped ===

    /// Read an account inside the scope, registering it as a read dependency.
    async fn get_account_for_update(
        &self,
        scope: &mut Self::Scope,
        account_id: AccountId,
    ) -> LedgerResult<Account>;

    /// Overwrite a balance. Negative or unrepresentable values are rejected
    /// with `InvalidAmount`; a missing row yields `AccountNotFound`.
    async fn update_balance(
        &self,
        scope: &mut Self::Scope,
        account_id: AccountId,
        new_balance: Decimal,
    ) -> LedgerResult<()>;

    /// Insert the transaction row, returning it with its generated id and
    /// creation time.
    async fn record_transfer(
        &self,
        scope: &mut Self::Scope,
        transaction: &Transaction,
    ) -> LedgerResult<Transaction>;
}
