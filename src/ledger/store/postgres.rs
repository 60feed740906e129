//! PostgreSQL Ledger Store
//!
//! Durable [`LedgerStore`] over `accounts` and `transactions` (see
//! `db::schema`). Transfer scopes run at SERIALIZABLE isolation so that two
//! scopes reading and writing the same account cannot both commit; PostgreSQL
//! aborts one with SQLSTATE 40001, surfaced as `ConflictRetryable`.
//!
//! A scope deadline is enforced by the server: `statement_timeout` is set to
//! the time remaining before every statement, COMMIT included. A cancelled
//! statement reports SQLSTATE 57014 and the transaction does not commit.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres};
use tokio::time::Instant;
use tracing::Span;

use super::LedgerStore;
use crate::ledger::error::{LedgerError, LedgerResult};
use crate::ledger::error_map::{StoreOp, map_sqlx_error};
use crate::ledger::models::{Account, AccountId, Transaction};
use crate::ledger::validation::validate_balance;

/// Open PostgreSQL transaction owned by one transfer
///
/// Dropping it without `commit` rolls the transaction back.
pub struct PgScope {
    tx: sqlx::Transaction<'static, Postgres>,
    deadline: Option<Instant>,
}

/// PostgreSQL-backed ledger store
#[derive(Clone)]
pub struct PgLedgerStore {
    pool: PgPool,
    span: Span,
}

impl PgLedgerStore {
    /// Create a store logging under `span`.
    pub fn new(pool: PgPool, span: Span) -> Self {
        Self { pool, span }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Map a driver error and log it at a level matching its class.
    fn fail(&self, err: sqlx::Error, op: StoreOp) -> LedgerError {
        let mapped = map_sqlx_error(err, op);
        match &mapped {
            LedgerError::StorageFailure(cause) => {
                tracing::error!(parent: &self.span, op = %op, error = %cause, "Database error");
            }
            other => {
                tracing::warn!(parent: &self.span, op = %op, code = other.code(), "Database constraint rejected operation");
            }
        }
        mapped
    }

    /// Bound the next statement in `scope` by the time left before its deadline.
    async fn arm_deadline(&self, scope: &mut PgScope, op: StoreOp) -> LedgerResult<()> {
        let Some(deadline) = scope.deadline else {
            return Ok(());
        };
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            tracing::debug!(parent: &self.span, op = %op, "Scope deadline passed");
            return Err(LedgerError::Timeout);
        }
        // SET LOCAL takes no bind parameters; 0 would disable the timeout
        let sql = format!(
            "SET LOCAL statement_timeout = {}",
            remaining.as_millis().max(1)
        );
        sqlx::query(&sql)
            .execute(&mut *scope.tx)
            .await
            .map_err(|e| self.fail(e, op))?;
        Ok(())
    }
}

const ACCOUNT_COLUMNS: &str = "account_id, balance, created_at, updated_at";
const TRANSACTION_COLUMNS: &str =
    "id, source_account_id, destination_account_id, amount, status, created_at";

#[async_trait]
impl LedgerStore for PgLedgerStore {
    type Scope = PgScope;

    fn name(&self) -> &'static str {
        "postgres"
    }

    async fn create_account(
        &self,
        account_id: AccountId,
        initial_balance: Decimal,
    ) -> LedgerResult<Account> {
        if let Err(e) = validate_balance(initial_balance) {
            tracing::warn!(parent: &self.span, account_id, initial_balance = %initial_balance, "Initial balance rejected");
            return Err(e);
        }

        let sql = format!(
            "INSERT INTO accounts (account_id, balance) VALUES ($1, $2) RETURNING {}",
            ACCOUNT_COLUMNS
        );
        let row = sqlx::query_as::<_, AccountRow>(&sql)
            .bind(account_id)
            .bind(initial_balance)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| self.fail(e, StoreOp::CreateAccount))?;

        tracing::info!(parent: &self.span, account_id, balance = %row.balance, "Account created");
        Ok(row.into())
    }

    async fn get_account(&self, account_id: AccountId) -> LedgerResult<Account> {
        let sql = format!("SELECT {} FROM accounts WHERE account_id = $1", ACCOUNT_COLUMNS);
        let row = sqlx::query_as::<_, AccountRow>(&sql)
            .bind(account_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| self.fail(e, StoreOp::GetAccount))?;

        row.map(Account::from).ok_or_else(|| {
            tracing::debug!(parent: &self.span, account_id, "Account not found");
            LedgerError::AccountNotFound
        })
    }

    async fn list_transactions(&self, account_id: AccountId) -> LedgerResult<Vec<Transaction>> {
        let sql = format!(
            r#"SELECT {} FROM transactions
               WHERE source_account_id = $1 OR destination_account_id = $1
               ORDER BY created_at DESC, id DESC"#,
            TRANSACTION_COLUMNS
        );
        let rows = sqlx::query_as::<_, TransactionRow>(&sql)
            .bind(account_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| self.fail(e, StoreOp::ListTransactions))?;

        rows.into_iter().map(Transaction::try_from).collect()
    }

    async fn begin_serializable(&self, deadline: Option<Instant>) -> LedgerResult<PgScope> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| self.fail(e, StoreOp::Begin))?;

        // Must be the first statement of the transaction
        sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
            .execute(&mut *tx)
            .await
            .map_err(|e| self.fail(e, StoreOp::Begin))?;

        let mut scope = PgScope { tx, deadline };
        self.arm_deadline(&mut scope, StoreOp::Begin).await?;

        tracing::debug!(parent: &self.span, "Serializable scope opened");
        Ok(scope)
    }

    async fn commit(&self, mut scope: PgScope) -> LedgerResult<()> {
        self.arm_deadline(&mut scope, StoreOp::Commit).await?;
        scope
            .tx
            .commit()
            .await
            .map_err(|e| self.fail(e, StoreOp::Commit))?;
        tracing::debug!(parent: &self.span, "Scope committed");
        Ok(())
    }

    async fn rollback(&self, scope: PgScope) -> LedgerResult<()> {
        scope
            .tx
            .rollback()
            .await
            .map_err(|e| self.fail(e, StoreOp::Rollback))?;
        tracing::debug!(parent: &self.span, "Scope rolled back");
        Ok(())
    }

    async fn get_account_for_update(
        &self,
        scope: &mut PgScope,
        account_id: AccountId,
    ) -> LedgerResult<Account> {
        // Plain SELECT: under SERIALIZABLE the read is tracked as a predicate
        // dependency, no explicit row lock is taken.
        self.arm_deadline(scope, StoreOp::ReadForUpdate).await?;
        let sql = format!("SELECT {} FROM accounts WHERE account_id = $1", ACCOUNT_COLUMNS);
        let row = sqlx::query_as::<_, AccountRow>(&sql)
            .bind(account_id)
            .fetch_optional(&mut *scope.tx)
            .await
            .map_err(|e| self.fail(e, StoreOp::ReadForUpdate))?;

        match row {
            Some(row) => {
                tracing::debug!(parent: &self.span, account_id, balance = %row.balance, "Account read in scope");
                Ok(row.into())
            }
            None => Err(LedgerError::AccountNotFound),
        }
    }

    async fn update_balance(
        &self,
        scope: &mut PgScope,
        account_id: AccountId,
        new_balance: Decimal,
    ) -> LedgerResult<()> {
        if let Err(e) = validate_balance(new_balance) {
            tracing::warn!(parent: &self.span, account_id, new_balance = %new_balance, "Balance rejected");
            return Err(e);
        }

        self.arm_deadline(scope, StoreOp::UpdateBalance).await?;
        let result =
            sqlx::query("UPDATE accounts SET balance = $1, updated_at = NOW() WHERE account_id = $2")
                .bind(new_balance)
                .bind(account_id)
                .execute(&mut *scope.tx)
                .await
                .map_err(|e| self.fail(e, StoreOp::UpdateBalance))?;

        if result.rows_affected() == 0 {
            tracing::warn!(parent: &self.span, account_id, "No rows affected updating balance");
            return Err(LedgerError::AccountNotFound);
        }

        tracing::debug!(parent: &self.span, account_id, new_balance = %new_balance, "Balance updated in scope");
        Ok(())
    }

    async fn record_transfer(
        &self,
        scope: &mut PgScope,
        transaction: &Transaction,
    ) -> LedgerResult<Transaction> {
        transaction.validate()?;

        self.arm_deadline(scope, StoreOp::RecordTransfer).await?;
        let sql = format!(
            r#"INSERT INTO transactions
                   (source_account_id, destination_account_id, amount, status)
               VALUES ($1, $2, $3, $4)
               RETURNING {}"#,
            TRANSACTION_COLUMNS
        );
        let row = sqlx::query_as::<_, TransactionRow>(&sql)
            .bind(transaction.source_account_id)
            .bind(transaction.destination_account_id)
            .bind(transaction.amount)
            .bind(transaction.status.as_str())
            .fetch_one(&mut *scope.tx)
            .await
            .map_err(|e| self.fail(e, StoreOp::RecordTransfer))?;

        let recorded = Transaction::try_from(row)?;
        tracing::debug!(parent: &self.span, transaction_id = recorded.id, "Transaction recorded in scope");
        Ok(recorded)
    }
}

/// Internal row type for SQLx. Not exposed outside the store.
#[derive(Debug, sqlx::FromRow)]
struct AccountRow {
    account_id: i64,
    balance: Decimal,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<AccountRow> for Account {
    fn from(row: AccountRow) -> Self {
        Account {
            account_id: row.account_id,
            balance: row.balance,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct TransactionRow {
    id: i64,
    source_account_id: i64,
    destination_account_id: i64,
    amount: Decimal,
    status: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = LedgerError;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        Ok(Transaction {
            id: row.id,
            source_account_id: row.source_account_id,
            destination_account_id: row.destination_account_id,
            amount: row.amount,
            status: row.status.parse()?,
            created_at: row.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::models::TransactionStatus;
    use rust_decimal_macros::dec;

    #[test]
    fn test_transaction_row_conversion() {
        let row = TransactionRow {
            id: 9,
            source_account_id: 1,
            destination_account_id: 2,
            amount: dec!(40.00),
            status: "complete".to_string(),
            created_at: Utc::now(),
        };
        let tx = Transaction::try_from(row).unwrap();
        assert_eq!(tx.id, 9);
        assert_eq!(tx.status, TransactionStatus::Complete);
    }

    #[test]
    fn test_transaction_row_rejects_unknown_status() {
        let row = TransactionRow {
            id: 1,
            source_account_id: 1,
            destination_account_id: 2,
            amount: dec!(1),
            status: "reversed".to_string(),
            created_at: Utc::now(),
        };
        assert!(matches!(
            Transaction::try_from(row),
            Err(LedgerError::StorageFailure(_))
        ));
    }
}
