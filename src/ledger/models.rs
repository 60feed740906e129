//! Ledger data model: accounts and transaction records

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::LedgerError;

/// Account identifier (positive, immutable once created)
pub type AccountId = i64;

/// Transaction identifier, assigned by the store on insert
pub type TransactionId = i64;

/// A ledger account
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Account {
    pub account_id: AccountId,
    pub balance: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    pub fn new(account_id: AccountId, balance: Decimal) -> Self {
        let now = Utc::now();
        Self {
            account_id,
            balance,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn has_sufficient_balance(&self, amount: Decimal) -> bool {
        self.balance >= amount
    }

    /// Add `amount` to the balance.
    ///
    /// A sum beyond the decimal range is rejected as `InvalidAmount`.
    pub fn credit(&mut self, amount: Decimal) -> Result<(), LedgerError> {
        self.balance = self
            .balance
            .checked_add(amount)
            .ok_or(LedgerError::InvalidAmount)?;
        Ok(())
    }

    /// Subtract `amount` from the balance.
    ///
    /// Leaves the account untouched and returns `InsufficientBalance` when the
    /// balance does not cover the amount.
    pub fn debit(&mut self, amount: Decimal) -> Result<(), LedgerError> {
        if !self.has_sufficient_balance(amount) {
            return Err(LedgerError::InsufficientBalance);
        }
        self.balance -= amount;
        Ok(())
    }
}

/// Transaction record status
///
/// Stored as lowercase text in `transactions.status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Complete,
    Failed,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Complete => "complete",
            TransactionStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionStatus {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TransactionStatus::Pending),
            "complete" => Ok(TransactionStatus::Complete),
            "failed" => Ok(TransactionStatus::Failed),
            other => Err(LedgerError::storage(format!(
                "unknown transaction status '{}'",
                other
            ))),
        }
    }
}

/// A transfer between two accounts
///
/// Built in memory as `Pending`; the coordinator promotes it to `Complete`
/// right before it is recorded. `id` and `created_at` are only meaningful
/// once the store has returned the persisted row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub source_account_id: AccountId,
    pub destination_account_id: AccountId,
    pub amount: Decimal,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// Create a pending, not yet persisted transaction.
    pub fn pending(
        source_account_id: AccountId,
        destination_account_id: AccountId,
        amount: Decimal,
    ) -> Self {
        Self {
            id: 0,
            source_account_id,
            destination_account_id,
            amount,
            status: TransactionStatus::Pending,
            created_at: Utc::now(),
        }
    }

    /// Amount must be positive, endpoints must differ (checked in that order).
    pub fn validate(&self) -> Result<(), LedgerError> {
        super::validation::validate_transfer(
            self.source_account_id,
            self.destination_account_id,
            self.amount,
        )
    }

    pub fn mark_complete(&mut self) {
        self.status = TransactionStatus::Complete;
    }

    pub fn is_pending(&self) -> bool {
        self.status == TransactionStatus::Pending
    }

    pub fn is_complete(&self) -> bool {
        self.status == TransactionStatus::Complete
    }

    pub fn is_failed(&self) -> bool {
        self.status == TransactionStatus::Failed
    }

    /// Whether the account takes part in this transaction on either side
    pub fn involves(&self, account_id: AccountId) -> bool {
        self.source_account_id == account_id || self.destination_account_id == account_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_sufficient_balance_is_inclusive() {
        let account = Account::new(1, dec!(50.00));
        assert!(account.has_sufficient_balance(dec!(50.00)));
        assert!(!account.has_sufficient_balance(dec!(50.01)));
    }

    #[test]
    fn test_debit_and_credit() {
        let mut account = Account::new(1, dec!(100.00));
        account.debit(dec!(40.00)).unwrap();
        assert_eq!(account.balance, dec!(60.00));

        account.credit(dec!(0.5)).unwrap();
        assert_eq!(account.balance, dec!(60.50));
    }

    #[test]
    fn test_credit_overflow_is_rejected() {
        let mut account = Account::new(1, Decimal::MAX);
        assert!(matches!(
            account.credit(dec!(1)),
            Err(LedgerError::InvalidAmount)
        ));
        assert_eq!(account.balance, Decimal::MAX);
    }

    #[test]
    fn test_failed_debit_leaves_balance() {
        let mut account = Account::new(1, dec!(10));
        let err = account.debit(dec!(10.000001)).unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientBalance));
        assert_eq!(account.balance, dec!(10));
    }

    #[test]
    fn test_status_strings() {
        assert_eq!(TransactionStatus::Complete.to_string(), "complete");
        assert_eq!(
            "pending".parse::<TransactionStatus>().unwrap(),
            TransactionStatus::Pending
        );
        assert!("done".parse::<TransactionStatus>().is_err());
    }

    #[test]
    fn test_pending_transaction_lifecycle() {
        let mut tx = Transaction::pending(1, 2, dec!(12.5));
        assert!(tx.is_pending());
        assert!(!tx.is_complete());

        tx.mark_complete();
        assert!(tx.is_complete());
        assert!(!tx.is_failed());
        assert!(tx.involves(1));
        assert!(tx.involves(2));
        assert!(!tx.involves(3));
    }

    #[test]
    fn test_transaction_validate_checks_amount_first() {
        let tx = Transaction::pending(1, 1, dec!(0));
        assert!(matches!(tx.validate(), Err(LedgerError::InvalidAmount)));

        let tx = Transaction::pending(1, 1, dec!(1));
        assert!(matches!(tx.validate(), Err(LedgerError::SameAccount)));
    }
}
