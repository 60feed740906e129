//! Account service over a [`LedgerStore`]

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::Span;

use crate::ledger::error::LedgerResult;
use crate::ledger::models::{Account, AccountId, Transaction};
use crate::ledger::store::LedgerStore;
use crate::ledger::validation::{validate_account_id, validate_balance};

/// Account operations that do not move funds
pub struct AccountService<S: LedgerStore> {
    store: Arc<S>,
    span: Span,
}

impl<S: LedgerStore> AccountService<S> {
    pub fn new(store: Arc<S>, span: Span) -> Self {
        Self { store, span }
    }

    /// Open an account with a non-negative starting balance.
    ///
    /// Fails with `AccountAlreadyExists` if the id is taken; the existing
    /// account is left untouched.
    pub async fn create_account(
        &self,
        account_id: AccountId,
        initial_balance: Decimal,
    ) -> LedgerResult<Account> {
        validate_account_id(account_id)?;
        validate_balance(initial_balance)?;

        let account = self.store.create_account(account_id, initial_balance).await?;
        tracing::debug!(parent: &self.span, account_id, store = self.store.name(), "Account opened");
        Ok(account)
    }

    pub async fn get_account(&self, account_id: AccountId) -> LedgerResult<Account> {
        validate_account_id(account_id)?;
        self.store.get_account(account_id).await
    }

    /// Transfers touching the account, newest first.
    ///
    /// Fails with `AccountNotFound` for an unknown account rather than
    /// returning an empty history.
    pub async fn list_transactions(&self, account_id: AccountId) -> LedgerResult<Vec<Transaction>> {
        validate_account_id(account_id)?;
        self.store.get_account(account_id).await?;
        self.store.list_transactions(account_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::error::LedgerError;
    use crate::ledger::store::InMemoryLedgerStore;
    use crate::transfer::TransferCoordinator;
    use rust_decimal_macros::dec;

    fn service() -> (AccountService<InMemoryLedgerStore>, Arc<InMemoryLedgerStore>) {
        let store = Arc::new(InMemoryLedgerStore::default());
        (AccountService::new(store.clone(), Span::none()), store)
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let (accounts, _) = service();
        let created = accounts.create_account(1, dec!(100.00)).await.unwrap();
        assert_eq!(created.balance, dec!(100.00));

        let fetched = accounts.get_account(1).await.unwrap();
        assert_eq!(fetched.account_id, 1);
        assert_eq!(fetched.balance, dec!(100.00));
    }

    #[tokio::test]
    async fn test_zero_initial_balance_allowed() {
        let (accounts, _) = service();
        let created = accounts.create_account(7, Decimal::ZERO).await.unwrap();
        assert!(created.balance.is_zero());
    }

    #[tokio::test]
    async fn test_rejects_bad_input() {
        let (accounts, _) = service();
        assert!(matches!(
            accounts.create_account(0, dec!(1)).await,
            Err(LedgerError::InvalidAccountId)
        ));
        assert!(matches!(
            accounts.create_account(1, dec!(-0.01)).await,
            Err(LedgerError::InvalidAmount)
        ));
        assert!(matches!(
            accounts.get_account(-3).await,
            Err(LedgerError::InvalidAccountId)
        ));
    }

    #[tokio::test]
    async fn test_duplicate_is_rejected() {
        let (accounts, _) = service();
        accounts.create_account(1, dec!(5)).await.unwrap();
        assert!(matches!(
            accounts.create_account(1, dec!(500)).await,
            Err(LedgerError::AccountAlreadyExists)
        ));
        assert_eq!(accounts.get_account(1).await.unwrap().balance, dec!(5));
    }

    #[tokio::test]
    async fn test_missing_account() {
        let (accounts, _) = service();
        assert!(matches!(
            accounts.get_account(42).await,
            Err(LedgerError::AccountNotFound)
        ));
        assert!(matches!(
            accounts.list_transactions(42).await,
            Err(LedgerError::AccountNotFound)
        ));
    }

    #[tokio::test]
    async fn test_history_after_transfers() {
        let (accounts, store) = service();
        accounts.create_account(1, dec!(100)).await.unwrap();
        accounts.create_account(2, dec!(0)).await.unwrap();
        accounts.create_account(3, dec!(0)).await.unwrap();

        let coordinator = TransferCoordinator::new(store, Span::none());
        coordinator.create_transfer(1, 2, dec!(10)).await.unwrap();
        coordinator.create_transfer(1, 3, dec!(20)).await.unwrap();

        let history = accounts.list_transactions(1).await.unwrap();
        assert_eq!(history.len(), 2);
        assert!(history.iter().all(|t| t.involves(1)));

        let history = accounts.list_transactions(3).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].amount, dec!(20));
    }
}
