//! In-memory Ledger Store
//!
//! Deterministic [`LedgerStore`] used to exercise the transfer coordinator
//! without a database. Serializable isolation is modelled optimistically:
//! a scope records the version of every account it reads or writes and
//! buffers its writes; `commit` validates those versions under the state
//! lock and aborts with `ConflictRetryable` if any account changed in the
//! meantime. Dropping a scope discards its write set. A scope whose
//! deadline has passed when `commit` starts reports `Timeout` and applies
//! nothing; once applied, a commit is reported as committed.
//!
//! Faults can be injected at named [`FailPoint`]s to drive failure paths.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use tokio::time::Instant;
use tracing::Span;

use super::LedgerStore;
use crate::ledger::error::{LedgerError, LedgerResult};
use crate::ledger::error_map::{IntegrityViolation, StoreOp, map_violation};
use crate::ledger::models::{Account, AccountId, Transaction, TransactionId};
use crate::ledger::validation::validate_balance;

/// Points at which a fault can be injected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
    Begin,
    ReadForUpdate,
    UpdateBalance,
    RecordTransfer,
    Commit,
    /// After the commit is applied, before it is acknowledged
    Acknowledge,
}

impl FailPoint {
    fn op(self) -> StoreOp {
        match self {
            FailPoint::Begin => StoreOp::Begin,
            FailPoint::ReadForUpdate => StoreOp::ReadForUpdate,
            FailPoint::UpdateBalance => StoreOp::UpdateBalance,
            FailPoint::RecordTransfer => StoreOp::RecordTransfer,
            FailPoint::Commit | FailPoint::Acknowledge => StoreOp::Commit,
        }
    }
}

/// Injected behavior, consumed the first time its point is reached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Opaque storage error
    Storage,
    /// Constraint violation, mapped like a real one
    Integrity(IntegrityViolation),
    /// Serialization failure reported by the scheduler
    SerializationConflict,
    /// Block for the given time before continuing normally
    Stall(Duration),
}

#[derive(Debug)]
struct AccountEntry {
    account: Account,
    version: u64,
}

#[derive(Debug, Default)]
struct LedgerState {
    accounts: BTreeMap<AccountId, AccountEntry>,
    transactions: Vec<Transaction>,
    last_transaction_id: TransactionId,
}

/// Open in-memory scope
#[derive(Debug)]
pub struct MemoryScope {
    id: u64,
    read_set: HashMap<AccountId, u64>,
    write_set: BTreeMap<AccountId, Decimal>,
    inserts: Vec<Transaction>,
    deadline: Option<Instant>,
}

struct Inner {
    state: Mutex<LedgerState>,
    faults: Mutex<HashMap<FailPoint, Fault>>,
    scope_seq: AtomicU64,
}

/// In-memory ledger store; clones share the same ledger
#[derive(Clone)]
pub struct InMemoryLedgerStore {
    inner: Arc<Inner>,
    span: Span,
}

impl Default for InMemoryLedgerStore {
    fn default() -> Self {
        Self::new(Span::none())
    }
}

impl InMemoryLedgerStore {
    pub fn new(span: Span) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(LedgerState::default()),
                faults: Mutex::new(HashMap::new()),
                scope_seq: AtomicU64::new(1),
            }),
            span,
        }
    }

    /// Arm a one-shot fault at `point`.
    pub fn inject(&self, point: FailPoint, fault: Fault) {
        if let Ok(mut faults) = self.inner.faults.lock() {
            faults.insert(point, fault);
        }
    }

    /// Sum of all committed balances
    pub fn total_balance(&self) -> LedgerResult<Decimal> {
        let state = self.state()?;
        Ok(state.accounts.values().map(|e| e.account.balance).sum())
    }

    /// Number of committed transaction records
    pub fn transaction_count(&self) -> LedgerResult<usize> {
        Ok(self.state()?.transactions.len())
    }

    fn state(&self) -> LedgerResult<MutexGuard<'_, LedgerState>> {
        self.inner
            .state
            .lock()
            .map_err(|_| LedgerError::storage("in-memory ledger state poisoned"))
    }

    fn take_fault(&self, point: FailPoint) -> LedgerResult<Option<Fault>> {
        let mut faults = self
            .inner
            .faults
            .lock()
            .map_err(|_| LedgerError::storage("fault table poisoned"))?;
        Ok(faults.remove(&point))
    }

    /// Validate the scope's read set and publish its writes.
    fn apply(&self, scope: MemoryScope) -> LedgerResult<()> {
        let mut state = self.state()?;
        for (account_id, seen) in &scope.read_set {
            let current = state.accounts.get(account_id).map(|e| e.version);
            if current != Some(*seen) {
                tracing::warn!(parent: &self.span, scope = scope.id, account_id = *account_id, "Serialization conflict on commit");
                return Err(LedgerError::ConflictRetryable);
            }
        }

        let now = Utc::now();
        for (account_id, balance) in &scope.write_set {
            let entry = state
                .accounts
                .get_mut(account_id)
                .ok_or(LedgerError::AccountNotFound)?;
            entry.account.balance = *balance;
            entry.account.updated_at = now;
            entry.version += 1;
        }
        state.transactions.extend(scope.inserts);

        tracing::debug!(parent: &self.span, scope = scope.id, writes = scope.write_set.len(), "Scope committed");
        Ok(())
    }

    /// Fire the fault armed at `point`, if any.
    async fn trip(&self, point: FailPoint) -> LedgerResult<()> {
        let Some(fault) = self.take_fault(point)? else {
            return Ok(());
        };

        tracing::debug!(parent: &self.span, point = ?point, fault = ?fault, "Injected fault");
        match fault {
            Fault::Storage => Err(LedgerError::storage(format!(
                "injected storage failure at {}",
                point.op()
            ))),
            Fault::Integrity(violation) => Err(map_violation(violation, point.op())
                .unwrap_or_else(|| {
                    LedgerError::storage(format!("injected {:?} violation", violation))
                })),
            Fault::SerializationConflict => Err(LedgerError::ConflictRetryable),
            Fault::Stall(duration) => {
                tokio::time::sleep(duration).await;
                Ok(())
            }
        }
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    type Scope = MemoryScope;

    fn name(&self) -> &'static str {
        "memory"
    }

    async fn create_account(
        &self,
        account_id: AccountId,
        initial_balance: Decimal,
    ) -> LedgerResult<Account> {
        validate_balance(initial_balance)?;

        let mut state = self.state()?;
        if state.accounts.contains_key(&account_id) {
            tracing::warn!(parent: &self.span, account_id, "Account already exists");
            return Err(map_violation(IntegrityViolation::Unique, StoreOp::CreateAccount)
                .unwrap_or(LedgerError::AccountAlreadyExists));
        }

        let account = Account::new(account_id, initial_balance);
        state.accounts.insert(
            account_id,
            AccountEntry {
                account: account.clone(),
                version: 0,
            },
        );
        tracing::info!(parent: &self.span, account_id, balance = %initial_balance, "Account created");
        Ok(account)
    }

    async fn get_account(&self, account_id: AccountId) -> LedgerResult<Account> {
        self.state()?
            .accounts
            .get(&account_id)
            .map(|e| e.account.clone())
            .ok_or(LedgerError::AccountNotFound)
    }

    async fn list_transactions(&self, account_id: AccountId) -> LedgerResult<Vec<Transaction>> {
        let state = self.state()?;
        let mut found: Vec<Transaction> = state
            .transactions
            .iter()
            .filter(|t| t.involves(account_id))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(found)
    }

    async fn begin_serializable(&self, deadline: Option<Instant>) -> LedgerResult<MemoryScope> {
        if deadline.is_some_and(|d| d <= Instant::now()) {
            return Err(LedgerError::Timeout);
        }
        self.trip(FailPoint::Begin).await?;

        let id = self.inner.scope_seq.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(parent: &self.span, scope = id, "Serializable scope opened");
        Ok(MemoryScope {
            id,
            read_set: HashMap::new(),
            write_set: BTreeMap::new(),
            inserts: Vec::new(),
            deadline,
        })
    }

    async fn commit(&self, scope: MemoryScope) -> LedgerResult<()> {
        self.trip(FailPoint::Commit).await?;

        if scope.deadline.is_some_and(|d| d <= Instant::now()) {
            tracing::debug!(parent: &self.span, scope = scope.id, "Scope deadline passed before commit");
            return Err(LedgerError::Timeout);
        }
        self.apply(scope)?;

        // Applied: a delayed acknowledgement cannot undo it
        self.trip(FailPoint::Acknowledge).await
    }

    async fn rollback(&self, scope: MemoryScope) -> LedgerResult<()> {
        tracing::debug!(parent: &self.span, scope = scope.id, "Scope rolled back");
        Ok(())
    }

    async fn get_account_for_update(
        &self,
        scope: &mut MemoryScope,
        account_id: AccountId,
    ) -> LedgerResult<Account> {
        self.trip(FailPoint::ReadForUpdate).await?;

        let state = self.state()?;
        let entry = state
            .accounts
            .get(&account_id)
            .ok_or(LedgerError::AccountNotFound)?;

        scope.read_set.entry(account_id).or_insert(entry.version);

        let mut account = entry.account.clone();
        if let Some(pending) = scope.write_set.get(&account_id) {
            account.balance = *pending;
        }
        Ok(account)
    }

    async fn update_balance(
        &self,
        scope: &mut MemoryScope,
        account_id: AccountId,
        new_balance: Decimal,
    ) -> LedgerResult<()> {
        self.trip(FailPoint::UpdateBalance).await?;
        validate_balance(new_balance)?;

        let state = self.state()?;
        let entry = state
            .accounts
            .get(&account_id)
            .ok_or(LedgerError::AccountNotFound)?;

        scope.read_set.entry(account_id).or_insert(entry.version);
        scope.write_set.insert(account_id, new_balance);
        Ok(())
    }

    async fn record_transfer(
        &self,
        scope: &mut MemoryScope,
        transaction: &Transaction,
    ) -> LedgerResult<Transaction> {
        self.trip(FailPoint::RecordTransfer).await?;
        transaction.validate()?;

        let mut state = self.state()?;
        let endpoints_exist = state
            .accounts
            .contains_key(&transaction.source_account_id)
            && state
                .accounts
                .contains_key(&transaction.destination_account_id);
        if !endpoints_exist {
            return Err(
                map_violation(IntegrityViolation::ForeignKey, StoreOp::RecordTransfer)
                    .unwrap_or(LedgerError::AccountNotFound),
            );
        }

        // Sequence values are consumed even if the scope later rolls back
        state.last_transaction_id += 1;
        let mut recorded = transaction.clone();
        recorded.id = state.last_transaction_id;
        recorded.created_at = Utc::now();

        scope.inserts.push(recorded.clone());
        Ok(recorded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    async fn seeded() -> InMemoryLedgerStore {
        let store = InMemoryLedgerStore::default();
        store.create_account(1, dec!(100.00)).await.unwrap();
        store.create_account(2, dec!(0.00)).await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_duplicate_account_keeps_original() {
        let store = seeded().await;
        let err = store.create_account(1, dec!(5)).await.unwrap_err();
        assert!(matches!(err, LedgerError::AccountAlreadyExists));
        assert_eq!(store.get_account(1).await.unwrap().balance, dec!(100.00));
    }

    #[tokio::test]
    async fn test_negative_initial_balance() {
        let store = InMemoryLedgerStore::default();
        let err = store.create_account(3, dec!(-1)).await.unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAmount));
        assert!(matches!(
            store.get_account(3).await,
            Err(LedgerError::AccountNotFound)
        ));
    }

    #[tokio::test]
    async fn test_writes_invisible_until_commit() {
        let store = seeded().await;
        let mut scope = store.begin_serializable(None).await.unwrap();
        store.update_balance(&mut scope, 1, dec!(1)).await.unwrap();

        // Read-your-writes inside the scope only
        let inside = store.get_account_for_update(&mut scope, 1).await.unwrap();
        assert_eq!(inside.balance, dec!(1));
        assert_eq!(store.get_account(1).await.unwrap().balance, dec!(100.00));

        store.commit(scope).await.unwrap();
        assert_eq!(store.get_account(1).await.unwrap().balance, dec!(1));
    }

    #[tokio::test]
    async fn test_dropped_scope_discards_writes() {
        let store = seeded().await;
        {
            let mut scope = store.begin_serializable(None).await.unwrap();
            store.update_balance(&mut scope, 2, dec!(999)).await.unwrap();
        }
        assert_eq!(store.get_account(2).await.unwrap().balance, dec!(0.00));
    }

    #[tokio::test]
    async fn test_interleaved_scopes_conflict() {
        let store = seeded().await;

        let mut a = store.begin_serializable(None).await.unwrap();
        let mut b = store.begin_serializable(None).await.unwrap();
        store.get_account_for_update(&mut a, 1).await.unwrap();
        store.get_account_for_update(&mut b, 1).await.unwrap();

        store.update_balance(&mut a, 1, dec!(40)).await.unwrap();
        store.update_balance(&mut b, 1, dec!(40)).await.unwrap();

        store.commit(a).await.unwrap();
        let err = store.commit(b).await.unwrap_err();
        assert!(matches!(err, LedgerError::ConflictRetryable));
        assert_eq!(store.get_account(1).await.unwrap().balance, dec!(40));
    }

    #[tokio::test]
    async fn test_update_rejects_negative_and_missing() {
        let store = seeded().await;
        let mut scope = store.begin_serializable(None).await.unwrap();
        assert!(matches!(
            store.update_balance(&mut scope, 1, dec!(-0.01)).await,
            Err(LedgerError::InvalidAmount)
        ));
        assert!(matches!(
            store.update_balance(&mut scope, 42, dec!(1)).await,
            Err(LedgerError::AccountNotFound)
        ));
    }

    #[tokio::test]
    async fn test_record_transfer_foreign_key() {
        let store = seeded().await;
        let mut scope = store.begin_serializable(None).await.unwrap();
        let mut tx = Transaction::pending(1, 77, dec!(1));
        tx.mark_complete();
        assert!(matches!(
            store.record_transfer(&mut scope, &tx).await,
            Err(LedgerError::AccountNotFound)
        ));
    }

    #[tokio::test]
    async fn test_excess_precision_rejected() {
        let store = seeded().await;
        assert!(matches!(
            store.create_account(3, dec!(0.123456789)).await,
            Err(LedgerError::InvalidAmount)
        ));

        let mut scope = store.begin_serializable(None).await.unwrap();
        assert!(matches!(
            store.update_balance(&mut scope, 2, dec!(1000000000000)).await,
            Err(LedgerError::InvalidAmount)
        ));
    }

    #[tokio::test]
    async fn test_commit_after_deadline_applies_nothing() {
        let store = seeded().await;
        let deadline = Instant::now() + Duration::from_millis(20);
        let mut scope = store.begin_serializable(Some(deadline)).await.unwrap();
        store.update_balance(&mut scope, 1, dec!(50)).await.unwrap();

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(matches!(
            store.commit(scope).await,
            Err(LedgerError::Timeout)
        ));
        assert_eq!(store.get_account(1).await.unwrap().balance, dec!(100.00));
    }

    #[tokio::test]
    async fn test_slow_acknowledgement_still_commits() {
        let store = seeded().await;
        store.inject(FailPoint::Acknowledge, Fault::Stall(Duration::from_millis(60)));

        let deadline = Instant::now() + Duration::from_millis(20);
        let mut scope = store.begin_serializable(Some(deadline)).await.unwrap();
        store.update_balance(&mut scope, 1, dec!(50)).await.unwrap();
        store.commit(scope).await.unwrap();
        assert_eq!(store.get_account(1).await.unwrap().balance, dec!(50));
    }

    #[tokio::test]
    async fn test_injected_fault_is_one_shot() {
        let store = seeded().await;
        store.inject(FailPoint::Begin, Fault::Storage);

        assert!(matches!(
            store.begin_serializable(None).await,
            Err(LedgerError::StorageFailure(_))
        ));
        assert!(store.begin_serializable(None).await.is_ok());
    }

    #[tokio::test]
    async fn test_list_transactions_newest_first() {
        let store = seeded().await;
        for amount in [dec!(1), dec!(2)] {
            let mut scope = store.begin_serializable(None).await.unwrap();
            let mut tx = Transaction::pending(1, 2, amount);
            tx.mark_complete();
            store.record_transfer(&mut scope, &tx).await.unwrap();
            store.commit(scope).await.unwrap();
        }

        let listed = store.list_transactions(2).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed[0].id > listed[1].id);
        assert!(store.list_transactions(3).await.unwrap().is_empty());
    }
}
