//! Transfer Coordinator
//!
//! Executes a transfer as one serializable unit of work against a
//! [`LedgerStore`]. The scope opened for a transfer is owned here for its
//! whole life: every error path rolls it back explicitly before the error is
//! returned, and a panic or a cancelled future drops it, which rolls it back
//! as well.
//!
//! Deadlines bound every call made before COMMIT. The commit itself is left
//! to the store, which checks the deadline and reports `Timeout` only when
//! nothing was applied; an acknowledged commit is never reported as failed.
//!
//! No automatic retry: a serialization conflict is reported as
//! `ConflictRetryable` and the caller decides whether to resubmit.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use tokio::time::Instant;
use tracing::{Span, debug, info, warn};

use super::state::{PhaseTrail, TransferPhase};
use crate::ledger::error::{LedgerError, LedgerResult};
use crate::ledger::models::{AccountId, Transaction};
use crate::ledger::store::LedgerStore;
use crate::ledger::validation::validate_transfer;

/// Upper bound for the rollback issued after a failure
const ROLLBACK_GRACE: Duration = Duration::from_secs(5);

/// A transfer to execute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferRequest {
    pub source_account_id: AccountId,
    pub destination_account_id: AccountId,
    pub amount: Decimal,
    /// The scope must reach COMMIT before this instant
    pub deadline: Option<Instant>,
}

impl TransferRequest {
    pub fn new(
        source_account_id: AccountId,
        destination_account_id: AccountId,
        amount: Decimal,
    ) -> Self {
        Self {
            source_account_id,
            destination_account_id,
            amount,
            deadline: None,
        }
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

/// Result of one transfer together with the phases it went through
#[derive(Debug)]
pub struct TransferReport {
    pub outcome: LedgerResult<Transaction>,
    pub trail: PhaseTrail,
}

impl TransferReport {
    pub fn into_result(self) -> LedgerResult<Transaction> {
        self.outcome
    }

    pub fn final_phase(&self) -> TransferPhase {
        self.trail.current()
    }
}

/// Transfer Coordinator - runs transfers against a ledger store
pub struct TransferCoordinator<S: LedgerStore> {
    store: Arc<S>,
    span: Span,
    default_timeout: Option<Duration>,
}

impl<S: LedgerStore> TransferCoordinator<S> {
    /// Create a coordinator logging under `span`.
    pub fn new(store: Arc<S>, span: Span) -> Self {
        Self {
            store,
            span,
            default_timeout: None,
        }
    }

    /// Deadline applied to requests that do not carry their own.
    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = Some(timeout);
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Move `amount` from `source` to `destination` atomically.
    pub async fn create_transfer(
        &self,
        source: AccountId,
        destination: AccountId,
        amount: Decimal,
    ) -> LedgerResult<Transaction> {
        self.execute(TransferRequest::new(source, destination, amount))
            .await
            .into_result()
    }

    /// Same as [`create_transfer`](Self::create_transfer) with an explicit deadline.
    pub async fn create_transfer_with_deadline(
        &self,
        source: AccountId,
        destination: AccountId,
        amount: Decimal,
        deadline: Instant,
    ) -> LedgerResult<Transaction> {
        self.execute(TransferRequest::new(source, destination, amount).with_deadline(deadline))
            .await
            .into_result()
    }

    /// Execute a transfer to a terminal phase.
    pub async fn execute(&self, req: TransferRequest) -> TransferReport {
        let mut trail = PhaseTrail::new();
        let deadline = req
            .deadline
            .or_else(|| self.default_timeout.map(|t| Instant::now() + t));

        debug!(
            parent: &self.span,
            source = req.source_account_id,
            destination = req.destination_account_id,
            amount = %req.amount,
            "Transfer initiated"
        );

        let outcome = self.run(&req, deadline, &mut trail).await;

        match &outcome {
            Ok(recorded) => {
                info!(
                    parent: &self.span,
                    transaction_id = recorded.id,
                    source = req.source_account_id,
                    destination = req.destination_account_id,
                    amount = %req.amount,
                    "Transfer committed"
                );
            }
            Err(e) => {
                let at = trail.current();
                self.transition(&mut trail, TransferPhase::Aborted);
                if e.is_validation() {
                    debug!(
                        parent: &self.span,
                        source = req.source_account_id,
                        destination = req.destination_account_id,
                        amount = %req.amount,
                        code = e.code(),
                        "Transfer rejected"
                    );
                } else {
                    warn!(
                        parent: &self.span,
                        source = req.source_account_id,
                        destination = req.destination_account_id,
                        amount = %req.amount,
                        aborted_at = %at,
                        code = e.code(),
                        error = %e,
                        "Transfer aborted"
                    );
                }
            }
        }

        TransferReport { outcome, trail }
    }

    async fn run(
        &self,
        req: &TransferRequest,
        deadline: Option<Instant>,
        trail: &mut PhaseTrail,
    ) -> LedgerResult<Transaction> {
        // 1. Validate: no I/O on failure
        validate_transfer(req.source_account_id, req.destination_account_id, req.amount)?;
        self.transition(trail, TransferPhase::Validated);

        // 2. Open the serializable scope
        let mut scope = bounded(deadline, self.store.begin_serializable(deadline)).await?;

        // 3-8. Reads and writes inside the scope
        let recorded = match self.apply(&mut scope, req, deadline, trail).await {
            Ok(recorded) => recorded,
            Err(e) => {
                self.release(scope).await;
                return Err(e);
            }
        };

        // 9. Commit. The store owns the deadline from here on.
        self.store.commit(scope).await?;
        self.transition(trail, TransferPhase::Committed);
        Ok(recorded)
    }

    async fn apply(
        &self,
        scope: &mut S::Scope,
        req: &TransferRequest,
        deadline: Option<Instant>,
        trail: &mut PhaseTrail,
    ) -> LedgerResult<Transaction> {
        let amount = req.amount;

        let mut source = bounded(
            deadline,
            self.store
                .get_account_for_update(scope, req.source_account_id),
        )
        .await
        .map_err(|e| match e {
            LedgerError::AccountNotFound => LedgerError::SourceAccountNotFound,
            other => other,
        })?;
        self.transition(trail, TransferPhase::SourceRead);

        if !source.has_sufficient_balance(amount) {
            debug!(
                parent: &self.span,
                account_id = source.account_id,
                balance = %source.balance,
                required = %amount,
                "Insufficient balance"
            );
            return Err(LedgerError::InsufficientBalance);
        }
        self.transition(trail, TransferPhase::BalanceChecked);

        let mut destination = bounded(
            deadline,
            self.store
                .get_account_for_update(scope, req.destination_account_id),
        )
        .await
        .map_err(|e| match e {
            LedgerError::AccountNotFound => LedgerError::DestinationAccountNotFound,
            other => other,
        })?;
        self.transition(trail, TransferPhase::DestRead);

        source.debit(amount)?;
        destination.credit(amount)?;
        self.transition(trail, TransferPhase::BalancesComputed);

        // Source before destination, always
        bounded(
            deadline,
            self.store
                .update_balance(scope, source.account_id, source.balance),
        )
        .await?;
        bounded(
            deadline,
            self.store
                .update_balance(scope, destination.account_id, destination.balance),
        )
        .await?;

        let mut transaction =
            Transaction::pending(req.source_account_id, req.destination_account_id, amount);
        transaction.mark_complete();
        let recorded = bounded(deadline, self.store.record_transfer(scope, &transaction)).await?;
        self.transition(trail, TransferPhase::Persisted);

        Ok(recorded)
    }

    /// Roll back after a failure. The original error is what the caller sees.
    async fn release(&self, scope: S::Scope) {
        match tokio::time::timeout(ROLLBACK_GRACE, self.store.rollback(scope)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                warn!(parent: &self.span, error = %e, "Rollback failed, scope discarded");
            }
            Err(_) => {
                warn!(parent: &self.span, "Rollback timed out, scope discarded");
            }
        }
    }

    fn transition(&self, trail: &mut PhaseTrail, next: TransferPhase) {
        let from = trail.current();
        if trail.advance(next) {
            debug!(parent: &self.span, from = %from, to = %next, "Transfer phase");
        } else {
            warn!(parent: &self.span, from = %from, to = %next, "Illegal transfer phase transition ignored");
        }
    }
}

/// Await a store call, bounded by the optional deadline.
async fn bounded<T, F>(deadline: Option<Instant>, fut: F) -> LedgerResult<T>
where
    F: Future<Output = LedgerResult<T>>,
{
    match deadline {
        Some(deadline) => tokio::time::timeout_at(deadline, fut)
            .await
            .unwrap_or_else(|_| Err(LedgerError::Timeout)),
        None => fut.await,
    }
}
