//! Transfer handlers

use std::sync::Arc;

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};

use super::super::state::AppState;
use super::super::types::{ApiError, ApiResult, CreateTransferRequest, TransactionData, created};
use crate::ledger::LedgerStore;

/// POST /transactions
///
/// A `409` with `CONFLICT_RETRYABLE` means the transfer lost a serialization
/// race and nothing was applied; the client may resubmit.
pub async fn create_transfer<S: LedgerStore>(
    State(state): State<Arc<AppState<S>>>,
    body: Result<Json<CreateTransferRequest>, JsonRejection>,
) -> ApiResult<TransactionData> {
    let Json(req) = body.map_err(|e| ApiError::bad_request(e.body_text()))?;

    let recorded = state
        .transfers
        .create_transfer(
            req.source_account_id,
            req.destination_account_id,
            req.amount.inner(),
        )
        .await?;
    created(recorded.into())
}
