//! Account handlers

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection, rejection::PathRejection},
};

use super::super::state::AppState;
use super::super::types::{
    AccountData, ApiError, ApiResult, CreateAccountRequest, TransactionData, created_empty, ok,
};
use crate::ledger::{AccountId, LedgerStore};

/// POST /accounts
pub async fn create_account<S: LedgerStore>(
    State(state): State<Arc<AppState<S>>>,
    body: Result<Json<CreateAccountRequest>, JsonRejection>,
) -> ApiResult<()> {
    let Json(req) = body.map_err(|e| ApiError::bad_request(e.body_text()))?;

    state
        .accounts
        .create_account(req.account_id, req.initial_balance.inner())
        .await?;
    created_empty()
}

/// GET /accounts/{account_id}
pub async fn get_account<S: LedgerStore>(
    State(state): State<Arc<AppState<S>>>,
    account_id: Result<Path<AccountId>, PathRejection>,
) -> ApiResult<AccountData> {
    let Path(account_id) = account_id.map_err(|e| ApiError::bad_request(e.body_text()))?;

    let account = state.accounts.get_account(account_id).await?;
    ok(account.into())
}

/// GET /accounts/{account_id}/transactions
pub async fn list_transactions<S: LedgerStore>(
    State(state): State<Arc<AppState<S>>>,
    account_id: Result<Path<AccountId>, PathRejection>,
) -> ApiResult<Vec<TransactionData>> {
    let Path(account_id) = account_id.map_err(|e| ApiError::bad_request(e.body_text()))?;

    let history = state.accounts.list_transactions(account_id).await?;
    ok(history.into_iter().map(TransactionData::from).collect())
}
