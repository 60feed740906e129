//! Health check handler

use std::sync::Arc;

use axum::extract::State;

use super::super::state::AppState;
use super::super::types::{ApiError, ApiResult, HealthData, ok};
use crate::ledger::LedgerStore;

/// GET /health
///
/// - Healthy: 200 + {code: 0, data: {status, store, timestamp_ms}}
/// - Database unreachable: 503, no internal detail in the body
pub async fn health_check<S: LedgerStore>(
    State(state): State<Arc<AppState<S>>>,
) -> ApiResult<HealthData> {
    if let Some(db) = &state.pg_db
        && let Err(e) = db.health_check().await
    {
        tracing::error!(error = %e, "Health check: database unreachable");
        return ApiError::service_unavailable("unavailable").into_err();
    }

    ok(HealthData {
        status: "ok",
        store: state.store_name(),
        timestamp_ms: chrono::Utc::now().timestamp_millis(),
    })
}
