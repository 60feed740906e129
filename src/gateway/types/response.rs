//! API response wrapper, error codes and DTOs
//!
//! - `ApiResponse<T>`: unified response wrapper
//! - `ApiError`: error half of every handler result
//! - `error_codes`: numeric codes carried in `ApiResponse::code`

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::ledger::{Account, AccountId, LedgerError, Transaction, TransactionId};

// ============================================================================
// Unified API Response Format
// ============================================================================

/// Unified API response wrapper
///
/// - code: 0 = success, non-zero = error code
/// - msg: short message description
/// - data: payload, omitted on errors and on empty successes
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub code: i32,
    pub msg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            code: error_codes::SUCCESS,
            msg: "ok".to_string(),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    pub fn empty() -> Self {
        Self {
            code: error_codes::SUCCESS,
            msg: "ok".to_string(),
            data: None,
        }
    }

    pub fn error(code: i32, msg: impl Into<String>) -> Self {
        Self {
            code,
            msg: msg.into(),
            data: None,
        }
    }
}

pub type ApiResult<T> = Result<(StatusCode, Json<ApiResponse<T>>), ApiError>;

pub fn ok<T>(data: T) -> ApiResult<T> {
    Ok((StatusCode::OK, Json(ApiResponse::success(data))))
}

pub fn created<T>(data: T) -> ApiResult<T> {
    Ok((StatusCode::CREATED, Json(ApiResponse::success(data))))
}

pub fn created_empty() -> ApiResult<()> {
    Ok((StatusCode::CREATED, Json(ApiResponse::empty())))
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: i32,
    pub msg: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: i32, msg: impl Into<String>) -> Self {
        Self {
            status,
            code,
            msg: msg.into(),
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, error_codes::INVALID_PARAMETER, msg)
    }

    pub fn service_unavailable(msg: impl Into<String>) -> Self {
        Self::new(
            StatusCode::SERVICE_UNAVAILABLE,
            error_codes::SERVICE_UNAVAILABLE,
            msg,
        )
    }

    pub fn into_err<T>(self) -> Result<T, Self> {
        Err(self)
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        let status =
            StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let code = match &err {
            LedgerError::InvalidAmount
            | LedgerError::SameAccount
            | LedgerError::InvalidAccountId => error_codes::INVALID_PARAMETER,
            LedgerError::InsufficientBalance => error_codes::INSUFFICIENT_BALANCE,
            LedgerError::AccountNotFound => error_codes::ACCOUNT_NOT_FOUND,
            LedgerError::SourceAccountNotFound => error_codes::SOURCE_ACCOUNT_NOT_FOUND,
            LedgerError::DestinationAccountNotFound => error_codes::DESTINATION_ACCOUNT_NOT_FOUND,
            LedgerError::AccountAlreadyExists => error_codes::ACCOUNT_ALREADY_EXISTS,
            LedgerError::ConflictRetryable => error_codes::CONFLICT_RETRYABLE,
            LedgerError::Timeout => error_codes::TIMEOUT,
            LedgerError::StorageFailure(_) => error_codes::INTERNAL_ERROR,
        };
        // Display never carries store detail
        Self::new(status, code, err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ApiResponse::error(self.code, self.msg))).into_response()
    }
}

// ============================================================================
// Response DTOs
// ============================================================================

#[derive(Debug, Serialize)]
pub struct AccountData {
    pub account_id: AccountId,
    pub balance: Decimal,
}

impl From<Account> for AccountData {
    fn from(account: Account) -> Self {
        Self {
            account_id: account.account_id,
            balance: account.balance,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TransactionData {
    pub id: TransactionId,
    pub source_account_id: AccountId,
    pub destination_account_id: AccountId,
    pub amount: Decimal,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl From<Transaction> for TransactionData {
    fn from(tx: Transaction) -> Self {
        Self {
            id: tx.id,
            source_account_id: tx.source_account_id,
            destination_account_id: tx.destination_account_id,
            amount: tx.amount,
            status: tx.status.as_str().to_string(),
            created_at: tx.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthData {
    pub status: &'static str,
    pub store: &'static str,
    pub timestamp_ms: i64,
}

// ============================================================================
// Error Codes
// ============================================================================

pub mod error_codes {
    pub const SUCCESS: i32 = 0;

    // Client errors (1xxx)
    pub const INVALID_PARAMETER: i32 = 1001;
    pub const INSUFFICIENT_BALANCE: i32 = 1002;

    // Resource errors (4xxx)
    pub const ACCOUNT_NOT_FOUND: i32 = 4001;
    pub const SOURCE_ACCOUNT_NOT_FOUND: i32 = 4002;
    pub const DESTINATION_ACCOUNT_NOT_FOUND: i32 = 4003;
    pub const ACCOUNT_ALREADY_EXISTS: i32 = 4091;
    pub const CONFLICT_RETRYABLE: i32 = 4092;

    // Server errors (5xxx)
    pub const INTERNAL_ERROR: i32 = 5000;
    pub const SERVICE_UNAVAILABLE: i32 = 5001;
    pub const TIMEOUT: i32 = 5004;
}
