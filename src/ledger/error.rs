//! Ledger Error Types
//!
//! Domain error taxonomy shared by the stores, the transfer coordinator and
//! the HTTP gateway.

use thiserror::Error;

type BoxedCause = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Ledger domain errors
///
/// `StorageFailure` keeps the low-level cause as its `source()` for logging
/// only; its `Display` never includes store-specific detail.
#[derive(Error, Debug)]
pub enum LedgerError {
    // === Validation Errors ===
    #[error("Invalid amount: must be greater than zero")]
    InvalidAmount,

    #[error("Source and destination accounts must be different")]
    SameAccount,

    #[error("Invalid account id: must be a positive integer")]
    InvalidAccountId,

    // === Account Errors ===
    #[error("Account not found")]
    AccountNotFound,

    #[error("Source account not found")]
    SourceAccountNotFound,

    #[error("Destination account not found")]
    DestinationAccountNotFound,

    #[error("Account already exists")]
    AccountAlreadyExists,

    #[error("Insufficient balance")]
    InsufficientBalance,

    // === Concurrency Errors ===
    #[error("Transfer conflicted with a concurrent transfer, retry")]
    ConflictRetryable,

    #[error("Operation timed out")]
    Timeout,

    // === System Errors ===
    #[error("Storage failure")]
    StorageFailure(#[source] BoxedCause),
}

impl LedgerError {
    /// Wrap any low-level failure as an opaque `StorageFailure`.
    pub fn storage(cause: impl Into<BoxedCause>) -> Self {
        LedgerError::StorageFailure(cause.into())
    }

    /// Get the error code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            LedgerError::InvalidAmount => "INVALID_AMOUNT",
            LedgerError::SameAccount => "SAME_ACCOUNT",
            LedgerError::InvalidAccountId => "INVALID_ACCOUNT_ID",
            LedgerError::AccountNotFound => "ACCOUNT_NOT_FOUND",
            LedgerError::SourceAccountNotFound => "SOURCE_ACCOUNT_NOT_FOUND",
            LedgerError::DestinationAccountNotFound => "DESTINATION_ACCOUNT_NOT_FOUND",
            LedgerError::AccountAlreadyExists => "ACCOUNT_ALREADY_EXISTS",
            LedgerError::InsufficientBalance => "INSUFFICIENT_BALANCE",
            LedgerError::ConflictRetryable => "CONFLICT_RETRYABLE",
            LedgerError::Timeout => "TIMEOUT",
            LedgerError::StorageFailure(_) => "STORAGE_FAILURE",
        }
    }

    /// Get HTTP status code suggestion
    pub fn http_status(&self) -> u16 {
        match self {
            LedgerError::InvalidAmount
            | LedgerError::SameAccount
            | LedgerError::InvalidAccountId => 400,
            LedgerError::AccountNotFound
            | LedgerError::SourceAccountNotFound
            | LedgerError::DestinationAccountNotFound => 404,
            LedgerError::AccountAlreadyExists | LedgerError::ConflictRetryable => 409,
            LedgerError::InsufficientBalance => 422,
            LedgerError::Timeout => 504,
            LedgerError::StorageFailure(_) => 500,
        }
    }

    /// Only serialization conflicts may succeed when resubmitted unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LedgerError::ConflictRetryable)
    }

    /// Validation failures are raised before any storage access.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            LedgerError::InvalidAmount | LedgerError::SameAccount | LedgerError::InvalidAccountId
        )
    }
}

/// Convenience alias used throughout the ledger
pub type LedgerResult<T> = Result<T, LedgerError>;
