//! Storage error mapping
//!
//! Both store variants report integrity failures as an [`IntegrityViolation`]
//! and route them through [`map_violation`], so a duplicate account or a
//! vanished transfer endpoint yields the same domain error regardless of the
//! backing store. PostgreSQL errors are classified by SQLSTATE.

use std::fmt;

use sqlx::error::ErrorKind;

use super::error::LedgerError;

/// Integrity constraint classes enforced at the storage boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegrityViolation {
    /// Primary key / unique index (duplicate account id)
    Unique,
    /// CHECK constraint (negative balance, non-positive amount, same endpoints)
    Check,
    /// Foreign key (transfer references a missing account)
    ForeignKey,
}

/// Store operation during which a failure was observed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    CreateAccount,
    GetAccount,
    ListTransactions,
    Begin,
    ReadForUpdate,
    UpdateBalance,
    RecordTransfer,
    Commit,
    Rollback,
}

impl StoreOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreOp::CreateAccount => "create_account",
            StoreOp::GetAccount => "get_account",
            StoreOp::ListTransactions => "list_transactions",
            StoreOp::Begin => "begin",
            StoreOp::ReadForUpdate => "get_account_for_update",
            StoreOp::UpdateBalance => "update_balance",
            StoreOp::RecordTransfer => "record_transfer",
            StoreOp::Commit => "commit",
            StoreOp::Rollback => "rollback",
        }
    }
}

impl fmt::Display for StoreOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classified low-level failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreFailure {
    Integrity(IntegrityViolation),
    SerializationConflict,
    /// Value exceeds the column's precision (balance overflow)
    OutOfRange,
    Other,
}

// PostgreSQL SQLSTATE codes
const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";
const CHECK_VIOLATION: &str = "23514";
const SERIALIZATION_FAILURE: &str = "40001";
const DEADLOCK_DETECTED: &str = "40P01";
const QUERY_CANCELED: &str = "57014";
const NUMERIC_VALUE_OUT_OF_RANGE: &str = "22003";

/// Classify a PostgreSQL SQLSTATE code.
pub fn classify_sqlstate(code: &str) -> StoreFailure {
    match code {
        UNIQUE_VIOLATION => StoreFailure::Integrity(IntegrityViolation::Unique),
        FOREIGN_KEY_VIOLATION => StoreFailure::Integrity(IntegrityViolation::ForeignKey),
        CHECK_VIOLATION => StoreFailure::Integrity(IntegrityViolation::Check),
        SERIALIZATION_FAILURE | DEADLOCK_DETECTED => StoreFailure::SerializationConflict,
        NUMERIC_VALUE_OUT_OF_RANGE => StoreFailure::OutOfRange,
        _ => StoreFailure::Other,
    }
}

fn classify_kind(kind: ErrorKind) -> StoreFailure {
    match kind {
        ErrorKind::UniqueViolation => StoreFailure::Integrity(IntegrityViolation::Unique),
        ErrorKind::ForeignKeyViolation => StoreFailure::Integrity(IntegrityViolation::ForeignKey),
        ErrorKind::CheckViolation => StoreFailure::Integrity(IntegrityViolation::Check),
        _ => StoreFailure::Other,
    }
}

/// Translate an integrity violation observed during `op` into a domain error.
///
/// Returns `None` when the violation has no domain meaning for that
/// operation (the caller then reports a `StorageFailure`).
pub fn map_violation(violation: IntegrityViolation, op: StoreOp) -> Option<LedgerError> {
    match (violation, op) {
        (IntegrityViolation::Unique, StoreOp::CreateAccount) => {
            Some(LedgerError::AccountAlreadyExists)
        }
        (IntegrityViolation::Check, _) => Some(LedgerError::InvalidAmount),
        (IntegrityViolation::ForeignKey, StoreOp::RecordTransfer) => {
            Some(LedgerError::AccountNotFound)
        }
        _ => None,
    }
}

/// Map a `sqlx` error raised during `op` into the domain taxonomy.
pub fn map_sqlx_error(err: sqlx::Error, op: StoreOp) -> LedgerError {
    let failure = match &err {
        sqlx::Error::Database(db_err) => match db_err.code().as_deref() {
            // statement_timeout fired inside the scope
            Some(QUERY_CANCELED) => return LedgerError::Timeout,
            Some(code) => match classify_sqlstate(code) {
                StoreFailure::Other => classify_kind(db_err.kind()),
                classified => classified,
            },
            None => classify_kind(db_err.kind()),
        },
        _ => StoreFailure::Other,
    };

    match failure {
        StoreFailure::SerializationConflict => LedgerError::ConflictRetryable,
        StoreFailure::OutOfRange => LedgerError::InvalidAmount,
        StoreFailure::Integrity(violation) => {
            map_violation(violation, op).unwrap_or_else(|| LedgerError::storage(err))
        }
        StoreFailure::Other => LedgerError::storage(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_sqlstate() {
        assert_eq!(
            classify_sqlstate("23505"),
            StoreFailure::Integrity(IntegrityViolation::Unique)
        );
        assert_eq!(
            classify_sqlstate("23503"),
            StoreFailure::Integrity(IntegrityViolation::ForeignKey)
        );
        assert_eq!(
            classify_sqlstate("23514"),
            StoreFailure::Integrity(IntegrityViolation::Check)
        );
        assert_eq!(classify_sqlstate("40001"), StoreFailure::SerializationConflict);
        assert_eq!(classify_sqlstate("40P01"), StoreFailure::SerializationConflict);
        assert_eq!(classify_sqlstate("22003"), StoreFailure::OutOfRange);
        assert_eq!(classify_sqlstate("42P01"), StoreFailure::Other);
    }

    #[test]
    fn test_unique_only_meaningful_on_create() {
        assert!(matches!(
            map_violation(IntegrityViolation::Unique, StoreOp::CreateAccount),
            Some(LedgerError::AccountAlreadyExists)
        ));
        assert!(map_violation(IntegrityViolation::Unique, StoreOp::RecordTransfer).is_none());
    }

    #[test]
    fn test_check_maps_to_invalid_amount() {
        for op in [
            StoreOp::CreateAccount,
            StoreOp::UpdateBalance,
            StoreOp::RecordTransfer,
        ] {
            assert!(matches!(
                map_violation(IntegrityViolation::Check, op),
                Some(LedgerError::InvalidAmount)
            ));
        }
    }

    #[test]
    fn test_foreign_key_on_insert_is_account_not_found() {
        assert!(matches!(
            map_violation(IntegrityViolation::ForeignKey, StoreOp::RecordTransfer),
            Some(LedgerError::AccountNotFound)
        ));
        assert!(map_violation(IntegrityViolation::ForeignKey, StoreOp::UpdateBalance).is_none());
    }

    #[test]
    fn test_non_database_errors_are_opaque() {
        let err = map_sqlx_error(sqlx::Error::PoolTimedOut, StoreOp::Begin);
        assert!(matches!(err, LedgerError::StorageFailure(_)));
        assert_eq!(err.to_string(), "Storage failure");

        let err = map_sqlx_error(sqlx::Error::RowNotFound, StoreOp::GetAccount);
        assert_eq!(err.code(), "STORAGE_FAILURE");
    }

    #[test]
    fn test_store_op_display() {
        assert_eq!(StoreOp::ReadForUpdate.to_string(), "get_account_for_update");
        assert_eq!(StoreOp::Commit.to_string(), "commit");
    }
}
