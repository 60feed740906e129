//! Request validation
//!
//! Pure checks run before any storage access.

use rust_decimal::Decimal;

use super::error::LedgerError;
use super::models::AccountId;

/// Validate a transfer request: `amount > 0`, then `source != destination`.
pub fn validate_transfer(
    source: AccountId,
    destination: AccountId,
    amount: Decimal,
) -> Result<(), LedgerError> {
    validate_amount(amount)?;
    if source == destination {
        return Err(LedgerError::SameAccount);
    }
    Ok(())
}

/// Decimal places the ledger stores exactly (`NUMERIC(20, 8)`)
pub const MONEY_SCALE: u32 = 8;

/// Integer digits the ledger stores (`NUMERIC(20, 8)`)
pub const MONEY_INTEGER_DIGITS: u32 = 12;

/// Transfer amounts must be strictly positive and representable.
pub fn validate_amount(amount: Decimal) -> Result<(), LedgerError> {
    if amount <= Decimal::ZERO {
        return Err(LedgerError::InvalidAmount);
    }
    validate_precision(amount)
}

/// Account ids are positive integers.
pub fn validate_account_id(account_id: AccountId) -> Result<(), LedgerError> {
    if account_id <= 0 {
        return Err(LedgerError::InvalidAccountId);
    }
    Ok(())
}

/// Initial balances (and any balance written back) may be zero but never negative.
pub fn validate_balance(balance: Decimal) -> Result<(), LedgerError> {
    if balance.is_sign_negative() && !balance.is_zero() {
        return Err(LedgerError::InvalidAmount);
    }
    validate_precision(balance)
}

/// Reject values the store would round or overflow. Trailing zeros don't count.
pub fn validate_precision(value: Decimal) -> Result<(), LedgerError> {
    if value.normalize().scale() > MONEY_SCALE {
        return Err(LedgerError::InvalidAmount);
    }
    let limit = Decimal::from(10u64.pow(MONEY_INTEGER_DIGITS));
    if value.abs() >= limit {
        return Err(LedgerError::InvalidAmount);
    }
    Ok(())
}
