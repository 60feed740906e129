//! Ledger schema
//!
//! Constraints here back the domain rules: the store maps their violations
//! (unique, check, foreign key) onto ledger errors.
//!
//! Money columns are `NUMERIC(20, 8)`; `ledger::validation` rejects values
//! outside that precision before they reach the database.

pub const CREATE_ACCOUNTS: &str = r#"
CREATE TABLE IF NOT EXISTS accounts (
    account_id  BIGINT PRIMARY KEY,
    balance     NUMERIC(20, 8) NOT NULL CHECK (balance >= 0),
    created_at  TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at  TIMESTAMPTZ NOT NULL DEFAULT NOW()
)"#;

pub const CREATE_TRANSACTIONS: &str = r#"
CREATE TABLE IF NOT EXISTS transactions (
    id                      BIGSERIAL PRIMARY KEY,
    source_account_id       BIGINT NOT NULL REFERENCES accounts (account_id),
    destination_account_id  BIGINT NOT NULL REFERENCES accounts (account_id),
    amount                  NUMERIC(20, 8) NOT NULL CHECK (amount > 0),
    status                  VARCHAR(16) NOT NULL DEFAULT 'pending',
    created_at              TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    CONSTRAINT transactions_distinct_accounts
        CHECK (source_account_id <> destination_account_id)
)"#;

pub const CREATE_TRANSACTION_INDEXES: [&str; 2] = [
    "CREATE INDEX IF NOT EXISTS idx_transactions_source ON transactions (source_account_id, created_at DESC)",
    "CREATE INDEX IF NOT EXISTS idx_transactions_destination ON transactions (destination_account_id, created_at DESC)",
];

/// Statements in dependency order
pub fn statements() -> impl Iterator<Item = &'static str> {
    [CREATE_ACCOUNTS, CREATE_TRANSACTIONS]
        .into_iter()
        .chain(CREATE_TRANSACTION_INDEXES)
}

pub const TRUNCATE_ALL: &str = "TRUNCATE TABLE transactions, accounts RESTART IDENTITY CASCADE";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accounts_created_before_transactions() {
        let all: Vec<&str> = statements().collect();
        assert_eq!(all.len(), 4);
        assert!(all[0].contains("accounts ("));
        assert!(all[1].contains("REFERENCES accounts"));
    }

    #[test]
    fn test_constraints_present() {
        assert!(CREATE_ACCOUNTS.contains("CHECK (balance >= 0)"));
        assert!(CREATE_TRANSACTIONS.contains("CHECK (amount > 0)"));
    }
}
