//! HTTP handlers, generic over the ledger store

pub mod account;
pub mod health;
pub mod transfer;

pub use account::{create_account, get_account, list_transactions};
pub use health::health_check;
pub use transfer::create_transfer;
