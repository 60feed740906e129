//! Account management module
//!
//! Standalone account operations: creation, balance lookup and history.
//! These run outside any transfer scope at the store's default isolation.

pub mod service;

pub use service::AccountService;
