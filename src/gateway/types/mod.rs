//! Gateway types module
//!
//! ## Input Types
//! - [`StrictDecimal`]: format-validated decimal for API input
//! - [`CreateAccountRequest`], [`CreateTransferRequest`]: request bodies
//!
//! ## Output Types
//! - [`ApiResponse<T>`]: unified API response wrapper
//! - [`AccountData`], [`TransactionData`]: response payloads

pub mod money;
pub mod request;
pub mod response;

pub use money::StrictDecimal;
pub use request::{CreateAccountRequest, CreateTransferRequest};
pub use response::{
    AccountData, ApiError, ApiResponse, ApiResult, HealthData, TransactionData, created,
    created_empty, error_codes, ok,
};
