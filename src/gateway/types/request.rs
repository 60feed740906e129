//! Request bodies

use serde::Deserialize;

use super::money::StrictDecimal;
use crate::ledger::AccountId;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateAccountRequest {
    pub account_id: AccountId,
    pub initial_balance: StrictDecimal,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateTransferRequest {
    pub source_account_id: AccountId,
    pub destination_account_id: AccountId,
    pub amount: StrictDecimal,
}
