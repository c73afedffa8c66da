//! Account domain model

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

use super::amount;
use super::result::{Error, Result};

/// A named balance record in the ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub account_id: String,
    #[serde(with = "amount")]
    pub balance: BigUint,
}

impl Account {
    pub fn new(account_id: impl Into<String>, balance: BigUint) -> Self {
        Self {
            account_id: account_id.into(),
            balance,
        }
    }

    /// Normalize an account id as typed by the user
    pub fn normalize_id(account_id: &str) -> String {
        account_id.trim().to_string()
    }

    /// Validate an account id
    pub fn validate_id(account_id: &str) -> Result<()> {
        if account_id.trim().is_empty() {
            return Err(Error::invalid_input("account id cannot be empty"));
        }
        Ok(())
    }
}

/// Request to open a new account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpRequest {
    pub account_id: String,
    #[serde(with = "amount")]
    pub initial_deposit: BigUint,
}

impl SignUpRequest {
    pub fn new(account_id: &str, initial_deposit: BigUint) -> Result<Self> {
        Account::validate_id(account_id)?;
        Ok(Self {
            account_id: Account::normalize_id(account_id),
            initial_deposit,
        })
    }
}
