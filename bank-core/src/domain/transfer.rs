//! Transfer request domain model

use num_bigint::BigUint;
use num_traits::Zero;
use serde::{Deserialize, Serialize};

use super::account::Account;
use super::amount;
use super::result::{Error, Result};

/// A single fund transfer between two existing accounts
///
/// Only exists for the duration of one submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    pub from_account_id: String,
    pub to_account_id: String,
    #[serde(with = "amount")]
    pub amount: BigUint,
}

impl TransferRequest {
    /// Build a validated transfer request
    ///
    /// Existence of the accounts and sufficiency of funds are left to the
    /// remote ledger.
    pub fn new(from_account_id: &str, to_account_id: &str, amount: BigUint) -> Result<Self> {
        let request = Self {
            from_account_id: Account::normalize_id(from_account_id),
            to_account_id: Account::normalize_id(to_account_id),
            amount,
        };
        request.validate()?;
        Ok(request)
    }

    pub fn validate(&self) -> Result<()> {
        Account::validate_id(&self.from_account_id)?;
        Account::validate_id(&self.to_account_id)?;
        if self.from_account_id == self.to_account_id {
            return Err(Error::invalid_input(
                "cannot transfer from an account to itself",
            ));
        }
        if self.amount.is_zero() {
            return Err(Error::invalid_input("transfer amount must be positive"));
        }
        Ok(())
    }
}
