//! Form state - raw field input, validation and submission
//!
//! Forms hold exactly what the user typed. Submitting validates the fields,
//! hands typed values to the ledger client and records the outcome. Fields
//! are cleared only when the submission succeeds; on failure they are kept so
//! the user can correct them, and the error is attached to the form.

use num_bigint::BigUint;
use num_traits::Zero;

use crate::domain::amount::parse_amount;
use crate::domain::result::{Error, Result};
use crate::domain::{Account, SignUpRequest, TransferRequest};
use crate::services::ledger::LedgerClient;

/// Outcome of the last submission, shown next to the form
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FormStatus {
    #[default]
    Idle,
    Succeeded(String),
    Failed(String),
}

impl FormStatus {
    pub fn message(&self) -> Option<&str> {
        match self {
            FormStatus::Idle => None,
            FormStatus::Succeeded(msg) | FormStatus::Failed(msg) => Some(msg),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, FormStatus::Failed(_))
    }
}

fn failure_message(error: &Error) -> String {
    match error {
        Error::Connection(_) => "Could not reach the bank. Please try again.".to_string(),
        other => other.to_string(),
    }
}

/// Sign-up form
#[derive(Debug, Clone, Default)]
pub struct SignUpForm {
    pub account_id: String,
    pub initial_deposit: String,
    status: FormStatus,
}

impl SignUpForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_account_id(&mut self, value: impl Into<String>) {
        self.account_id = value.into();
    }

    pub fn set_initial_deposit(&mut self, value: impl Into<String>) {
        self.initial_deposit = value.into();
    }

    pub fn status(&self) -> &FormStatus {
        &self.status
    }

    /// Check the fields are well-formed and coerce them
    pub fn validate(&self) -> Result<SignUpRequest> {
        let deposit = parse_amount(&self.initial_deposit)
            .map_err(|_| Error::invalid_input("balance must be a non-negative whole number"))?;
        SignUpRequest::new(&self.account_id, deposit)
    }

    pub fn clear(&mut self) {
        self.account_id.clear();
        self.initial_deposit.clear();
    }

    pub async fn submit(&mut self, client: &LedgerClient) -> Result<Account> {
        let result = match self.validate() {
            Ok(request) => {
                client
                    .sign_up(&request.account_id, request.initial_deposit)
                    .await
            }
            Err(e) => Err(e),
        };

        match &result {
            Ok(account) => {
                self.clear();
                self.status =
                    FormStatus::Succeeded(format!("Account '{}' opened", account.account_id));
            }
            Err(e) => self.status = FormStatus::Failed(failure_message(e)),
        }
        result
    }
}

/// Transfer form
#[derive(Debug, Clone, Default)]
pub struct TransferForm {
    pub from_account_id: String,
    pub to_account_id: String,
    pub amount: String,
    status: FormStatus,
}

impl TransferForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_from_account_id(&mut self, value: impl Into<String>) {
        self.from_account_id = value.into();
    }

    pub fn set_to_account_id(&mut self, value: impl Into<String>) {
        self.to_account_id = value.into();
    }

    pub fn set_amount(&mut self, value: impl Into<String>) {
        self.amount = value.into();
    }

    pub fn status(&self) -> &FormStatus {
        &self.status
    }

    /// Choices for the from/to pickers
    pub fn account_options(client: &LedgerClient) -> Vec<String> {
        client.account_ids()
    }

    pub fn validate(&self) -> Result<TransferRequest> {
        let amount: BigUint = parse_amount(&self.amount)
            .map_err(|_| Error::invalid_input("amount must be a positive whole number"))?;
        if amount.is_zero() {
            return Err(Error::invalid_input("amount must be a positive whole number"));
        }
        TransferRequest::new(&self.from_account_id, &self.to_account_id, amount)
    }

    pub fn clear(&mut self) {
        self.from_account_id.clear();
        self.to_account_id.clear();
        self.amount.clear();
    }

    pub async fn submit(&mut self, client: &LedgerClient) -> Result<()> {
        let result = match self.validate() {
            Ok(request) => {
                client
                    .transfer(
                        &request.from_account_id,
                        &request.to_account_id,
                        request.amount,
                    )
                    .await
            }
            Err(e) => Err(e),
        };

        match &result {
            Ok(()) => {
                self.status = FormStatus::Succeeded(format!(
                    "Transferred {} from '{}' to '{}'",
                    self.amount.trim(),
                    self.from_account_id.trim(),
                    self.to_account_id.trim()
                ));
                self.clear();
            }
            Err(e) => self.status = FormStatus::Failed(failure_message(e)),
        }
        result
    }
}
