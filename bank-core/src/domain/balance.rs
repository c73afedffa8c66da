//! Balance snapshot domain model

use chrono::{DateTime, Utc};
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

use super::account::Account;
use super::transfer::TransferRequest;

/// A full, point-in-time view of all account balances
///
/// Entries are kept in account-id order with at most one entry per id.
/// Each snapshot received from the ledger replaces the previous one whole.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceSnapshot {
    /// Ledger version this view was observed at (0 = never synced)
    #[serde(default)]
    pub version: u64,
    balances: Vec<Account>,
    /// When this client received the snapshot
    #[serde(skip, default = "Utc::now")]
    pub received_at: DateTime<Utc>,
}

impl Default for BalanceSnapshot {
    fn default() -> Self {
        Self::empty()
    }
}

impl PartialEq for BalanceSnapshot {
    fn eq(&self, other: &Self) -> bool {
        self.version == other.version && self.balances == other.balances
    }
}

impl BalanceSnapshot {
    /// Create a snapshot, normalizing order; later duplicates win
    pub fn new(version: u64, balances: Vec<Account>) -> Self {
        let mut snapshot = Self {
            version,
            balances: Vec::with_capacity(balances.len()),
            received_at: Utc::now(),
        };
        for account in balances {
            snapshot.upsert(account);
        }
        snapshot
    }

    pub fn empty() -> Self {
        Self {
            version: 0,
            balances: Vec::new(),
            received_at: Utc::now(),
        }
    }

    /// Restore the ordering invariant after deserializing a wire snapshot
    pub(crate) fn normalized(self) -> Self {
        let received_at = self.received_at;
        let mut snapshot = Self::new(self.version, self.balances);
        snapshot.received_at = received_at;
        snapshot
    }

    pub fn balances(&self) -> &[Account] {
        &self.balances
    }

    pub fn len(&self) -> usize {
        self.balances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.balances.is_empty()
    }

    pub fn balance_of(&self, account_id: &str) -> Option<&BigUint> {
        self.position(account_id)
            .ok()
            .map(|idx| &self.balances[idx].balance)
    }

    pub fn contains(&self, account_id: &str) -> bool {
        self.position(account_id).is_ok()
    }

    pub fn account_ids(&self) -> Vec<String> {
        self.balances.iter().map(|a| a.account_id.clone()).collect()
    }

    /// Sum of all balances
    pub fn total(&self) -> BigUint {
        self.balances.iter().map(|a| &a.balance).sum()
    }

    /// Insert an account or replace its balance
    pub fn upsert(&mut self, account: Account) {
        match self.position(&account.account_id) {
            Ok(idx) => self.balances[idx] = account,
            Err(idx) => self.balances.insert(idx, account),
        }
    }

    /// Mirror a confirmed transfer locally
    ///
    /// Returns false and leaves the snapshot untouched when either account is
    /// missing or the source balance would go negative, which means this view
    /// is stale and must wait for the next pushed snapshot.
    pub fn apply_transfer(&mut self, transfer: &TransferRequest) -> bool {
        let (Ok(from), Ok(to)) = (
            self.position(&transfer.from_account_id),
            self.position(&transfer.to_account_id),
        ) else {
            return false;
        };
        if self.balances[from].balance < transfer.amount {
            return false;
        }
        self.balances[from].balance -= &transfer.amount;
        self.balances[to].balance += &transfer.amount;
        true
    }

    fn position(&self, account_id: &str) -> std::result::Result<usize, usize> {
        self.balances
            .binary_search_by(|a| a.account_id.as_str().cmp(account_id))
    }
}
