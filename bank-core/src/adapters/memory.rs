//! In-process ledger
//!
//! A complete ledger living in the client process. Backs demo mode (no remote
//! service needed) and the test suites. Every mutation bumps the version and
//! pushes a full snapshot to all live subscribers, in order.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use futures::StreamExt;
use num_bigint::BigUint;
use tokio::sync::mpsc;
use tracing::debug;
use url::Url;

use crate::domain::result::{Error, Result};
use crate::domain::{Account, BalanceSnapshot, SignUpRequest, TransferRequest};
use crate::ports::{BalanceStream, Connector, LedgerService};

#[derive(Debug, Default)]
struct LedgerState {
    accounts: BTreeMap<String, BigUint>,
    version: u64,
    subscribers: Vec<mpsc::UnboundedSender<BalanceSnapshot>>,
}

impl LedgerState {
    fn snapshot(&self) -> BalanceSnapshot {
        BalanceSnapshot::new(
            self.version,
            self.accounts
                .iter()
                .map(|(id, balance)| Account::new(id.clone(), balance.clone()))
                .collect(),
        )
    }

    /// Bump the version and push the new snapshot to every live subscriber
    fn commit(&mut self) {
        self.version += 1;
        let snapshot = self.snapshot();
        self.subscribers
            .retain(|tx| tx.send(snapshot.clone()).is_ok());
    }
}

/// In-memory ledger service
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    state: Mutex<LedgerState>,
    closed: AtomicBool,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a ledger pre-populated with accounts
    pub fn with_accounts<I, S>(accounts: I) -> Self
    where
        I: IntoIterator<Item = (S, u64)>,
        S: Into<String>,
    {
        let ledger = Self::new();
        {
            let mut state = ledger.lock_unchecked();
            for (id, balance) in accounts {
                state.accounts.insert(id.into(), BigUint::from(balance));
            }
            if !state.accounts.is_empty() {
                state.version = 1;
            }
        }
        ledger
    }

    /// Number of balance streams still held by someone
    pub fn subscriber_count(&self) -> usize {
        let mut state = self.lock_unchecked();
        state.subscribers.retain(|tx| !tx.is_closed());
        state.subscribers.len()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn lock(&self) -> Result<MutexGuard<'_, LedgerState>> {
        if self.is_closed() {
            return Err(Error::connection("ledger session is closed"));
        }
        Ok(self.lock_unchecked())
    }

    fn lock_unchecked(&self) -> MutexGuard<'_, LedgerState> {
        // A panic while holding the lock cannot leave balances half-applied:
        // every mutation validates first and writes last.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl LedgerService for InMemoryLedger {
    fn name(&self) -> &str {
        "memory"
    }

    async fn sign_up(&self, request: &SignUpRequest) -> Result<Account> {
        Account::validate_id(&request.account_id)?;
        let mut state = self.lock()?;

        if state.accounts.contains_key(&request.account_id) {
            return Err(Error::invalid_input(format!(
                "account '{}' already exists",
                request.account_id
            )));
        }

        state
            .accounts
            .insert(request.account_id.clone(), request.initial_deposit.clone());
        state.commit();
        debug!(version = state.version, "account opened");

        Ok(Account::new(
            request.account_id.clone(),
            request.initial_deposit.clone(),
        ))
    }

    async fn transfer(&self, request: &TransferRequest) -> Result<()> {
        request.validate()?;
        let mut state = self.lock()?;

        let from_balance = state
            .accounts
            .get(&request.from_account_id)
            .ok_or_else(|| {
                Error::not_found(format!("account '{}'", request.from_account_id))
            })?;
        if !state.accounts.contains_key(&request.to_account_id) {
            return Err(Error::not_found(format!(
                "account '{}'",
                request.to_account_id
            )));
        }
        if *from_balance < request.amount {
            return Err(Error::insufficient_funds(format!(
                "account '{}' has {}, transfer needs {}",
                request.from_account_id, from_balance, request.amount
            )));
        }

        if let Some(from) = state.accounts.get_mut(&request.from_account_id) {
            *from -= &request.amount;
        }
        if let Some(to) = state.accounts.get_mut(&request.to_account_id) {
            *to += &request.amount;
        }
        state.commit();
        debug!(version = state.version, "transfer applied");

        Ok(())
    }

    async fn balances(&self) -> Result<BalanceSnapshot> {
        Ok(self.lock()?.snapshot())
    }

    async fn balance_stream(&self) -> Result<BalanceStream> {
        let (tx, rx) = mpsc::unbounded_channel();
        {
            let mut state = self.lock()?;
            // Current view first, then every committed version
            let _ = tx.send(state.snapshot());
            state.subscribers.push(tx);
        }

        let stream = futures::stream::unfold(rx, |mut rx| async move {
            let snapshot = rx.recv().await?;
            Some((Ok::<_, Error>(snapshot), rx))
        });
        Ok(stream.boxed())
    }

    fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            // Ending every subscriber stream
            self.lock_unchecked().subscribers.clear();
        }
    }
}

/// Connector handing out one shared in-memory ledger
///
/// Used in demo mode: every endpoint maps to the same local ledger.
#[derive(Debug, Clone, Default)]
pub struct InMemoryConnector {
    ledger: Arc<InMemoryLedger>,
}

impl InMemoryConnector {
    pub fn new(ledger: Arc<InMemoryLedger>) -> Self {
        Self { ledger }
    }

    pub fn ledger(&self) -> &Arc<InMemoryLedger> {
        &self.ledger
    }
}

#[async_trait]
impl Connector for InMemoryConnector {
    async fn connect(&self, endpoint: &Url) -> Result<Arc<dyn LedgerService>> {
        debug!(%endpoint, "using in-memory ledger");
        Ok(self.ledger.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign_up(id: &str, deposit: u32) -> SignUpRequest {
        SignUpRequest::new(id, BigUint::from(deposit)).unwrap()
    }

    fn transfer(from: &str, to: &str, amount: u32) -> TransferRequest {
        TransferRequest::new(from, to, BigUint::from(amount)).unwrap()
    }

    #[tokio::test]
    async fn test_sign_up_and_duplicate() {
        let ledger = InMemoryLedger::new();
        ledger.sign_up(&sign_up("A", 100)).await.unwrap();

        let err = ledger.sign_up(&sign_up("A", 50)).await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));

        let snapshot = ledger.balances().await.unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.balance_of("A"), Some(&BigUint::from(100u32)));
    }

    #[tokio::test]
    async fn test_transfer_errors_leave_state_untouched() {
        let ledger = InMemoryLedger::with_accounts([("A", 10), ("B", 0)]);

        let err = ledger.transfer(&transfer("A", "B", 40)).await.unwrap_err();
        assert!(matches!(err, Error::InsufficientFunds(_)));

        let err = ledger.transfer(&transfer("A", "Z", 1)).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));

        let err = ledger.transfer(&transfer("Z", "A", 1)).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));

        let snapshot = ledger.balances().await.unwrap();
        assert_eq!(snapshot.version, 1);
        assert_eq!(snapshot.balance_of("A"), Some(&BigUint::from(10u32)));
    }

    #[tokio::test]
    async fn test_stream_emits_every_version_in_order() {
        let ledger = InMemoryLedger::with_accounts([("A", 100), ("B", 0)]);
        let mut stream = ledger.balance_stream().await.unwrap();

        ledger.transfer(&transfer("A", "B", 10)).await.unwrap();
        ledger.transfer(&transfer("A", "B", 20)).await.unwrap();

        let versions: Vec<u64> = vec![
            stream.next().await.unwrap().unwrap().version,
            stream.next().await.unwrap().unwrap().version,
            stream.next().await.unwrap().unwrap().version,
        ];
        assert_eq!(versions, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_dropping_stream_unsubscribes() {
        let ledger = InMemoryLedger::new();
        let stream = ledger.balance_stream().await.unwrap();
        assert_eq!(ledger.subscriber_count(), 1);
        drop(stream);
        assert_eq!(ledger.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_close_ends_streams_and_rejects_calls() {
        let ledger = InMemoryLedger::new();
        let mut stream = ledger.balance_stream().await.unwrap();
        assert!(stream.next().await.is_some());

        ledger.close();
        ledger.close();

        assert!(stream.next().await.is_none());
        let err = ledger.balances().await.unwrap_err();
        assert!(err.is_connection());
    }
}
