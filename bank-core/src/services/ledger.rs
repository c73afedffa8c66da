//! Ledger client - sign-up, transfer and balance subscription
//!
//! Turns user intents into ledger calls and keeps the latest known balances
//! for the view layer. Mutations are never retried; the balance subscription
//! reconnects with exponential backoff.

use std::pin::Pin;
use std::sync::{Arc, RwLock};
use std::task::{Context, Poll};
use std::time::Duration;

use futures::stream::{BoxStream, Stream};
use futures::StreamExt;
use num_bigint::BigUint;
use tracing::{debug, info, warn};

use crate::config::ReconnectPolicy;
use crate::domain::result::Result;
use crate::domain::{Account, BalanceSnapshot, SignUpRequest, TransferRequest};
use crate::ports::BalanceStream;
use crate::services::connection::Connection;

/// Latest balances as seen by this client, shared with subscriptions
#[derive(Debug, Clone, Default)]
struct SharedSnapshot(Arc<RwLock<BalanceSnapshot>>);

impl SharedSnapshot {
    fn read(&self) -> BalanceSnapshot {
        self.0
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn update<R>(&self, f: impl FnOnce(&mut BalanceSnapshot) -> R) -> R {
        let mut guard = self
            .0
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut guard)
    }

    fn version(&self) -> u64 {
        self.0
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .version
    }

    /// Install `snapshot` unless a newer version is already held
    ///
    /// Returns the view held afterwards.
    fn replace(&self, snapshot: BalanceSnapshot) -> BalanceSnapshot {
        self.update(|current| {
            if snapshot.version >= current.version {
                *current = snapshot;
            } else {
                debug!(
                    held = current.version,
                    received = snapshot.version,
                    "ignoring older balance snapshot"
                );
            }
            current.clone()
        })
    }

    /// Run a local reconciliation only if no snapshot arrived since `seen`
    fn update_if_unchanged<R>(
        &self,
        seen: u64,
        f: impl FnOnce(&mut BalanceSnapshot) -> R,
    ) -> Option<R> {
        self.update(|current| (current.version == seen).then(|| f(current)))
    }
}

/// Client for the remote ledger
pub struct LedgerClient {
    connection: Arc<Connection>,
    snapshot: SharedSnapshot,
    reconnect: ReconnectPolicy,
}

impl LedgerClient {
    pub fn new(connection: Arc<Connection>, reconnect: ReconnectPolicy) -> Self {
        Self {
            connection,
            snapshot: SharedSnapshot::default(),
            reconnect,
        }
    }

    pub fn connection(&self) -> &Arc<Connection> {
        &self.connection
    }

    /// Open an account with an initial deposit
    ///
    /// Empty ids fail locally. Duplicate ids are rejected by the ledger and
    /// surface as `InvalidInput`. On success the account is added to the
    /// local snapshot, unless a pushed snapshot already superseded it.
    pub async fn sign_up(&self, account_id: &str, initial_deposit: BigUint) -> Result<Account> {
        let request = SignUpRequest::new(account_id, initial_deposit)?;
        let seen = self.snapshot.version();
        let account = self.connection.service().sign_up(&request).await?;

        info!("account opened");
        if self
            .snapshot
            .update_if_unchanged(seen, |s| s.upsert(account.clone()))
            .is_none()
        {
            debug!("newer snapshot already received; keeping it");
        }
        Ok(account)
    }

    /// Move `amount` from one account to another
    ///
    /// Same-account transfers and zero amounts fail locally without a remote
    /// call. On success both balances are updated in the local snapshot.
    /// If a snapshot was pushed while the call was in flight, that snapshot
    /// may already include the transfer and is left as is.
    pub async fn transfer(
        &self,
        from_account_id: &str,
        to_account_id: &str,
        amount: BigUint,
    ) -> Result<()> {
        let request = TransferRequest::new(from_account_id, to_account_id, amount)?;
        let seen = self.snapshot.version();
        self.connection.service().transfer(&request).await?;

        info!("transfer completed");
        match self
            .snapshot
            .update_if_unchanged(seen, |s| s.apply_transfer(&request))
        {
            Some(true) => {}
            Some(false) => debug!("local balances are stale; waiting for the next snapshot"),
            None => debug!("newer snapshot already received; keeping it"),
        }
        Ok(())
    }

    /// Query a full snapshot once and make it the local view
    ///
    /// A response older than the snapshot already held is discarded. Returns
    /// the local view afterwards.
    pub async fn refresh(&self) -> Result<BalanceSnapshot> {
        let snapshot = self.connection.service().balances().await?;
        Ok(self.snapshot.replace(snapshot))
    }

    /// Latest known balances (may be stale)
    pub fn snapshot(&self) -> BalanceSnapshot {
        self.snapshot.read()
    }

    /// Account ids for pickers, in display order
    pub fn account_ids(&self) -> Vec<String> {
        self.snapshot.read().account_ids()
    }

    /// Subscribe to full balance snapshots
    ///
    /// Each emission replaces the local snapshot before it is yielded.
    /// Transport failures are yielded as errors and followed by a reconnect
    /// after a backoff delay. The stream only ends once the connection is
    /// closed. Dropping the subscription releases the remote stream.
    pub fn subscribe_balances(&self) -> BalanceSubscription {
        let state = SubscriptionState {
            connection: self.connection.clone(),
            snapshot: self.snapshot.clone(),
            policy: self.reconnect,
            stream: None,
            delay: self.reconnect.initial,
            backoff_pending: false,
        };
        BalanceSubscription {
            inner: futures::stream::unfold(state, SubscriptionState::next).boxed(),
        }
    }
}

struct SubscriptionState {
    connection: Arc<Connection>,
    snapshot: SharedSnapshot,
    policy: ReconnectPolicy,
    stream: Option<BalanceStream>,
    delay: Duration,
    backoff_pending: bool,
}

impl SubscriptionState {
    async fn next(mut self) -> Option<(Result<BalanceSnapshot>, Self)> {
        loop {
            if self.connection.is_closed() {
                return None;
            }

            if self.backoff_pending {
                debug!(delay_ms = self.delay.as_millis() as u64, "reconnecting balance stream");
                tokio::time::sleep(self.delay).await;
                self.delay = self.policy.next_delay(self.delay);
                self.backoff_pending = false;
            }

            if self.stream.is_none() {
                match self.connection.service().balance_stream().await {
                    Ok(stream) => self.stream = Some(stream),
                    Err(e) => {
                        warn!(error = %e, "failed to open balance stream");
                        self.backoff_pending = true;
                        return Some((Err(e), self));
                    }
                }
            }

            let Some(stream) = self.stream.as_mut() else {
                continue;
            };

            match stream.next().await {
                Some(Ok(snapshot)) => {
                    self.delay = self.policy.initial;
                    self.snapshot.replace(snapshot.clone());
                    return Some((Ok(snapshot), self));
                }
                Some(Err(e)) => {
                    warn!(error = %e, "balance stream failed");
                    self.stream = None;
                    self.backoff_pending = true;
                    return Some((Err(e), self));
                }
                None => {
                    debug!("balance stream ended");
                    self.stream = None;
                    self.backoff_pending = true;
                }
            }
        }
    }
}

/// Live sequence of balance snapshots
///
/// Holds the remote stream for as long as it is alive; dropping it (for
/// example when the balances view goes away) releases that stream.
pub struct BalanceSubscription {
    inner: BoxStream<'static, Result<BalanceSnapshot>>,
}

impl Stream for BalanceSubscription {
    type Item = Result<BalanceSnapshot>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.poll_next_unpin(cx)
    }
}
