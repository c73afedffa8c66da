//! Console views
//!
//! Each view renders from the session's state and forms. Only the balances
//! watcher talks to the ledger in the background; forms submit on demand.

pub mod balances;
pub mod sign_up;
pub mod transfer;

use std::sync::{Arc, Mutex};

use anyhow::Result;
use futures::StreamExt;
use tokio::runtime::Runtime;
use tokio::task::JoinHandle;

use bank_core::services::{SignUpForm, TransferForm};
use bank_core::BankContext;

use crate::output;

/// Connection problem reported by the balance subscription
type Banner = Arc<Mutex<Option<String>>>;

/// Keeps the client's balances current while the page is open
///
/// Stopping it drops the subscription, which releases the remote stream.
pub struct BalanceWatcher {
    handle: JoinHandle<()>,
}

impl BalanceWatcher {
    fn start(runtime: &Runtime, ctx: Arc<BankContext>, banner: Banner) -> Self {
        let handle = runtime.spawn(async move {
            let mut subscription = ctx.client.subscribe_balances();
            while let Some(item) = subscription.next().await {
                let mut banner = banner.lock().unwrap_or_else(|p| p.into_inner());
                match item {
                    Ok(_) => *banner = None,
                    Err(e) if e.is_connection() => {
                        *banner = Some("Lost connection to the bank; reconnecting...".to_string())
                    }
                    Err(e) => *banner = Some(format!("Balances unavailable: {}", e)),
                }
            }
            tracing::debug!("balance subscription ended");
        });
        Self { handle }
    }

    /// Cancel the watcher and wait until its subscription is dropped
    fn stop(self, runtime: &Runtime) {
        self.handle.abort();
        let _ = runtime.block_on(self.handle);
    }
}

/// State of one console session: the "page"
pub struct Session {
    runtime: Runtime,
    ctx: Arc<BankContext>,
    banner: Banner,
    watcher: Option<BalanceWatcher>,
    pub sign_up: SignUpForm,
    pub transfer: TransferForm,
}

impl Session {
    pub fn new(runtime: Runtime, ctx: BankContext) -> Self {
        let ctx = Arc::new(ctx);
        let banner: Banner = Arc::new(Mutex::new(None));
        let watcher = BalanceWatcher::start(&runtime, ctx.clone(), banner.clone());

        Self {
            runtime,
            ctx,
            banner,
            watcher: Some(watcher),
            sign_up: SignUpForm::new(),
            transfer: TransferForm::new(),
        }
    }

    pub fn ctx(&self) -> &BankContext {
        &self.ctx
    }

    pub fn block_on<F: std::future::Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }

    /// Print the connection banner, if any
    pub fn show_banner(&self) {
        let banner = self.banner.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(msg) = banner.as_deref() {
            output::banner(msg);
        }
    }

    /// Tear the page down: subscription first, then the connection
    pub fn close(mut self) -> Result<()> {
        if let Some(watcher) = self.watcher.take() {
            watcher.stop(&self.runtime);
        }
        self.runtime.block_on(self.ctx.shutdown());
        Ok(())
    }
}
