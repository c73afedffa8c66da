//! Remote ledger service port
//!
//! Defines the boundary with the account ledger. The client layer only ever
//! talks to the ledger through this trait, so the HTTP transport and the
//! in-memory ledger are interchangeable.

use async_trait::async_trait;
use futures::stream::BoxStream;
use url::Url;

use crate::domain::result::Result;
use crate::domain::{Account, BalanceSnapshot, SignUpRequest, TransferRequest};

/// Server-pushed sequence of full balance snapshots
///
/// The stream ends (or yields an error) when the transport drops. Dropping it
/// releases whatever the adapter holds for the subscription.
pub type BalanceStream = BoxStream<'static, Result<BalanceSnapshot>>;

/// Account ledger service trait
#[async_trait]
pub trait LedgerService: Send + Sync {
    /// Adapter name (e.g., "http", "memory")
    fn name(&self) -> &str;

    /// Open a new account with an initial deposit
    ///
    /// Fails with `InvalidInput` when the account id is already taken.
    async fn sign_up(&self, request: &SignUpRequest) -> Result<Account>;

    /// Move funds between two accounts atomically
    ///
    /// Fails with `NotFound` for unknown accounts and `InsufficientFunds`
    /// when the source balance is smaller than the amount.
    async fn transfer(&self, request: &TransferRequest) -> Result<()>;

    /// Fetch the current full snapshot
    async fn balances(&self) -> Result<BalanceSnapshot>;

    /// Subscribe to full snapshots, starting with the current one
    async fn balance_stream(&self) -> Result<BalanceStream>;

    /// Release the session; called once when the connection is torn down
    fn close(&self);
}

/// Opens connections to a ledger endpoint
///
/// The connection manager depends on this instead of a concrete transport so
/// tests can hand out fake services.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, endpoint: &Url) -> Result<std::sync::Arc<dyn LedgerService>>;
}
