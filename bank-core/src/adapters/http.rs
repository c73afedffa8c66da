//! HTTP ledger client
//!
//! Talks JSON to the remote bank service:
//! - POST /bank/sign_up `{accountId, initialDeposit}` returns `{accountId, balance}`
//! - POST /bank/transfer `{fromAccountId, toAccountId, amount}` returns `{}`
//! - GET /bank/balances[?after=N] returns `{version, balances: [...]}`
//!
//! `after` turns the balances call into a long-poll that answers once the
//! ledger moves past version N. Held polls get their own, longer timeout; a
//! poll that runs out of time means "no change" and is simply reissued.
//! Amounts travel as decimal strings.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;
use uuid::Uuid;

use crate::config::{Config, DEFAULT_LONG_POLL_TIMEOUT};
use crate::domain::result::{Error, Result};
use crate::domain::{Account, BalanceSnapshot, SignUpRequest, TransferRequest};
use crate::ports::{BalanceStream, Connector, LedgerService};

/// Header carrying a fresh id per mutation so the service can spot replays
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Error body returned by the service
#[derive(Debug, Clone, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Shared pieces of the client, cloned into balance streams
#[derive(Debug, Clone)]
struct Transport {
    client: Client,
    base_url: String,
    closed: Arc<AtomicBool>,
}

impl Transport {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(Error::connection("ledger session is closed"));
        }
        Ok(())
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        self.ensure_open()?;
        let response = request.send().await.map_err(map_request_error)?;
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(error_from_response(response).await)
        }
    }

    async fn fetch_balances(&self) -> Result<BalanceSnapshot> {
        let request = self.client.get(self.url("/bank/balances"));
        let response = self.send(request).await?;
        let snapshot: BalanceSnapshot = response
            .json()
            .await
            .map_err(|e| Error::protocol(format!("failed to parse balances response: {}", e)))?;
        Ok(snapshot.normalized())
    }

    /// Held balances query; `Ok(None)` when `hold` ran out with no change
    async fn long_poll(&self, after: u64, hold: Duration) -> Result<Option<BalanceSnapshot>> {
        self.ensure_open()?;
        let request = self
            .client
            .get(self.url("/bank/balances"))
            .query(&[("after", after)])
            .timeout(hold);

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => return Ok(None),
            Err(e) => return Err(map_request_error(e)),
        };
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        match response.json::<BalanceSnapshot>().await {
            Ok(snapshot) => Ok(Some(snapshot.normalized())),
            Err(e) if e.is_timeout() => Ok(None),
            Err(e) => Err(Error::protocol(format!(
                "failed to parse balances response: {}",
                e
            ))),
        }
    }
}

/// Ledger service backed by the remote HTTP API
#[derive(Debug)]
pub struct HttpLedgerService {
    transport: Transport,
    poll_interval: Duration,
    long_poll_timeout: Duration,
}

impl HttpLedgerService {
    /// Create a client for the given endpoint
    pub fn new(endpoint: &Url, request_timeout: Duration, poll_interval: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| Error::config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            transport: Transport {
                client,
                base_url: endpoint.as_str().trim_end_matches('/').to_string(),
                closed: Arc::new(AtomicBool::new(false)),
            },
            poll_interval,
            long_poll_timeout: DEFAULT_LONG_POLL_TIMEOUT,
        })
    }

    /// How long a held balances poll may wait for the ledger to change
    pub fn with_long_poll_timeout(mut self, timeout: Duration) -> Self {
        self.long_poll_timeout = timeout;
        self
    }

    /// Create a client using the timeouts from config
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(
            Self::new(&config.endpoint, config.request_timeout, config.poll_interval)?
                .with_long_poll_timeout(config.long_poll_timeout),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.transport.base_url
    }
}

#[async_trait]
impl LedgerService for HttpLedgerService {
    fn name(&self) -> &str {
        "http"
    }

    async fn sign_up(&self, request: &SignUpRequest) -> Result<Account> {
        let builder = self
            .transport
            .client
            .post(self.transport.url("/bank/sign_up"))
            .header(REQUEST_ID_HEADER, Uuid::new_v4().to_string())
            .json(request);

        let response = self.transport.send(builder).await?;
        response
            .json()
            .await
            .map_err(|e| Error::protocol(format!("failed to parse sign-up response: {}", e)))
    }

    async fn transfer(&self, request: &TransferRequest) -> Result<()> {
        let builder = self
            .transport
            .client
            .post(self.transport.url("/bank/transfer"))
            .header(REQUEST_ID_HEADER, Uuid::new_v4().to_string())
            .json(request);

        self.transport.send(builder).await?;
        Ok(())
    }

    async fn balances(&self) -> Result<BalanceSnapshot> {
        self.transport.fetch_balances().await
    }

    async fn balance_stream(&self) -> Result<BalanceStream> {
        // First snapshot is fetched eagerly so an unreachable ledger fails the
        // subscription call itself.
        let first = self.transport.fetch_balances().await?;
        let poller = Poller {
            transport: self.transport.clone(),
            poll_interval: self.poll_interval,
            hold: self.long_poll_timeout,
            last_version: first.version,
        };

        let rest = futures::stream::unfold(Some(poller), |state| async move {
            let mut poller = state?;
            match poller.next_snapshot().await {
                Some(Ok(snapshot)) => Some((Ok(snapshot), Some(poller))),
                // Yield the error once, then end; reconnecting is the caller's call
                Some(Err(e)) => Some((Err(e), None)),
                None => None,
            }
        });

        Ok(futures::stream::once(async move { Ok(first) })
            .chain(rest)
            .boxed())
    }

    fn close(&self) {
        self.transport.closed.store(true, Ordering::SeqCst);
    }
}

/// Long-poll loop behind a balance stream
struct Poller {
    transport: Transport,
    poll_interval: Duration,
    hold: Duration,
    last_version: u64,
}

impl Poller {
    /// Wait for the next version; `None` once the session is closed
    async fn next_snapshot(&mut self) -> Option<Result<BalanceSnapshot>> {
        loop {
            if self.transport.ensure_open().is_err() {
                return None;
            }
            match self.transport.long_poll(self.last_version, self.hold).await {
                Ok(None) => {
                    debug!(after = self.last_version, "balance poll held without change");
                }
                Ok(Some(snapshot)) if snapshot.version > self.last_version => {
                    self.last_version = snapshot.version;
                    return Some(Ok(snapshot));
                }
                Ok(Some(snapshot)) => {
                    if snapshot.version < self.last_version {
                        warn!(
                            seen = self.last_version,
                            got = snapshot.version,
                            "ledger returned an older balance version"
                        );
                    }
                    tokio::time::sleep(self.poll_interval).await;
                }
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

/// Connector opening HTTP sessions
///
/// Probes the endpoint with a balances call so an unreachable ledger is
/// reported at connect time.
#[derive(Debug, Clone)]
pub struct HttpConnector {
    request_timeout: Duration,
    poll_interval: Duration,
    long_poll_timeout: Duration,
}

impl HttpConnector {
    pub fn new(request_timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            request_timeout,
            poll_interval,
            long_poll_timeout: DEFAULT_LONG_POLL_TIMEOUT,
        }
    }

    pub fn with_long_poll_timeout(mut self, timeout: Duration) -> Self {
        self.long_poll_timeout = timeout;
        self
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.request_timeout, config.poll_interval)
            .with_long_poll_timeout(config.long_poll_timeout)
    }
}

#[async_trait]
impl Connector for HttpConnector {
    async fn connect(&self, endpoint: &Url) -> Result<Arc<dyn LedgerService>> {
        let service = HttpLedgerService::new(endpoint, self.request_timeout, self.poll_interval)?
            .with_long_poll_timeout(self.long_poll_timeout);
        service.balances().await?;
        debug!(%endpoint, "connected to ledger");
        Ok(Arc::new(service))
    }
}

fn map_request_error(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::connection(format!("request timed out: {}", e))
    } else if e.is_decode() {
        Error::protocol(e.to_string())
    } else {
        Error::connection(e.to_string())
    }
}

async fn error_from_response(response: Response) -> Error {
    let status = response.status();
    let body: ErrorBody = response.json().await.unwrap_or_default();
    error_from_status(status, body)
}

fn error_from_status(status: StatusCode, body: ErrorBody) -> Error {
    let message = body
        .message
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());

    match body.code.as_deref() {
        Some("invalid_input") => return Error::InvalidInput(message),
        Some("not_found") => return Error::NotFound(message),
        Some("insufficient_funds") => return Error::InsufficientFunds(message),
        _ => {}
    }

    match status {
        StatusCode::BAD_REQUEST | StatusCode::CONFLICT => Error::InvalidInput(message),
        StatusCode::NOT_FOUND => Error::NotFound(message),
        StatusCode::UNPROCESSABLE_ENTITY => Error::InsufficientFunds(message),
        s if s.is_server_error() => Error::connection(format!("ledger returned {}: {}", s, message)),
        s => Error::protocol(format!("unexpected status {}: {}", s, message)),
    }
}
