//! Connection manager - the single session to the ledger

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, warn};
use url::Url;

use crate::domain::result::{Error, Result};
use crate::ports::{Connector, LedgerService};

/// An open session to a ledger endpoint
///
/// Closed exactly once: by `close()`, by the manager's `disconnect()`, or when
/// the last handle is dropped, whichever happens first.
pub struct Connection {
    endpoint: Url,
    service: Arc<dyn LedgerService>,
    closed: AtomicBool,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("endpoint", &self.endpoint.as_str())
            .field("service", &self.service.name())
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl Connection {
    pub fn new(endpoint: Url, service: Arc<dyn LedgerService>) -> Self {
        Self {
            endpoint,
            service,
            closed: AtomicBool::new(false),
        }
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn service(&self) -> &Arc<dyn LedgerService> {
        &self.service
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Release the session; returns false if it was already released
    pub fn close(&self) -> bool {
        if self.closed.swap(true, Ordering::SeqCst) {
            return false;
        }
        self.service.close();
        info!(endpoint = %self.endpoint, "ledger connection closed");
        true
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.close();
    }
}

/// Owns the one connection a session may hold
///
/// The connection is built lazily on the first `connect()` and shared by
/// every caller after that.
pub struct ConnectionManager {
    connector: Arc<dyn Connector>,
    current: Mutex<Option<Arc<Connection>>>,
}

impl ConnectionManager {
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self {
            connector,
            current: Mutex::new(None),
        }
    }

    /// Connect to `endpoint`, or return the existing connection to it
    ///
    /// Fails with `Connection` if the endpoint is unreachable, or if the
    /// session is already bound to a different endpoint.
    pub async fn connect(&self, endpoint: &Url) -> Result<Arc<Connection>> {
        // Held across the connect so concurrent callers share one attempt
        let mut current = self.current.lock().await;

        if let Some(existing) = current.as_ref().filter(|c| !c.is_closed()) {
            if existing.endpoint() == endpoint {
                return Ok(existing.clone());
            }
            return Err(Error::connection(format!(
                "session is already connected to {}",
                existing.endpoint()
            )));
        }

        let service = self.connector.connect(endpoint).await.map_err(|e| {
            warn!(%endpoint, error = %e, "failed to connect to ledger");
            match e {
                Error::Connection(_) => e,
                other => Error::connection(other.to_string()),
            }
        })?;

        info!(%endpoint, service = service.name(), "connected to ledger");
        let connection = Arc::new(Connection::new(endpoint.clone(), service));
        *current = Some(connection.clone());
        Ok(connection)
    }

    /// The live connection, if any
    pub async fn current(&self) -> Option<Arc<Connection>> {
        self.current
            .lock()
            .await
            .as_ref()
            .filter(|c| !c.is_closed())
            .cloned()
    }

    /// Tear the session down; returns false if there was nothing to close
    pub async fn disconnect(&self) -> bool {
        match self.current.lock().await.take() {
            Some(connection) => connection.close(),
            None => false,
        }
    }
}
