//! Bank Core - client-side ledger layer for the bank demo
//!
//! This crate follows hexagonal architecture:
//!
//! - **domain**: Core entities (Account, TransferRequest, BalanceSnapshot)
//! - **ports**: Trait definitions for the remote ledger (LedgerService, Connector)
//! - **services**: Connection manager, ledger client, form state
//! - **adapters**: Concrete implementations (HTTP, in-memory)

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
pub mod services;

use std::sync::Arc;

use adapters::http::HttpConnector;
use adapters::memory::{InMemoryConnector, InMemoryLedger};
use config::Config;
use ports::Connector;
use services::*;

// Re-export commonly used types at crate root
pub use domain::result::{Error, Result};
pub use domain::{Account, BalanceSnapshot, SignUpRequest, TransferRequest};

/// Main context for a bank session
///
/// Owns the connection manager and the ledger client built on top of the
/// single connection. Dropping the context (or calling `shutdown`) releases
/// the connection.
pub struct BankContext {
    pub config: Config,
    pub connections: ConnectionManager,
    pub client: LedgerClient,
}

impl BankContext {
    /// Connect using the transport selected by config
    pub async fn connect(config: Config) -> Result<Self> {
        let connector: Arc<dyn Connector> = if config.demo_mode {
            Arc::new(InMemoryConnector::new(Arc::new(InMemoryLedger::new())))
        } else {
            Arc::new(HttpConnector::from_config(&config))
        };
        Self::with_connector(config, connector).await
    }

    /// Connect through an explicit connector
    pub async fn with_connector(config: Config, connector: Arc<dyn Connector>) -> Result<Self> {
        let connections = ConnectionManager::new(connector);
        let connection = connections.connect(&config.endpoint).await?;
        let client = LedgerClient::new(connection, config.reconnect);

        Ok(Self {
            config,
            connections,
            client,
        })
    }

    /// Release the connection; safe to call more than once
    pub async fn shutdown(&self) {
        self.connections.disconnect().await;
    }
}
