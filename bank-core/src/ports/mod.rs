//! Port definitions (hexagonal architecture)
//!
//! Ports define the interfaces for external dependencies. The client layer
//! depends only on these traits, not on concrete transports.

mod ledger_service;

pub use ledger_service::{BalanceStream, Connector, LedgerService};
