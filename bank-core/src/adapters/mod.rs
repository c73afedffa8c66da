//! Adapter implementations
//!
//! Adapters implement the port traits with concrete technologies:
//! - reqwest HTTP client for the remote bank service
//! - In-process ledger for demo mode and tests

pub mod http;
pub mod memory;

#[cfg(test)]
pub mod mock_server;
