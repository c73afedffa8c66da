//! Service layer - client-side orchestration
//!
//! Services coordinate domain logic and port interactions. Each service
//! focuses on a specific use case or feature area.

pub mod connection;
pub mod form;
pub mod ledger;

pub use connection::{Connection, ConnectionManager};
pub use form::{FormStatus, SignUpForm, TransferForm};
pub use ledger::{BalanceSubscription, LedgerClient};
