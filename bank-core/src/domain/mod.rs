//! Core domain entities
//!
//! Pure data structures with validation logic - no I/O.

mod account;
pub mod amount;
pub mod balance;
pub mod result;
mod transfer;

pub use account::{Account, SignUpRequest};
pub use balance::BalanceSnapshot;
pub use transfer::TransferRequest;
