//! Result and error types for the core library

use thiserror::Error;

/// Core library error type
///
/// `InvalidInput` is always raised locally before a request leaves the
/// client, except for duplicate account ids which only the remote ledger
/// can detect.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Insufficient funds: {0}")]
    InsufficientFunds(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an insufficient funds error
    pub fn insufficient_funds(msg: impl Into<String>) -> Self {
        Self::InsufficientFunds(msg.into())
    }

    /// Create a connection error
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a protocol error
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    /// Transport-level failures are the only ones a subscription recovers from
    /// by reconnecting; the view renders them as a banner.
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Connection(_))
    }
}

/// Core library result type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = Error::invalid_input("account id cannot be empty");
        assert_eq!(err.to_string(), "Invalid input: account id cannot be empty");

        let err = Error::insufficient_funds("A has 10, needs 40");
        assert!(err.to_string().starts_with("Insufficient funds"));
    }

    #[test]
    fn test_is_connection() {
        assert!(Error::connection("refused").is_connection());
        assert!(!Error::not_found("A").is_connection());
    }

    #[test]
    fn test_from_json_error() {
        let bad = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: Error = bad.into();
        assert!(matches!(err, Error::Json(_)));
    }
}
