//! Configuration management
//!
//! Everything comes from the environment; nothing is persisted locally.
//!
//! | Variable | Default |
//! |---|---|
//! | `BANK_ENDPOINT` | `https://dev.localhost.direct:9991` |
//! | `BANK_DEMO_MODE` | `false` |
//! | `BANK_REQUEST_TIMEOUT_SECS` | `30` |
//! | `BANK_POLL_INTERVAL_MS` | `1000` |
//! | `BANK_LONG_POLL_TIMEOUT_SECS` | `90` |
//! | `BANK_RECONNECT_INITIAL_MS` | `500` |
//! | `BANK_RECONNECT_MAX_MS` | `30000` |

use std::time::Duration;

use url::Url;

use crate::domain::result::{Error, Result};

/// Default ledger endpoint when `BANK_ENDPOINT` is unset
pub const DEFAULT_ENDPOINT: &str = "https://dev.localhost.direct:9991";

pub const ENDPOINT_ENV: &str = "BANK_ENDPOINT";
pub const DEMO_MODE_ENV: &str = "BANK_DEMO_MODE";
pub const REQUEST_TIMEOUT_ENV: &str = "BANK_REQUEST_TIMEOUT_SECS";
pub const POLL_INTERVAL_ENV: &str = "BANK_POLL_INTERVAL_MS";
pub const LONG_POLL_TIMEOUT_ENV: &str = "BANK_LONG_POLL_TIMEOUT_SECS";
pub const RECONNECT_INITIAL_ENV: &str = "BANK_RECONNECT_INITIAL_MS";
pub const RECONNECT_MAX_ENV: &str = "BANK_RECONNECT_MAX_MS";

/// How long a held balances poll may wait before it is reissued
pub const DEFAULT_LONG_POLL_TIMEOUT: Duration = Duration::from_secs(90);

/// Exponential backoff for balance subscription reconnects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub initial: Duration,
    pub max: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(500),
            max: Duration::from_secs(30),
        }
    }
}

impl ReconnectPolicy {
    /// Delay after `delay`: doubled, capped at `max`
    pub fn next_delay(&self, delay: Duration) -> Duration {
        delay.saturating_mul(2).min(self.max)
    }
}

/// Client configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub endpoint: Url,
    /// Use the in-process ledger instead of the remote service
    pub demo_mode: bool,
    pub request_timeout: Duration,
    /// Pause between balance polls when the ledger reports no change
    pub poll_interval: Duration,
    /// Timeout for held balances polls, separate from `request_timeout`
    pub long_poll_timeout: Duration,
    pub reconnect: ReconnectPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            demo_mode: false,
            request_timeout: Duration::from_secs(30),
            poll_interval: Duration::from_millis(1000),
            long_poll_timeout: DEFAULT_LONG_POLL_TIMEOUT,
            reconnect: ReconnectPolicy::default(),
        }
    }
}

fn default_endpoint() -> Url {
    Url::parse(DEFAULT_ENDPOINT).expect("default endpoint is a valid URL")
}

impl Config {
    /// Load config from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load config from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let endpoint = match lookup(ENDPOINT_ENV).filter(|v| !v.trim().is_empty()) {
            Some(raw) => Url::parse(raw.trim())
                .map_err(|e| Error::config(format!("{} is not a valid URL: {}", ENDPOINT_ENV, e)))?,
            None => defaults.endpoint,
        };
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(Error::config(format!(
                "{} must be an http(s) URL, got '{}'",
                ENDPOINT_ENV, endpoint
            )));
        }

        let demo_mode = match lookup(DEMO_MODE_ENV).as_deref() {
            Some("true" | "1" | "yes" | "TRUE" | "YES") => true,
            Some("false" | "0" | "no" | "FALSE" | "NO") | None => false,
            Some(other) => {
                return Err(Error::config(format!(
                    "{} must be true or false, got '{}'",
                    DEMO_MODE_ENV, other
                )))
            }
        };

        let request_timeout = parse_duration(&lookup, REQUEST_TIMEOUT_ENV, Duration::from_secs)?
            .unwrap_or(defaults.request_timeout);
        let poll_interval = parse_duration(&lookup, POLL_INTERVAL_ENV, Duration::from_millis)?
            .unwrap_or(defaults.poll_interval);
        let long_poll_timeout = parse_duration(&lookup, LONG_POLL_TIMEOUT_ENV, Duration::from_secs)?
            .unwrap_or(defaults.long_poll_timeout);
        let initial = parse_duration(&lookup, RECONNECT_INITIAL_ENV, Duration::from_millis)?
            .unwrap_or(defaults.reconnect.initial);
        let max = parse_duration(&lookup, RECONNECT_MAX_ENV, Duration::from_millis)?
            .unwrap_or(defaults.reconnect.max);

        if initial > max {
            return Err(Error::config(format!(
                "{} must not exceed {}",
                RECONNECT_INITIAL_ENV, RECONNECT_MAX_ENV
            )));
        }

        Ok(Self {
            endpoint,
            demo_mode,
            request_timeout,
            poll_interval,
            long_poll_timeout,
            reconnect: ReconnectPolicy { initial, max },
        })
    }
}

fn parse_duration<F>(
    lookup: &F,
    key: &str,
    unit: fn(u64) -> Duration,
) -> Result<Option<Duration>>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };
    let value: u64 = raw
        .trim()
        .parse()
        .map_err(|_| Error::config(format!("{} must be a whole number, got '{}'", key, raw)))?;
    if value == 0 {
        return Err(Error::config(format!("{} must be greater than zero", key)));
    }
    Ok(Some(unit(value)))
}
