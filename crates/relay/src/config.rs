//! Relay configuration loaded from environment variables.

use std::time::Duration;

use outbox::MAX_RETRY_COUNT;

/// Default delay between two processor passes.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 250;

/// Outbox relay configuration.
///
/// Reads from environment variables:
/// - `OUTBOX_POLL_INTERVAL_MS`: delay between passes (default: `250`)
/// - `OUTBOX_MAX_RETRY_COUNT`: failed attempts before a message is dead (default: `5`)
/// - `OUTBOX_BATCH_SIZE`: most messages per pass (default: unbounded)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayConfig {
    pub poll_interval: Duration,
    pub max_retry_count: u32,
    pub batch_size: Option<usize>,
}

impl RelayConfig {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through `lookup`; unparsable values fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        Self {
            poll_interval: lookup("OUTBOX_POLL_INTERVAL_MS")
                .and_then(|v| v.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.poll_interval),
            max_retry_count: lookup("OUTBOX_MAX_RETRY_COUNT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_retry_count),
            batch_size: lookup("OUTBOX_BATCH_SIZE")
                .and_then(|v| v.parse().ok())
                .filter(|size: &usize| *size > 0),
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            max_retry_count: MAX_RETRY_COUNT,
            batch_size: None,
        }
    }
}
