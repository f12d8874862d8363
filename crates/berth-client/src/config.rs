//! Client configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ClientError, Result};
use crate::poll::PollPolicy;

/// Configuration for talking to the runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the runtime's HTTP API.
    pub runtime_url: String,
    /// Host that network links forward to.
    pub link_host: String,
    /// Total time allowed for one runtime request, in milliseconds.
    pub request_timeout_ms: u64,
    /// Time allowed to establish a connection, in milliseconds.
    pub connect_timeout_ms: u64,
    /// First delay between poll attempts, in milliseconds.
    pub poll_interval_ms: u64,
    /// Upper bound on the delay between poll attempts, in milliseconds.
    pub poll_max_interval_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            runtime_url: "http://127.0.0.1:43273".to_string(),
            link_host: "127.0.0.1".to_string(),
            request_timeout_ms: 30_000,
            connect_timeout_ms: 5_000,
            poll_interval_ms: 100,
            poll_max_interval_ms: 1_000,
        }
    }
}

impl ClientConfig {
    /// Create a config pointing at `runtime_url`.
    #[must_use]
    pub fn with_runtime_url(runtime_url: impl Into<String>) -> Self {
        Self {
            runtime_url: runtime_url.into(),
            ..Default::default()
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Supported environment variables:
    /// - `BERTH_RUNTIME_URL`: Base URL of the runtime API
    /// - `BERTH_LINK_HOST`: Host that network links forward to
    /// - `BERTH_REQUEST_TIMEOUT_MS`: Per-request timeout
    /// - `BERTH_CONNECT_TIMEOUT_MS`: Connection timeout
    /// - `BERTH_POLL_INTERVAL_MS`: First poll delay
    /// - `BERTH_POLL_MAX_INTERVAL_MS`: Maximum poll delay
    ///
    /// Unparseable numbers are ignored and the default kept.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(val) = lookup("BERTH_RUNTIME_URL") {
            config.runtime_url = val.trim_end_matches('/').to_string();
        }
        if let Some(val) = lookup("BERTH_LINK_HOST") {
            config.link_host = val;
        }

        let millis = |key: &str, slot: &mut u64| {
            if let Some(n) = lookup(key).and_then(|v| v.parse().ok()) {
                *slot = n;
            }
        };
        millis("BERTH_REQUEST_TIMEOUT_MS", &mut config.request_timeout_ms);
        millis("BERTH_CONNECT_TIMEOUT_MS", &mut config.connect_timeout_ms);
        millis("BERTH_POLL_INTERVAL_MS", &mut config.poll_interval_ms);
        millis("BERTH_POLL_MAX_INTERVAL_MS", &mut config.poll_max_interval_ms);

        config
    }

    /// Check the configuration for values the client cannot work with.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Config` for a runtime URL that is not an
    /// absolute http(s) URL, zero timeouts, or a maximum poll interval below
    /// the initial one.
    pub fn validate(&self) -> Result<()> {
        if self.runtime_url.is_empty() {
            return Err(ClientError::Config("runtime URL is empty".to_string()));
        }
        let url = reqwest::Url::parse(&self.runtime_url).map_err(|e| {
            ClientError::Config(format!("invalid runtime URL {:?}: {e}", self.runtime_url))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ClientError::Config(format!(
                "runtime URL {:?} must use http or https",
                self.runtime_url
            )));
        }
        if self.request_timeout_ms == 0 || self.connect_timeout_ms == 0 {
            return Err(ClientError::Config(
                "request and connect timeouts must be non-zero".to_string(),
            ));
        }
        if self.poll_interval_ms == 0 {
            return Err(ClientError::Config(
                "poll interval must be non-zero".to_string(),
            ));
        }
        if self.poll_max_interval_ms < self.poll_interval_ms {
            return Err(ClientError::Config(format!(
                "maximum poll interval {}ms is below initial interval {}ms",
                self.poll_max_interval_ms, self.poll_interval_ms
            )));
        }
        Ok(())
    }

    /// Per-request timeout.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Connection timeout.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Poll policy built from the configured intervals.
    #[must_use]
    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy::default().with_intervals(
            Duration::from_millis(self.poll_interval_ms),
            Duration::from_millis(self.poll_max_interval_ms),
        )
    }
}
