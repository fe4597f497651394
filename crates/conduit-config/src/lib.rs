//! Layered configuration for the Conduit remote-control plane.
//!
//! Values are merged from built-in defaults, an optional configuration file,
//! `CONDUIT_*` environment variables and command-line flags, in that order of
//! increasing precedence. The daemon reads the endpoint name, connection
//! ceiling, pool heartbeat and flush cadence from here, together with the
//! logging settings consumed by its telemetry layer.

mod access;
mod defaults;
mod logging;
mod pipe;

use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

pub use access::{AccessScope, AccessScopeParseError};
pub use defaults::{
    DEFAULT_FLUSH_INTERVAL_MS, DEFAULT_HEARTBEAT_MS, DEFAULT_LOG_FILTER, DEFAULT_MAX_CONNECTIONS,
    default_endpoint, default_log_filter, default_log_format,
};
pub use logging::{LogFormat, LogFormatParseError};
pub use pipe::{PipeName, PipeNameError, PipePreparationError};

/// Resolved configuration shared by the daemon and its tooling.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "CONDUIT")]
pub struct Config {
    /// Rooted name of the control endpoint.
    #[serde(default = "default_endpoint")]
    #[ortho_config(default = default_endpoint())]
    pub endpoint: PipeName,
    /// Maximum number of concurrent connections; zero disables the endpoint.
    #[serde(default = "defaults::default_max_connections")]
    #[ortho_config(default = DEFAULT_MAX_CONNECTIONS)]
    pub max_connections: usize,
    /// Pool heartbeat in milliseconds; zero disables the heartbeat.
    #[serde(default = "defaults::default_heartbeat_ms")]
    #[ortho_config(default = DEFAULT_HEARTBEAT_MS)]
    pub heartbeat_ms: u64,
    /// Interval between partial output flushes in milliseconds.
    #[serde(default = "defaults::default_flush_interval_ms")]
    #[ortho_config(default = DEFAULT_FLUSH_INTERVAL_MS)]
    pub flush_interval_ms: u64,
    /// Identity allowed to connect to the endpoint.
    #[serde(default)]
    #[ortho_config(default = AccessScope::default())]
    pub access: AccessScope,
    /// `tracing` filter expression.
    #[serde(default = "default_log_filter")]
    #[ortho_config(default = default_log_filter())]
    pub log_filter: String,
    /// Log output format.
    #[serde(default = "default_log_format")]
    #[ortho_config(default = default_log_format())]
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            heartbeat_ms: DEFAULT_HEARTBEAT_MS,
            flush_interval_ms: DEFAULT_FLUSH_INTERVAL_MS,
            access: AccessScope::default(),
            log_filter: default_log_filter(),
            log_format: default_log_format(),
        }
    }
}

impl Config {
    /// Endpoint the daemon listens on.
    #[must_use]
    pub fn endpoint(&self) -> &PipeName {
        &self.endpoint
    }

    /// Connection ceiling for the pool.
    #[must_use]
    pub fn max_connections(&self) -> usize {
        self.max_connections
    }

    /// Returns `true` when the control endpoint should not be opened at all.
    #[must_use]
    pub fn endpoint_disabled(&self) -> bool {
        self.max_connections == 0
    }

    /// Pool heartbeat period, or `None` when the heartbeat is disabled.
    #[must_use]
    pub fn heartbeat(&self) -> Option<Duration> {
        (self.heartbeat_ms > 0).then(|| Duration::from_millis(self.heartbeat_ms))
    }

    /// Period between partial output flushes.
    ///
    /// A zero value falls back to the default cadence.
    #[must_use]
    pub fn flush_interval(&self) -> Duration {
        let millis = if self.flush_interval_ms == 0 {
            DEFAULT_FLUSH_INTERVAL_MS
        } else {
            self.flush_interval_ms
        };
        Duration::from_millis(millis)
    }

    /// Identity allowed to connect.
    #[must_use]
    pub fn access(&self) -> AccessScope {
        self.access
    }

    /// Configured log filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Configured log format.
    #[must_use]
    pub fn log_format(&self) -> LogFormat {
        self.log_format
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_enable_endpoint_without_heartbeat() {
        let config = Config::default();
        assert!(!config.endpoint_disabled());
        assert_eq!(config.max_connections(), DEFAULT_MAX_CONNECTIONS);
        assert_eq!(config.heartbeat(), None);
        assert_eq!(config.flush_interval(), Duration::from_millis(250));
    }

    #[test]
    fn heartbeat_sentinel_is_zero() {
        let config = Config {
            heartbeat_ms: 500,
            ..Config::default()
        };
        assert_eq!(config.heartbeat(), Some(Duration::from_millis(500)));
    }

    #[test]
    fn zero_connections_disable_endpoint() {
        let config = Config {
            max_connections: 0,
            ..Config::default()
        };
        assert!(config.endpoint_disabled());
    }

    #[test]
    fn zero_flush_interval_falls_back_to_default() {
        let config = Config {
            flush_interval_ms: 0,
            ..Config::default()
        };
        assert_eq!(
            config.flush_interval(),
            Duration::from_millis(DEFAULT_FLUSH_INTERVAL_MS)
        );
    }
}
