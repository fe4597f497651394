//! Structured health reporting for daemon lifecycle events.

use std::sync::Arc;

use conduit_config::Config;

use crate::bootstrap::BootstrapError;
use crate::remote::RemoteControlError;

const HEALTH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::health");

/// Observer trait used to surface lifecycle events to telemetry sinks.
pub trait HealthReporter: Send + Sync {
    /// Invoked before configuration loading begins.
    fn bootstrap_starting(&self);

    /// Invoked after bootstrap completes successfully.
    fn bootstrap_succeeded(&self, config: &Config);

    /// Invoked when bootstrap fails.
    fn bootstrap_failed(&self, error: &BootstrapError);

    /// Invoked once the connection pool is accepting clients.
    fn remote_control_started(&self, endpoint: &str, max_connections: usize);

    /// Invoked when `max_connections` is zero and no endpoint is opened.
    fn remote_control_disabled(&self);

    /// Invoked when the endpoint or pool could not be created.
    fn remote_control_failed(&self, error: &RemoteControlError);

    /// Invoked after the pool has been disposed.
    fn remote_control_stopped(&self, endpoint: &str);
}

impl<T> HealthReporter for Arc<T>
where
    T: HealthReporter,
{
    fn bootstrap_starting(&self) {
        (**self).bootstrap_starting();
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        (**self).bootstrap_succeeded(config);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        (**self).bootstrap_failed(error);
    }

    fn remote_control_started(&self, endpoint: &str, max_connections: usize) {
        (**self).remote_control_started(endpoint, max_connections);
    }

    fn remote_control_disabled(&self) {
        (**self).remote_control_disabled();
    }

    fn remote_control_failed(&self, error: &RemoteControlError) {
        (**self).remote_control_failed(error);
    }

    fn remote_control_stopped(&self, endpoint: &str) {
        (**self).remote_control_stopped(endpoint);
    }
}

/// Default reporter that records lifecycle events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredHealthReporter;

impl StructuredHealthReporter {
    /// Builds a new reporter.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl HealthReporter for StructuredHealthReporter {
    fn bootstrap_starting(&self) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_starting",
            "starting daemon bootstrap"
        );
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_succeeded",
            endpoint = %config.endpoint(),
            max_connections = config.max_connections(),
            access = %config.access(),
            log_filter = %config.log_filter(),
            log_format = ?config.log_format(),
            "daemon bootstrap completed"
        );
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "bootstrap_failed",
            error = %error,
            "daemon bootstrap failed"
        );
    }

    fn remote_control_started(&self, endpoint: &str, max_connections: usize) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "remote_control_started",
            endpoint,
            max_connections,
            "remote control listening"
        );
    }

    fn remote_control_disabled(&self) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "remote_control_disabled",
            "remote control disabled by configuration"
        );
    }

    fn remote_control_failed(&self, error: &RemoteControlError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "remote_control_failed",
            error = %error,
            "remote control failed to start"
        );
    }

    fn remote_control_stopped(&self, endpoint: &str) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "remote_control_stopped",
            endpoint,
            "remote control stopped"
        );
    }
}
