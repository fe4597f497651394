//! Test double for [`HealthReporter`] that records structured events for assertions.
//!
//! The recorder captures bootstrap and remote-control lifecycle telemetry so
//! behaviour tests can validate observable events.

use std::sync::{Mutex, PoisonError};

use conduit_config::Config;

use crate::bootstrap::BootstrapError;
use crate::health::HealthReporter;
use crate::remote::RemoteControlError;

/// Structured health events tracked during scenarios.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HealthEvent {
    /// Bootstrap started.
    BootstrapStarting,
    /// Bootstrap completed successfully.
    BootstrapSucceeded,
    /// Bootstrap failed with an error description.
    BootstrapFailed(String),
    /// The pool started on the named endpoint.
    RemoteControlStarted { endpoint: String, max_connections: usize },
    /// The endpoint was disabled by configuration.
    RemoteControlDisabled,
    /// The endpoint failed to open.
    RemoteControlFailed(String),
    /// The pool was disposed.
    RemoteControlStopped(String),
}

/// Records health events for assertions.
#[derive(Debug, Default)]
pub struct RecordingHealthReporter {
    events: Mutex<Vec<HealthEvent>>,
}

impl RecordingHealthReporter {
    /// Captures a copy of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<HealthEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn record(&self, event: HealthEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

impl HealthReporter for RecordingHealthReporter {
    fn bootstrap_starting(&self) {
        self.record(HealthEvent::BootstrapStarting);
    }

    fn bootstrap_succeeded(&self, _config: &Config) {
        self.record(HealthEvent::BootstrapSucceeded);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        self.record(HealthEvent::BootstrapFailed(error.to_string()));
    }

    fn remote_control_started(&self, endpoint: &str, max_connections: usize) {
        self.record(HealthEvent::RemoteControlStarted {
            endpoint: endpoint.to_owned(),
            max_connections,
        });
    }

    fn remote_control_disabled(&self) {
        self.record(HealthEvent::RemoteControlDisabled);
    }

    fn remote_control_failed(&self, error: &RemoteControlError) {
        self.record(HealthEvent::RemoteControlFailed(error.to_string()));
    }

    fn remote_control_stopped(&self, endpoint: &str) {
        self.record(HealthEvent::RemoteControlStopped(endpoint.to_owned()));
    }
}
