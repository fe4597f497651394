//! BDD test world for the bootstrap and remote-control scenarios.

use std::cell::RefCell;
use std::sync::Arc;

use tokio::runtime::Runtime;

use crate::bootstrap::{BootstrapError, ConfigLoader, Daemon, bootstrap_with};
use crate::remote::{RemoteControl, RemoteControlError};
use crate::service::{CommandService, Diagnostics, ServiceFacade, ServiceStatus};

use super::config_loader::{FailingConfigLoader, TestConfigLoader};
use super::reporter::RecordingHealthReporter;

/// Scenario world shared across BDD steps.
pub struct TestWorld {
    runtime: Runtime,
    loader: Box<dyn ConfigLoader>,
    pub reporter: Arc<RecordingHealthReporter>,
    daemon: Option<Daemon>,
    bootstrap_error: Option<BootstrapError>,
    remote: Option<RemoteControl>,
    remote_error: Option<RemoteControlError>,
}

impl TestWorld {
    /// Builds a world with a successful configuration loader.
    #[must_use]
    pub fn new() -> Self {
        Self {
            runtime: Runtime::new().expect("failed to build tokio runtime"),
            loader: Box::new(TestConfigLoader::new()),
            reporter: Arc::new(RecordingHealthReporter::default()),
            daemon: None,
            bootstrap_error: None,
            remote: None,
            remote_error: None,
        }
    }

    /// Installs a loader that always fails.
    pub fn use_failing_loader(&mut self) {
        self.loader = Box::new(FailingConfigLoader);
        self.reset_results();
    }

    /// Installs a loader that succeeds with the given connection ceiling.
    pub fn use_successful_loader(&mut self, max_connections: usize) {
        self.loader = Box::new(TestConfigLoader::new().with_max_connections(max_connections));
        self.reset_results();
    }

    /// Runs the bootstrap sequence once.
    pub fn bootstrap(&mut self) {
        if self.daemon.is_some() || self.bootstrap_error.is_some() {
            return;
        }
        match bootstrap_with(&*self.loader, self.reporter.clone()) {
            Ok(daemon) => self.daemon = Some(daemon),
            Err(error) => self.bootstrap_error = Some(error),
        }
    }

    /// Opens the remote-control plane for the bootstrapped daemon.
    pub fn start_remote_control(&mut self) {
        let Some(daemon) = self.daemon.as_ref() else {
            return;
        };
        let status = Arc::new(ServiceStatus::new());
        let target = Arc::new(Diagnostics::new(Arc::clone(&status)));
        let service: Arc<dyn ServiceFacade> = Arc::new(CommandService::new(target, status));
        let _entered = self.runtime.enter();
        match RemoteControl::start(daemon.config(), service, daemon.reporter()) {
            Ok(remote) => self.remote = remote,
            Err(error) => self.remote_error = Some(error),
        }
    }

    /// Disposes the remote-control plane, if running.
    pub fn stop_remote_control(&mut self) {
        let _entered = self.runtime.enter();
        self.remote.take();
    }

    /// Returns whether bootstrap produced an error.
    pub fn bootstrap_error(&self) -> Option<&BootstrapError> {
        self.bootstrap_error.as_ref()
    }

    /// Returns true when the daemon handle is available.
    #[must_use]
    pub fn daemon_started(&self) -> bool {
        self.daemon.is_some()
    }

    /// The running remote-control plane.
    #[must_use]
    pub fn remote(&self) -> Option<&RemoteControl> {
        self.remote.as_ref()
    }

    /// Error raised while opening the endpoint.
    #[must_use]
    pub fn remote_error(&self) -> Option<&RemoteControlError> {
        self.remote_error.as_ref()
    }

    /// Blocks on `future` using the world's runtime.
    pub fn block_on<F: std::future::Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }

    fn reset_results(&mut self) {
        self.stop_remote_control();
        self.daemon = None;
        self.bootstrap_error = None;
        self.remote_error = None;
    }
}

impl Default for TestWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TestWorld {
    fn drop(&mut self) {
        self.stop_remote_control();
    }
}

/// Default test world fixture.
pub fn world() -> RefCell<TestWorld> {
    RefCell::new(TestWorld::new())
}
