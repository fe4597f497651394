//! Supervises daemon launch sequencing and runtime orchestration.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::bootstrap::{ConfigLoader, SystemConfigLoader, bootstrap_with};
use crate::health::{HealthReporter, StructuredHealthReporter};
use crate::remote::RemoteControl;
use crate::service::{CommandService, Diagnostics, ServiceFacade, ServiceState, ServiceStatus};

use super::errors::LaunchError;
use super::shutdown::{ShutdownSignal, SystemShutdownSignal};
use super::{PROCESS_TARGET, SHUTDOWN_TIMEOUT};

const DRAIN_POLL: Duration = Duration::from_millis(20);

/// Runs the daemon using the production collaborators.
///
/// # Errors
///
/// Returns a [`LaunchError`] when bootstrap, endpoint creation or signal
/// installation fails.
pub async fn run_daemon() -> Result<(), LaunchError> {
    let reporter: Arc<dyn HealthReporter> = Arc::new(StructuredHealthReporter::new());
    run_daemon_with(&SystemConfigLoader, reporter, &SystemShutdownSignal::new()).await
}

/// Runs the daemon with injected collaborators until `shutdown` resolves.
///
/// # Errors
///
/// Returns a [`LaunchError`] when bootstrap, endpoint creation or signal
/// installation fails.
pub async fn run_daemon_with(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn HealthReporter>,
    shutdown: &dyn ShutdownSignal,
) -> Result<(), LaunchError> {
    let daemon = bootstrap_with(loader, reporter)?;
    let status = Arc::new(ServiceStatus::new());
    let target = Arc::new(Diagnostics::new(Arc::clone(&status)));
    let service: Arc<dyn ServiceFacade> =
        Arc::new(CommandService::new(target, Arc::clone(&status)));

    let remote = RemoteControl::start(daemon.config(), service, daemon.reporter())?;
    status.set_state(ServiceState::Running);
    info!(
        target: PROCESS_TARGET,
        endpoint = remote.as_ref().map(RemoteControl::endpoint),
        "daemon running"
    );

    let waited = shutdown.wait().await;
    status.set_state(ServiceState::Stopping);
    drop(remote);
    drain(&status).await;
    status.set_state(ServiceState::Stopped);
    waited?;
    info!(target: PROCESS_TARGET, "shutdown sequence completed");
    Ok(())
}

async fn drain(status: &ServiceStatus) {
    let drained = tokio::time::timeout(SHUTDOWN_TIMEOUT, async {
        while status.connection_count() > 0 {
            tokio::time::sleep(DRAIN_POLL).await;
        }
    })
    .await;
    if drained.is_err() {
        warn!(
            target: PROCESS_TARGET,
            remaining = status.connection_count(),
            timeout_ms = u64::try_from(SHUTDOWN_TIMEOUT.as_millis()).unwrap_or(u64::MAX),
            "clients still attached after shutdown timeout"
        );
    }
}
