//! Defines the unified error surface for daemon launch and supervision.

use thiserror::Error;

use crate::bootstrap::BootstrapError;
use crate::remote::RemoteControlError;

use super::shutdown::ShutdownError;

/// Errors surfaced while launching or supervising the daemon process.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// Bootstrap failed before the endpoint was opened.
    #[error(transparent)]
    Bootstrap(#[from] BootstrapError),
    /// The remote-control plane could not be started.
    #[error(transparent)]
    RemoteControl(#[from] RemoteControlError),
    /// Waiting for a shutdown signal failed.
    #[error(transparent)]
    Shutdown(#[from] ShutdownError),
}
