//! Shutdown notification.

use std::io;

use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::PROCESS_TARGET;

/// Abstraction over shutdown notification mechanisms.
#[async_trait]
pub trait ShutdownSignal: Send + Sync {
    /// Resolves once shutdown should proceed.
    async fn wait(&self) -> Result<(), ShutdownError>;
}

/// Errors reported by shutdown signal listeners.
#[derive(Debug, Error)]
pub enum ShutdownError {
    /// Installing signal handlers failed.
    #[error("failed to install signal handlers: {source}")]
    Install {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Shutdown listener that waits for termination signals.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemShutdownSignal;

impl SystemShutdownSignal {
    /// Builds a signal listener.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ShutdownSignal for SystemShutdownSignal {
    #[cfg(unix)]
    async fn wait(&self) -> Result<(), ShutdownError> {
        use tokio::signal::unix::{SignalKind, signal};

        let install = |kind: SignalKind| signal(kind).map_err(|source| ShutdownError::Install { source });
        let mut terminate = install(SignalKind::terminate())?;
        let mut interrupt = install(SignalKind::interrupt())?;
        let mut quit = install(SignalKind::quit())?;
        let mut hangup = install(SignalKind::hangup())?;
        let name = tokio::select! {
            _ = terminate.recv() => "SIGTERM",
            _ = interrupt.recv() => "SIGINT",
            _ = quit.recv() => "SIGQUIT",
            _ = hangup.recv() => "SIGHUP",
        };
        info!(target: PROCESS_TARGET, signal = name, "shutdown signal received");
        Ok(())
    }

    #[cfg(not(unix))]
    async fn wait(&self) -> Result<(), ShutdownError> {
        tokio::signal::ctrl_c()
            .await
            .map_err(|source| ShutdownError::Install { source })?;
        info!(target: PROCESS_TARGET, signal = "ctrl-c", "shutdown signal received");
        Ok(())
    }
}

#[async_trait]
impl ShutdownSignal for CancellationToken {
    async fn wait(&self) -> Result<(), ShutdownError> {
        self.cancelled().await;
        Ok(())
    }
}
