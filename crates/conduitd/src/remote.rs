//! Remote-control plane wiring: endpoint plus connection pool.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use conduit_config::Config;

use crate::connection::{ConnectionPool, PoolError, PoolOptions};
use crate::health::HealthReporter;
use crate::service::ServiceFacade;
use crate::transport::{ChannelEndpoint, TransportError, bind_endpoint};

const REMOTE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::remote");

/// Errors raised while opening the control endpoint.
#[derive(Debug, Error)]
pub enum RemoteControlError {
    /// The endpoint could not be bound.
    #[error("failed to bind control endpoint: {0}")]
    Transport(#[from] TransportError),
    /// The pool rejected its options.
    #[error("failed to create connection pool: {0}")]
    Pool(#[from] PoolError),
}

/// Running remote-control plane. Dropping it disposes the pool.
pub struct RemoteControl {
    pool: ConnectionPool,
    endpoint: Arc<dyn ChannelEndpoint>,
    reporter: Arc<dyn HealthReporter>,
}

impl RemoteControl {
    /// Binds the configured endpoint and starts the pool.
    ///
    /// Returns `Ok(None)` when `max_connections` is zero. Must be called
    /// from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns a [`RemoteControlError`] when the endpoint cannot be bound.
    pub fn start(
        config: &Config,
        service: Arc<dyn ServiceFacade>,
        reporter: Arc<dyn HealthReporter>,
    ) -> Result<Option<Self>, RemoteControlError> {
        if config.endpoint_disabled() {
            reporter.remote_control_disabled();
            return Ok(None);
        }
        let started = bind_endpoint(config.endpoint(), config.access())
            .map_err(RemoteControlError::from)
            .and_then(|endpoint| {
                Self::with_endpoint(
                    endpoint,
                    service,
                    PoolOptions::from_config(config),
                    Arc::clone(&reporter),
                )
            });
        match started {
            Ok(remote) => Ok(Some(remote)),
            Err(error) => {
                reporter.remote_control_failed(&error);
                Err(error)
            }
        }
    }

    /// Starts a pool on an already bound endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteControlError::Pool`] when `options` allow no
    /// connections.
    pub fn with_endpoint(
        endpoint: Arc<dyn ChannelEndpoint>,
        service: Arc<dyn ServiceFacade>,
        options: PoolOptions,
        reporter: Arc<dyn HealthReporter>,
    ) -> Result<Self, RemoteControlError> {
        let pool = ConnectionPool::new(Arc::clone(&endpoint), service, options)?;
        reporter.remote_control_started(endpoint.name(), options.max_connections);
        Ok(Self {
            pool,
            endpoint,
            reporter,
        })
    }

    /// The connection pool.
    #[must_use]
    pub const fn pool(&self) -> &ConnectionPool {
        &self.pool
    }

    /// Endpoint name clients connect to.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        self.endpoint.name()
    }

    /// Disposes the pool; equivalent to dropping the value.
    pub fn shutdown(self) {
        drop(self);
    }
}

impl Drop for RemoteControl {
    fn drop(&mut self) {
        if self.pool.is_disposed() {
            return;
        }
        info!(
            target: REMOTE_TARGET,
            endpoint = self.endpoint.name(),
            connected = self.pool.connection_count(),
            "stopping remote control"
        );
        self.pool.dispose();
        self.reporter.remote_control_stopped(self.endpoint.name());
    }
}

impl std::fmt::Debug for RemoteControl {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("RemoteControl")
            .field("endpoint", &self.endpoint.name())
            .field("pool", &self.pool)
            .finish_non_exhaustive()
    }
}
