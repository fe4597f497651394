//! Daemon bootstrap orchestration.

use std::sync::Arc;

use ortho_config::{OrthoConfig, OrthoError};
use thiserror::Error;

use conduit_config::{Config, PipePreparationError};

use crate::health::HealthReporter;
use crate::telemetry::{self, TelemetryError, TelemetryHandle};

/// Source of the daemon configuration.
pub trait ConfigLoader: Send + Sync {
    /// Resolves the configuration from every layer the loader knows about.
    ///
    /// # Errors
    ///
    /// Returns the loader's error when a layer cannot be read or merged.
    fn load(&self) -> Result<Config, Arc<OrthoError>>;
}

/// Loader reading command-line arguments, environment and config files.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemConfigLoader;

impl ConfigLoader for SystemConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::load()
    }
}

/// Loader returning a configuration resolved elsewhere.
#[derive(Debug, Clone)]
pub struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    /// Wraps `config`.
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(self.config.clone())
    }
}

/// Stage of bootstrap that failed.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// No valid configuration could be resolved.
    #[error("configuration rejected: {source}")]
    Configuration {
        /// Loader failure.
        #[source]
        source: Arc<OrthoError>,
    },
    /// The log subscriber could not be installed.
    #[error("telemetry unavailable: {source}")]
    Telemetry {
        /// Subscriber failure.
        #[source]
        source: TelemetryError,
    },
    /// The endpoint's directory could not be created or secured.
    #[error("control endpoint cannot be prepared: {source}")]
    Endpoint {
        /// Filesystem failure.
        #[source]
        source: PipePreparationError,
    },
}

/// Configured daemon, ready to open its remote-control plane.
pub struct Daemon {
    config: Config,
    telemetry: TelemetryHandle,
    reporter: Arc<dyn HealthReporter>,
}

impl Daemon {
    /// Resolved configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Handle of the installed subscriber.
    #[must_use]
    pub fn telemetry(&self) -> TelemetryHandle {
        self.telemetry
    }

    /// Reporter shared with the remote-control plane.
    #[must_use]
    pub fn reporter(&self) -> Arc<dyn HealthReporter> {
        Arc::clone(&self.reporter)
    }
}

impl std::fmt::Debug for Daemon {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("Daemon")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Loads configuration, installs telemetry and prepares the endpoint.
///
/// `reporter` sees `bootstrap_starting` first and then exactly one of
/// `bootstrap_succeeded` or `bootstrap_failed`.
///
/// # Errors
///
/// Returns the first [`BootstrapError`] raised by any stage.
pub fn bootstrap_with(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn HealthReporter>,
) -> Result<Daemon, BootstrapError> {
    reporter.bootstrap_starting();
    match prepare(loader) {
        Ok((config, telemetry)) => {
            reporter.bootstrap_succeeded(&config);
            Ok(Daemon {
                config,
                telemetry,
                reporter,
            })
        }
        Err(error) => {
            reporter.bootstrap_failed(&error);
            Err(error)
        }
    }
}

fn prepare(loader: &dyn ConfigLoader) -> Result<(Config, TelemetryHandle), BootstrapError> {
    let config = loader
        .load()
        .map_err(|source| BootstrapError::Configuration { source })?;
    let telemetry =
        telemetry::initialise(&config).map_err(|source| BootstrapError::Telemetry { source })?;
    if !config.endpoint_disabled() {
        config
            .endpoint()
            .prepare_filesystem()
            .map_err(|source| BootstrapError::Endpoint { source })?;
    }
    Ok((config, telemetry))
}
