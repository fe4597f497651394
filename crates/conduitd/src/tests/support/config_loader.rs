//! Test configuration loaders for scenarios covering success and failure paths.

use std::ffi::OsString;
use std::sync::Arc;

use ortho_config::{OrthoConfig, OrthoError};
use tempfile::TempDir;

use conduit_config::{Config, PipeName};

use crate::bootstrap::ConfigLoader;

/// Loader that provisions an endpoint under a temporary directory.
pub struct TestConfigLoader {
    endpoint_dir: TempDir,
    max_connections: usize,
}

impl TestConfigLoader {
    #[must_use]
    pub fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temporary directory for endpoint");
        Self {
            endpoint_dir: dir,
            max_connections: conduit_config::DEFAULT_MAX_CONNECTIONS,
        }
    }

    /// Overrides the configured connection ceiling.
    #[must_use]
    pub fn with_max_connections(mut self, max_connections: usize) -> Self {
        self.max_connections = max_connections;
        self
    }

    /// Endpoint the loaded configuration points at.
    #[must_use]
    pub fn endpoint(&self) -> PipeName {
        #[cfg(unix)]
        {
            let path = self.endpoint_dir.path().join("run").join("conduitd.sock");
            PipeName::from_unix_path(
                path.to_str()
                    .expect("temporary endpoint path was not valid UTF-8")
                    .to_owned(),
            )
        }

        #[cfg(not(unix))]
        {
            let suffix = self
                .endpoint_dir
                .path()
                .file_name()
                .and_then(|name| name.to_str())
                .expect("temporary directory has a UTF-8 name");
            PipeName::from_windows_pipe(&format!("conduitd-test-{suffix}"))
        }
    }
}

impl Default for TestConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader for TestConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(Config {
            endpoint: self.endpoint(),
            max_connections: self.max_connections,
            log_filter: "warn".to_owned(),
            ..Config::default()
        })
    }
}

/// Loader that intentionally fails by passing a relative endpoint.
pub struct FailingConfigLoader;

impl ConfigLoader for FailingConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        let args = vec![
            OsString::from("conduitd"),
            OsString::from("--endpoint"),
            OsString::from("relative/conduitd.sock"),
        ];
        Config::load_from_iter(args)
    }
}
