//! Unix domain socket endpoint.
//!
//! One listener is shared by every pool slot. Each pending channel is a
//! claim on the next accepted stream.

use std::fs;
use std::io;
use std::os::unix::fs::{FileTypeExt, PermissionsExt};
use std::os::unix::net::{UnixListener as StdUnixListener, UnixStream as StdUnixStream};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::net::UnixListener;
use tracing::{debug, warn};

use conduit_config::{AccessScope, PipeName};

use super::{ChannelEndpoint, DuplexChannel, PendingChannel, TRANSPORT_TARGET, TransportError};

/// Endpoint backed by a Unix domain socket.
#[derive(Debug)]
pub struct UnixEndpoint {
    name: String,
    path: PathBuf,
    listener: Arc<UnixListener>,
}

impl UnixEndpoint {
    /// Binds the socket, replacing a stale socket file when nobody answers on it.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] when the path is occupied or the socket
    /// cannot be bound.
    pub fn bind(name: &PipeName, access: AccessScope) -> Result<Self, TransportError> {
        let path = name.as_path().as_std_path().to_path_buf();
        let std_listener = bind_unix(&path)?;
        fs::set_permissions(&path, fs::Permissions::from_mode(access.unix_mode())).map_err(
            |source| TransportError::Permissions {
                path: path.display().to_string(),
                source,
            },
        )?;
        let bind_error = |source| TransportError::Bind {
            path: path.display().to_string(),
            source,
        };
        std_listener.set_nonblocking(true).map_err(bind_error)?;
        let listener = UnixListener::from_std(std_listener).map_err(bind_error)?;
        debug!(
            target: TRANSPORT_TARGET,
            path = %path.display(),
            mode = format_args!("{:o}", access.unix_mode()),
            "unix endpoint bound"
        );
        Ok(Self {
            name: name.to_string(),
            path,
            listener: Arc::new(listener),
        })
    }
}

#[async_trait]
impl ChannelEndpoint for UnixEndpoint {
    fn name(&self) -> &str {
        &self.name
    }

    async fn create(&self) -> Result<Box<dyn PendingChannel>, TransportError> {
        Ok(Box::new(PendingUnixChannel {
            name: self.name.clone(),
            listener: Arc::clone(&self.listener),
        }))
    }
}

impl Drop for UnixEndpoint {
    fn drop(&mut self) {
        if let Err(error) = fs::remove_file(&self.path)
            && error.kind() != io::ErrorKind::NotFound
        {
            warn!(
                target: TRANSPORT_TARGET,
                error = %error,
                path = %self.path.display(),
                "failed to remove unix socket file"
            );
        }
    }
}

struct PendingUnixChannel {
    name: String,
    listener: Arc<UnixListener>,
}

#[async_trait]
impl PendingChannel for PendingUnixChannel {
    async fn wait_for_client(self: Box<Self>) -> Result<Box<dyn DuplexChannel>, TransportError> {
        let (stream, _) =
            self.listener
                .accept()
                .await
                .map_err(|source| TransportError::Accept {
                    endpoint: self.name.clone(),
                    source,
                })?;
        Ok(Box::new(stream))
    }
}

fn bind_unix(path: &Path) -> Result<StdUnixListener, TransportError> {
    if path.exists() {
        let metadata = fs::symlink_metadata(path).map_err(|source| TransportError::Metadata {
            path: path.display().to_string(),
            source,
        })?;
        if !metadata.file_type().is_socket() {
            return Err(TransportError::NotSocket {
                path: path.display().to_string(),
            });
        }
        match StdUnixStream::connect(path) {
            Ok(_stream) => {
                return Err(TransportError::InUse {
                    path: path.display().to_string(),
                });
            }
            Err(error)
                if error.kind() == io::ErrorKind::ConnectionRefused
                    || error.kind() == io::ErrorKind::NotFound =>
            {
                fs::remove_file(path).map_err(|source| TransportError::Cleanup {
                    path: path.display().to_string(),
                    source,
                })?;
            }
            Err(error) => {
                return Err(TransportError::Probe {
                    path: path.display().to_string(),
                    source: error,
                });
            }
        }
    }

    StdUnixListener::bind(path).map_err(|source| TransportError::Bind {
        path: path.display().to_string(),
        source,
    })
}
