//! Error types for channel endpoints.

use std::io;

use thiserror::Error;

/// Errors surfaced while creating or accepting channels.
#[derive(Debug, Error)]
pub enum TransportError {
    /// No channel implementation exists for this platform.
    #[error("no channel transport is available for endpoint {endpoint}")]
    Unsupported {
        /// Endpoint that could not be served.
        endpoint: String,
    },
    /// Binding the Unix listener failed.
    #[error("failed to bind unix listener at {path}: {source}")]
    Bind {
        /// Socket path.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// Another process is already serving the socket.
    #[error("existing unix socket {path} is already in use")]
    InUse {
        /// Socket path.
        path: String,
    },
    /// A non-socket file occupies the socket path.
    #[error("unix socket path {path} is not a socket")]
    NotSocket {
        /// Socket path.
        path: String,
    },
    /// Reading metadata for an existing socket failed.
    #[error("failed to read metadata for unix socket {path}: {source}")]
    Metadata {
        /// Socket path.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// Probing an existing socket failed in an unexpected way.
    #[error("failed to connect to existing unix socket {path}: {source}")]
    Probe {
        /// Socket path.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// Removing a stale socket failed.
    #[error("failed to remove stale unix socket {path}: {source}")]
    Cleanup {
        /// Socket path.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// Applying the access mode to the socket failed.
    #[error("failed to restrict access to {path}: {source}")]
    Permissions {
        /// Socket path.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// Creating a server-side channel instance failed.
    #[error("failed to create channel instance for {endpoint}: {source}")]
    Create {
        /// Endpoint name.
        endpoint: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// Waiting for a client failed.
    #[error("failed to accept client on {endpoint}: {source}")]
    Accept {
        /// Endpoint name.
        endpoint: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// The endpoint was shut down while a channel was pending.
    #[error("endpoint {endpoint} is closed")]
    Closed {
        /// Endpoint name.
        endpoint: String,
    },
}
