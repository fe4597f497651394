//! Error types for connections and the pool.

use thiserror::Error;

use crate::transport::{FrameError, TransportError};

/// Errors that end a connection's loop.
///
/// They are logged and turn into a `Closed` transition; nothing escapes to
/// the pool.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// The channel could not be created or attached.
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// Reading a request failed or produced an invalid frame.
    #[error(transparent)]
    Frame(#[from] FrameError),
}

/// Errors raised when constructing a pool.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PoolError {
    /// The configured ceiling leaves no room for a single connection.
    #[error("connection pool requires at least one connection")]
    ZeroCapacity,
}
