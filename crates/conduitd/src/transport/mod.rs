//! Duplex channel endpoints for the remote-control plane.
//!
//! An endpoint hands out one pending channel per idle pool slot. Awaiting
//! the pending channel yields a connected duplex byte stream once a client
//! attaches. Unix domain sockets back the endpoint on Unix, named pipes on
//! Windows, and an in-memory pair in tests.

mod endpoint;
mod errors;
mod framing;
#[cfg(any(test, feature = "test-support"))]
mod memory;
#[cfg(unix)]
mod unix;
#[cfg(windows)]
mod windows;

use std::sync::Arc;

use conduit_config::{AccessScope, PipeName};

pub use self::endpoint::{ChannelEndpoint, DuplexChannel, PendingChannel};
pub use self::errors::TransportError;
pub use self::framing::FrameError;
pub(crate) use self::framing::{FrameReader, FrameWriter, split_channel};
#[cfg(any(test, feature = "test-support"))]
pub use self::memory::{MemoryClient, MemoryEndpoint};
#[cfg(unix)]
pub use self::unix::UnixEndpoint;
#[cfg(windows)]
pub use self::windows::NamedPipeEndpoint;

pub(crate) const TRANSPORT_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::transport");

/// Inbound buffer size for every channel.
pub const INPUT_BUFFER_SIZE: usize = 16 * 1024;

/// Outbound buffer size for every channel.
pub const OUTPUT_BUFFER_SIZE: usize = 32 * 1024;

/// Binds the platform endpoint for `name`.
///
/// Must be called from within a Tokio runtime.
///
/// # Errors
///
/// Returns a [`TransportError`] when the endpoint cannot be created.
pub fn bind_endpoint(
    name: &PipeName,
    access: AccessScope,
) -> Result<Arc<dyn ChannelEndpoint>, TransportError> {
    #[cfg(unix)]
    {
        Ok(Arc::new(UnixEndpoint::bind(name, access)?))
    }

    #[cfg(windows)]
    {
        Ok(Arc::new(NamedPipeEndpoint::new(name, access)?))
    }

    #[cfg(not(any(unix, windows)))]
    {
        let _ = access;
        Err(TransportError::Unsupported {
            endpoint: name.to_string(),
        })
    }
}
