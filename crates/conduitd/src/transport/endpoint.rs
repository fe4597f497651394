//! Traits separating the connection state machine from OS channel mechanics.

use std::fmt;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};

use super::TransportError;

/// Bidirectional byte stream between the daemon and one client.
pub trait DuplexChannel: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T> DuplexChannel for T where T: AsyncRead + AsyncWrite + Send + Unpin {}

/// Named endpoint that produces server-side channel instances.
#[async_trait]
pub trait ChannelEndpoint: Send + Sync + fmt::Debug {
    /// Endpoint name used in diagnostics.
    fn name(&self) -> &str;

    /// Creates a server-side channel instance ready to accept one client.
    async fn create(&self) -> Result<Box<dyn PendingChannel>, TransportError>;
}

/// Server-side channel instance that has not yet been attached to a client.
#[async_trait]
pub trait PendingChannel: Send {
    /// Waits until a client attaches and returns the connected stream.
    async fn wait_for_client(self: Box<Self>) -> Result<Box<dyn DuplexChannel>, TransportError>;
}
