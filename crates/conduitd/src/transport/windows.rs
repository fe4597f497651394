//! Windows named pipe endpoint.
//!
//! Every pool slot owns its own pipe instance. Only the first instance is
//! created with the first-instance guard so a second daemon cannot squat on
//! the same name.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::net::windows::named_pipe::{NamedPipeServer, PipeMode, ServerOptions};

use conduit_config::{AccessScope, PipeName};

use super::{
    ChannelEndpoint, DuplexChannel, INPUT_BUFFER_SIZE, OUTPUT_BUFFER_SIZE, PendingChannel,
    TransportError,
};

/// Endpoint backed by a local named pipe.
#[derive(Debug)]
pub struct NamedPipeEndpoint {
    name: String,
    first_instance: AtomicBool,
}

impl NamedPipeEndpoint {
    /// Prepares an endpoint for `name`.
    ///
    /// Remote clients are always rejected. The access scope is advisory on
    /// Windows: instances inherit the default pipe security descriptor.
    ///
    /// # Errors
    ///
    /// Currently infallible; the signature matches the Unix endpoint.
    pub fn new(name: &PipeName, access: AccessScope) -> Result<Self, TransportError> {
        tracing::debug!(
            target: super::TRANSPORT_TARGET,
            pipe = %name,
            access = %access,
            "named pipe endpoint prepared"
        );
        Ok(Self {
            name: name.to_string(),
            first_instance: AtomicBool::new(true),
        })
    }

    fn create_instance(&self) -> Result<NamedPipeServer, TransportError> {
        let first = self.first_instance.swap(false, Ordering::AcqRel);
        ServerOptions::new()
            .first_pipe_instance(first)
            .reject_remote_clients(true)
            .pipe_mode(PipeMode::Byte)
            .in_buffer_size(INPUT_BUFFER_SIZE as u32)
            .out_buffer_size(OUTPUT_BUFFER_SIZE as u32)
            .create(&self.name)
            .map_err(|source| TransportError::Create {
                endpoint: self.name.clone(),
                source,
            })
    }
}

#[async_trait]
impl ChannelEndpoint for NamedPipeEndpoint {
    fn name(&self) -> &str {
        &self.name
    }

    async fn create(&self) -> Result<Box<dyn PendingChannel>, TransportError> {
        let server = self.create_instance()?;
        Ok(Box::new(PendingPipe {
            name: self.name.clone(),
            server,
        }))
    }
}

struct PendingPipe {
    name: String,
    server: NamedPipeServer,
}

#[async_trait]
impl PendingChannel for PendingPipe {
    async fn wait_for_client(self: Box<Self>) -> Result<Box<dyn DuplexChannel>, TransportError> {
        let Self { name, server } = *self;
        server
            .connect()
            .await
            .map_err(|source| TransportError::Accept {
                endpoint: name,
                source,
            })?;
        Ok(Box::new(server))
    }
}
