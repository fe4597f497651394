//! Service façade consumed by connections.
//!
//! Connections only know the [`ServiceFacade`] trait: they register on
//! attach, route every request through [`ServiceFacade::execute`] and
//! unregister on close. [`CommandService`] implements it on top of a
//! [`CommandRegistry`](crate::registry::CommandRegistry).

mod command;
mod diagnostics;
mod state;
mod status;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use conduit_protocol::ConnectionId;

use crate::command::{CommandResult, OutputSink};
use crate::connection::ConnectionHandle;

pub use self::command::CommandService;
pub use self::diagnostics::Diagnostics;
pub use self::state::ServiceState;
pub use self::status::{ConnectionSummary, ServiceStatus, StatusSnapshot};

pub(crate) const SERVICE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::service");

/// Host service as seen by the remote-control plane.
#[async_trait]
pub trait ServiceFacade: Send + Sync {
    /// Registers an attached client; `None` refuses the connection.
    fn connect(&self, connection: ConnectionHandle) -> Option<ConnectionId>;

    /// Unregisters a client. Repeated calls for the same id are harmless.
    fn disconnect(&self, connection: ConnectionId);

    /// Runs one command line, writing its output to `output`.
    async fn execute(
        &self,
        connection: ConnectionId,
        command_line: &str,
        output: OutputSink,
        cancel: CancellationToken,
    ) -> CommandResult;

    /// Current lifecycle state.
    fn state(&self) -> ServiceState;
}
