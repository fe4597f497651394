//! Registry-backed service façade.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use conduit_protocol::ConnectionId;

use super::{SERVICE_TARGET, ServiceFacade, ServiceState, ServiceStatus};
use crate::command::{CommandResult, CommandStatus, OutputSink};
use crate::connection::ConnectionHandle;
use crate::registry::{CommandContext, CommandRegistry, CommandTarget, split_command_line};

/// Serves commands declared by `T`.
///
/// Dispatch failures are written to the command output and reported as
/// [`CommandStatus::Failed`]. `help` and `help <command>` are answered from
/// the registry unless `T` declares its own `help`.
pub struct CommandService<T> {
    target: Arc<T>,
    registry: Arc<CommandRegistry<T>>,
    status: Arc<ServiceStatus>,
}

impl<T: CommandTarget> CommandService<T> {
    /// Builds the registry for `T` and wraps `target`.
    #[must_use]
    pub fn new(target: Arc<T>, status: Arc<ServiceStatus>) -> Self {
        Self::with_registry(target, Arc::new(CommandRegistry::for_target()), status)
    }
}

impl<T> CommandService<T> {
    /// Uses an already built registry.
    #[must_use]
    pub const fn with_registry(
        target: Arc<T>,
        registry: Arc<CommandRegistry<T>>,
        status: Arc<ServiceStatus>,
    ) -> Self {
        Self {
            target,
            registry,
            status,
        }
    }

    /// Shared status.
    #[must_use]
    pub const fn status(&self) -> &Arc<ServiceStatus> {
        &self.status
    }

    /// Command table.
    #[must_use]
    pub const fn registry(&self) -> &Arc<CommandRegistry<T>> {
        &self.registry
    }

    fn builtin_help(&self, command_line: &str, output: &OutputSink) -> Option<CommandStatus> {
        let (name, topic) = split_command_line(command_line)?;
        if !name.eq_ignore_ascii_case("help") || self.registry.contains("help") {
            return None;
        }
        let topic = topic.trim();
        if topic.is_empty() {
            output.write(&self.registry.help());
            return Some(CommandStatus::Succeeded);
        }
        if let Some(text) = self.registry.help_for(topic) {
            output.write(&text);
            Some(CommandStatus::Succeeded)
        } else {
            writeln!(output, "unknown command '{topic}'");
            Some(CommandStatus::Failed)
        }
    }
}

#[async_trait]
impl<T: Send + Sync + 'static> ServiceFacade for CommandService<T> {
    fn connect(&self, connection: ConnectionHandle) -> Option<ConnectionId> {
        if self.status.state().is_terminal() {
            return None;
        }
        let id = ConnectionId::new();
        info!(
            target: SERVICE_TARGET,
            connection = %id,
            serial = ?connection.serial(),
            "client registered"
        );
        self.status.register(id, connection);
        Some(id)
    }

    fn disconnect(&self, connection: ConnectionId) {
        if self.status.unregister(connection) {
            info!(target: SERVICE_TARGET, connection = %connection, "client unregistered");
        }
    }

    async fn execute(
        &self,
        connection: ConnectionId,
        command_line: &str,
        output: OutputSink,
        cancel: CancellationToken,
    ) -> CommandResult {
        let state = self.status.state();
        if !state.accepts_commands() {
            writeln!(output, "service is {state}; command refused");
            return Ok(CommandStatus::Failed);
        }
        if let Some(status) = self.builtin_help(command_line, &output) {
            return Ok(status);
        }
        let context = CommandContext {
            output: output.clone(),
            connection,
            cancel,
        };
        match self.registry.run(command_line, Arc::clone(&self.target), context) {
            Ok(call) => call.await,
            Err(error) => {
                debug!(
                    target: SERVICE_TARGET,
                    connection = %connection,
                    error = %error,
                    "command rejected"
                );
                output.write_line(&error.to_string());
                Ok(CommandStatus::Failed)
            }
        }
    }

    fn state(&self) -> ServiceState {
        self.status.state()
    }
}

impl<T> fmt::Debug for CommandService<T> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("CommandService")
            .field("registry", &self.registry)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}
