//! Built-in diagnostic commands hosted by the daemon binary.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use conduit_protocol::ConnectionId;

use super::ServiceStatus;
use crate::command::{CommandStatus, OutputSink};
use crate::registry::{CommandTarget, RegistryBuilder, RestOfLine};

/// Command target exposing liveness and status queries.
#[derive(Debug)]
pub struct Diagnostics {
    status: Arc<ServiceStatus>,
}

impl Diagnostics {
    /// Reports on `status`.
    #[must_use]
    pub const fn new(status: Arc<ServiceStatus>) -> Self {
        Self { status }
    }

    fn ping(&self, output: OutputSink) {
        output.write_line("pong");
    }

    fn echo(&self, output: OutputSink, text: RestOfLine) {
        output.write_line(&text);
    }

    fn status(&self, output: OutputSink) -> Result<(), serde_json::Error> {
        let snapshot = serde_json::to_string_pretty(&self.status.snapshot())?;
        output.write_line(&snapshot);
        Ok(())
    }

    fn connections(&self, output: OutputSink, caller: ConnectionId) {
        let snapshot = self.status.snapshot();
        for summary in snapshot.connections {
            let marker = if summary.id == caller { "*" } else { " " };
            writeln!(
                output,
                "{marker} {} active={}",
                summary.id, summary.active_commands
            );
        }
    }

    async fn sleep(
        self: Arc<Self>,
        output: OutputSink,
        millis: u64,
        cancel: CancellationToken,
    ) -> CommandStatus {
        tokio::select! {
            () = cancel.cancelled() => CommandStatus::Failed,
            () = tokio::time::sleep(Duration::from_millis(millis)) => {
                writeln!(output, "slept {millis} ms");
                CommandStatus::Succeeded
            }
        }
    }
}

impl CommandTarget for Diagnostics {
    fn register(registry: &mut RegistryBuilder<Self>) {
        registry
            .command("ping", Self::ping)
            .describe("Replies with 'pong'.");
        registry
            .command("echo", Self::echo)
            .alias("say")
            .describe("Writes the text back.")
            .param("text", "Text to repeat.");
        registry
            .command("status", Self::status)
            .describe("Prints the service state and attached clients as JSON.");
        registry
            .command("connections", Self::connections)
            .alias("clients")
            .describe("Lists attached clients; '*' marks the caller.");
        registry
            .command("sleep", Self::sleep)
            .describe("Waits, honouring cancellation.")
            .param("millis", "Milliseconds to wait.");
    }
}

#[cfg(test)]
mod tests {
    use rstest::{fixture, rstest};

    use conduit_protocol::unescape;

    use super::*;
    use crate::command::CommandResult;
    use crate::registry::{CommandContext, CommandRegistry};
    use crate::service::ServiceState;

    struct Harness {
        registry: CommandRegistry<Diagnostics>,
        target: Arc<Diagnostics>,
        context: CommandContext,
    }

    impl Harness {
        async fn run(&self, line: &str) -> CommandResult {
            self.registry
                .run(line, Arc::clone(&self.target), self.context.clone())
                .expect("dispatch succeeds")
                .await
        }
    }

    #[fixture]
    fn harness() -> Harness {
        let status = Arc::new(ServiceStatus::new());
        status.set_state(ServiceState::Running);
        Harness {
            registry: CommandRegistry::for_target(),
            target: Arc::new(Diagnostics::new(status)),
            context: CommandContext {
                output: OutputSink::new(),
                connection: ConnectionId::new(),
                cancel: CancellationToken::new(),
            },
        }
    }

    #[rstest]
    fn registers_every_command(harness: Harness) {
        assert!(harness.registry.rejected().is_empty());
        assert_eq!(harness.registry.len(), 5);
        assert!(harness.registry.contains("say"));
    }

    #[rstest]
    #[case("ping", "pong\n")]
    #[case("echo a {b}", "a \\{b\\}\n")]
    #[tokio::test]
    async fn writes_expected_output(harness: Harness, #[case] line: &str, #[case] expected: &str) {
        assert_eq!(harness.run(line).await, Ok(CommandStatus::Succeeded));
        assert_eq!(harness.context.output.contents(), expected);
    }

    #[rstest]
    #[tokio::test]
    async fn status_reports_state_as_json(harness: Harness) {
        harness.run("status").await.expect("status succeeds");
        let text = unescape(&harness.context.output.contents()).expect("valid escapes");
        let value: serde_json::Value = serde_json::from_str(&text).expect("json output");
        assert_eq!(value["state"], "running");
    }

    #[rstest]
    #[tokio::test]
    async fn sleep_stops_when_cancelled(harness: Harness) {
        let call = harness
            .registry
            .run("sleep 10000", Arc::clone(&harness.target), harness.context.clone())
            .expect("dispatch succeeds");
        harness.context.cancel.cancel();
        assert_eq!(call.await, Ok(CommandStatus::Failed));
        assert!(harness.context.output.is_empty());
    }
}
