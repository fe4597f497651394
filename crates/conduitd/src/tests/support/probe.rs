//! Command target used by connection and dispatch scenarios.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::command::{CommandStatus, OutputSink};
use crate::registry::{CommandTarget, RegistryBuilder};

/// Records calls and exposes commands with controllable timing.
#[derive(Debug, Default)]
pub struct Probe {
    greetings: Mutex<Vec<(String, i32)>>,
    released: AtomicUsize,
}

impl Probe {
    /// Arguments passed to `greet`, in call order.
    #[must_use]
    pub fn greetings(&self) -> Vec<(String, i32)> {
        self.greetings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of `hold` calls that observed cancellation.
    #[must_use]
    pub fn cancelled_holds(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    fn greet(&self, output: OutputSink, name: String, times: Option<i32>) {
        let times = times.unwrap_or(1);
        self.greetings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((name.clone(), times));
        for _ in 0..times {
            writeln!(output, "hello, {name}");
        }
    }

    async fn hold(self: Arc<Self>, output: OutputSink, cancel: CancellationToken) -> CommandStatus {
        output.write_line("holding");
        cancel.cancelled().await;
        self.released.fetch_add(1, Ordering::SeqCst);
        output.write_line("released");
        CommandStatus::Succeeded
    }

    async fn stream(self: Arc<Self>, output: OutputSink, count: u32, pause_ms: u64) {
        for index in 0..count {
            writeln!(output, "line {index}");
            tokio::time::sleep(Duration::from_millis(pause_ms)).await;
        }
    }
}

impl CommandTarget for Probe {
    fn register(registry: &mut RegistryBuilder<Self>) {
        registry
            .command("greet", Self::greet)
            .describe("Greets someone.")
            .param("name", "Person to greet.")
            .param("times", "Number of greetings.");
        registry.command("hold", Self::hold);
        registry.command("stream", Self::stream);
        registry.command("refuse", |_: &Self, output: OutputSink| {
            output.write_line("partial {output}");
            false
        });
        registry.command("broken", |_: &Self, output: OutputSink| -> Result<(), String> {
            output.write_line("discarded");
            Err("disk on fire".to_owned())
        });
        registry.command("explode", |_: &Self| -> bool { panic!("kaboom") });
    }
}
