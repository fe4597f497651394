//! Test harness utilities shared by the daemon suites.

mod config_loader;
mod probe;
mod reporter;
mod sink;
mod world;

use std::future::Future;
use std::time::Duration;

pub use config_loader::{FailingConfigLoader, TestConfigLoader};
pub use probe::Probe;
pub use reporter::{HealthEvent, RecordingHealthReporter};
pub use sink::RecordingSink;
pub use world::{TestWorld, world};

/// Upper bound for any single wait in the suites.
pub const WAIT_LIMIT: Duration = Duration::from_secs(5);

/// Polls `condition` until it holds or [`WAIT_LIMIT`] elapses.
pub async fn eventually(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + WAIT_LIMIT;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}

/// Awaits `future`, panicking if it takes longer than [`WAIT_LIMIT`].
pub async fn within<F: Future>(future: F) -> F::Output {
    tokio::time::timeout(WAIT_LIMIT, future)
        .await
        .expect("operation timed out")
}
