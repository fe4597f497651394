//! Remote-control plane for the Conduit daemon.
//!
//! External clients attach to a named duplex endpoint, send one textual
//! command line per request and receive the command's output as an ordered
//! series of response frames ending in exactly one terminal frame. The
//! crate is layered from the transport upwards:
//!
//! - [`transport`] creates duplex channels on a Unix socket, a Windows
//!   named pipe or an in-memory pair, and frames JSON messages onto them.
//! - [`connection`] runs one accept/read loop per channel and keeps a
//!   bounded, self-replenishing [`ConnectionPool`] of them.
//! - [`command`] buffers and escapes a handler's output and flushes it as
//!   partial and terminal frames.
//! - [`registry`] maps command names to typed handler functions, binding
//!   whitespace-separated tokens to their parameters.
//! - [`service`] is the façade connections talk to, with a registry-backed
//!   implementation and a built-in diagnostics target.
//!
//! [`bootstrap_with`] loads configuration and initialises telemetry, and
//! [`RemoteControl`] opens the endpoint and starts the pool.

mod bootstrap;
pub mod command;
pub mod connection;
mod health;
mod process;
pub mod registry;
mod remote;
pub mod service;
pub mod telemetry;
pub mod transport;

pub use bootstrap::{
    BootstrapError, ConfigLoader, Daemon, StaticConfigLoader, SystemConfigLoader, bootstrap_with,
};
pub use connection::{ConnectionPool, ConnectionState, PoolOptions};
pub use health::{HealthReporter, StructuredHealthReporter};
pub use process::{
    LaunchError, ShutdownError, ShutdownSignal, SystemShutdownSignal, run_daemon, run_daemon_with,
};
pub use remote::{RemoteControl, RemoteControlError};
pub use telemetry::{TelemetryError, TelemetryHandle};

#[cfg(test)]
mod tests;
