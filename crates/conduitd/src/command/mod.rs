//! Per-request execution context.
//!
//! A [`ConnectedCommand`] exists for every in-flight request. Handler code
//! writes into its [`OutputSink`]; a flush task and the completion path
//! turn the buffer into ordered response frames on the owning connection.

mod context;
mod output;
mod result;

pub use self::context::{ConnectedCommand, ResponseSink};
pub(crate) use self::context::Completion;
pub use self::output::OutputSink;
pub use self::result::{CommandError, CommandResult, CommandStatus, IntoCommandResult};

pub(crate) const COMMAND_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::command");
