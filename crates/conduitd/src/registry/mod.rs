//! Textual command registry and dispatch.
//!
//! A [`CommandTarget`] declares its commands once through a
//! [`RegistryBuilder`]. Each declaration pairs a name with a plain function
//! whose parameter types determine how the command line is bound: output,
//! connection and cancellation parameters come from the invocation
//! context, [`RestOfLine`] takes the remaining text verbatim, `Vec<A>`
//! absorbs every remaining token, `Option<A>` may be omitted and any other
//! [`ArgValue`] consumes one token. The resulting [`CommandRegistry`] is
//! immutable and shared by every connection.
//!
//! ```ignore
//! impl CommandTarget for Greeter {
//!     fn register(registry: &mut RegistryBuilder<Self>) {
//!         registry
//!             .command("greet", Self::greet)
//!             .describe("Greets someone.")
//!             .param("name", "Person to greet.")
//!             .param("times", "Number of greetings (default 1).");
//!     }
//! }
//! ```

mod arguments;
mod builder;
mod entry;
mod errors;
mod handler;
mod help;
mod params;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use conduit_protocol::ConnectionId;

use crate::command::{CommandResult, OutputSink};

pub use arguments::{Arguments, split_command_line};
pub use builder::{CommandBuilder, CommandTarget, RegistryBuilder};
pub use entry::{Arity, CommandEntry, ParamDoc};
pub use errors::{ArgumentError, DispatchError, RegistrationError};
pub use handler::{Async, Blocking, Handler};
pub use params::{
    ArgValue, CommandParam, ParamShape, ParamSpec, RestOfLine, extract_required, parse_enum,
};

pub(crate) const REGISTRY_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::registry");

/// Fixed sources available to every command invocation.
#[derive(Debug, Clone)]
pub struct CommandContext {
    /// Sink receiving the command's output.
    pub output: OutputSink,
    /// Identifier of the calling connection.
    pub connection: ConnectionId,
    /// Cancellation signal for the command.
    pub cancel: CancellationToken,
}

/// One call being bound to a handler.
#[derive(Debug)]
pub struct Invocation {
    pub(crate) context: CommandContext,
    pub(crate) arguments: Arguments,
}

impl Invocation {
    /// Pairs the context with tokenised arguments.
    #[must_use]
    pub const fn new(context: CommandContext, arguments: Arguments) -> Self {
        Self { context, arguments }
    }

    /// Borrows the invocation context.
    #[must_use]
    pub const fn context(&self) -> &CommandContext {
        &self.context
    }

    /// Borrows the argument tokens.
    #[must_use]
    pub const fn arguments(&self) -> &Arguments {
        &self.arguments
    }

    /// Mutable access for custom [`CommandParam`] implementations.
    pub const fn arguments_mut(&mut self) -> &mut Arguments {
        &mut self.arguments
    }
}

/// Immutable table of commands declared by `T`.
pub struct CommandRegistry<T> {
    entries: Vec<Arc<CommandEntry<T>>>,
    index: HashMap<String, usize>,
    rejected: Vec<RegistrationError>,
}

impl<T: CommandTarget> CommandRegistry<T> {
    /// Builds the registry from `T`'s declarations.
    #[must_use]
    pub fn for_target() -> Self {
        let mut builder = RegistryBuilder::new();
        T::register(&mut builder);
        builder.build()
    }
}

impl<T> CommandRegistry<T> {
    pub(crate) fn from_parts(
        entries: Vec<Arc<CommandEntry<T>>>,
        index: HashMap<String, usize>,
        rejected: Vec<RegistrationError>,
    ) -> Self {
        Self {
            entries,
            index,
            rejected,
        }
    }

    /// Looks up a command by name or alias, ignoring case.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&CommandEntry<T>> {
        self.index
            .get(&name.to_lowercase())
            .and_then(|position| self.entries.get(*position))
            .map(AsRef::as_ref)
    }

    /// Returns `true` when `name` resolves to a command.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Iterates commands in registration order.
    pub fn commands(&self) -> impl Iterator<Item = &CommandEntry<T>> {
        self.entries.iter().map(AsRef::as_ref)
    }

    /// Number of registered commands, aliases excluded.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when no command was accepted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Declarations skipped while building.
    #[must_use]
    pub fn rejected(&self) -> &[RegistrationError] {
        &self.rejected
    }

    /// Resolves `command_line`, binds its arguments and returns the call.
    ///
    /// Arity is checked before any argument is parsed, so a rejected call
    /// never enters the handler.
    ///
    /// # Errors
    ///
    /// Returns a [`DispatchError`] for blank lines, unknown names, argument
    /// counts outside the command's bounds and tokens that fail to parse.
    pub fn run(
        &self,
        command_line: &str,
        target: Arc<T>,
        context: CommandContext,
    ) -> Result<BoxFuture<'static, CommandResult>, DispatchError> {
        let (name, rest) = split_command_line(command_line).ok_or(DispatchError::Empty)?;
        let entry = self.get(name).ok_or_else(|| DispatchError::NotFound {
            name: name.to_owned(),
        })?;
        let arguments = Arguments::parse(rest);
        if !entry.arity().accepts(arguments.len()) {
            return Err(DispatchError::Arity {
                command: entry.name().to_owned(),
                arity: entry.arity(),
                given: arguments.len(),
            });
        }
        debug!(
            target: REGISTRY_TARGET,
            command = entry.name(),
            arguments = arguments.len(),
            "dispatching command"
        );
        (entry.invoker)(target, Invocation::new(context, arguments)).map_err(|source| {
            DispatchError::InvalidArgument {
                command: entry.name().to_owned(),
                source,
            }
        })
    }
}

impl<T> fmt::Debug for CommandRegistry<T> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("CommandRegistry")
            .field("commands", &self.entries)
            .field("rejected", &self.rejected)
            .finish()
    }
}

#[cfg(test)]
mod tests;
