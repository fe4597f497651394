//! Explicit registration of command handlers.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::warn;

use super::entry::{CommandEntry, Invoker, ParamDoc};
use super::{Arity, CommandRegistry, Handler, ParamSpec, REGISTRY_TARGET, RegistrationError};

/// Type whose methods are exposed as commands.
pub trait CommandTarget: Send + Sync + Sized + 'static {
    /// Declares the commands of this type.
    fn register(registry: &mut RegistryBuilder<Self>);
}

struct PendingCommand<T> {
    name: String,
    aliases: Vec<String>,
    description: String,
    docs: Vec<ParamDoc>,
    params: Vec<ParamSpec>,
    invoker: Invoker<T>,
}

/// Collects command declarations and validates them into a
/// [`CommandRegistry`].
pub struct RegistryBuilder<T> {
    pending: Vec<PendingCommand<T>>,
}

impl<T: Send + Sync + 'static> RegistryBuilder<T> {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            pending: Vec::new(),
        }
    }

    /// Declares a command backed by `handler`.
    ///
    /// The handler's parameter list is inspected here; the returned builder
    /// adds aliases and documentation.
    pub fn command<H, M>(&mut self, name: &str, handler: H) -> CommandBuilder<'_, T>
    where
        H: Handler<T, M>,
    {
        let invoker: Invoker<T> =
            Arc::new(move |target, invocation| handler.clone().bind(target, invocation));
        self.pending.push(PendingCommand {
            name: name.trim().to_owned(),
            aliases: Vec::new(),
            description: String::new(),
            docs: Vec::new(),
            params: H::params(),
            invoker,
        });
        let index = self.pending.len() - 1;
        CommandBuilder {
            command: &mut self.pending[index],
        }
    }

    /// Validates every declaration and builds the registry.
    ///
    /// Invalid declarations are skipped with a warning and recorded in
    /// [`CommandRegistry::rejected`]; earlier declarations win name
    /// collisions.
    #[must_use]
    pub fn build(self) -> CommandRegistry<T> {
        let mut entries: Vec<Arc<CommandEntry<T>>> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut rejected = Vec::new();

        for pending in self.pending {
            match validate(&pending, &index) {
                Ok(arity) => {
                    let position = entries.len();
                    let name = pending.name.to_lowercase();
                    index.insert(name.clone(), position);
                    let mut aliases = Vec::new();
                    for alias in &pending.aliases {
                        let alias = alias.to_lowercase();
                        if alias == name || aliases.contains(&alias) {
                            continue;
                        }
                        if index.contains_key(&alias) || !is_valid_name(&alias) {
                            let error = RegistrationError::DuplicateAlias {
                                command: name.clone(),
                                alias,
                            };
                            warn!(target: REGISTRY_TARGET, %error, "alias dropped");
                            rejected.push(error);
                            continue;
                        }
                        index.insert(alias.clone(), position);
                        aliases.push(alias);
                    }
                    entries.push(Arc::new(CommandEntry {
                        name,
                        aliases,
                        description: pending.description,
                        params: pending.params,
                        docs: pending.docs,
                        arity,
                        invoker: pending.invoker,
                    }));
                }
                Err(error) => {
                    warn!(target: REGISTRY_TARGET, %error, "command rejected");
                    rejected.push(error);
                }
            }
        }

        CommandRegistry::from_parts(entries, index, rejected)
    }
}

impl<T: Send + Sync + 'static> Default for RegistryBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && !name.chars().any(char::is_whitespace)
}

fn validate<T>(
    pending: &PendingCommand<T>,
    index: &HashMap<String, usize>,
) -> Result<Arity, RegistrationError> {
    let name = pending.name.to_lowercase();
    if !is_valid_name(&name) {
        return Err(RegistrationError::InvalidName { name });
    }
    if index.contains_key(&name) {
        return Err(RegistrationError::DuplicateName { name });
    }
    Arity::from_params(&name, &pending.params)
}

/// Adds metadata to a declared command.
pub struct CommandBuilder<'a, T> {
    command: &'a mut PendingCommand<T>,
}

impl<T> CommandBuilder<'_, T> {
    /// Adds an alternative name.
    pub fn alias(self, alias: &str) -> Self {
        self.command.aliases.push(alias.trim().to_owned());
        self
    }

    /// Sets the description shown in help.
    pub fn describe(self, description: &str) -> Self {
        description.clone_into(&mut self.command.description);
        self
    }

    /// Names and documents the next positional parameter.
    pub fn param(self, name: &str, description: &str) -> Self {
        self.command.docs.push(ParamDoc {
            name: name.to_owned(),
            description: description.to_owned(),
        });
        self
    }
}
