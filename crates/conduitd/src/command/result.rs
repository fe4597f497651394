//! Handler outcomes.

use std::fmt;

use thiserror::Error;

/// Ordinary completion status of a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandStatus {
    /// The command did what it was asked.
    Succeeded,
    /// The command ran but reported failure; buffered output is kept.
    Failed,
}

/// Error raised by a handler; replaces unflushed output with its message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct CommandError {
    message: String,
}

impl CommandError {
    /// Wraps an error message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Error message sent to the client.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Result of executing one command.
pub type CommandResult = Result<CommandStatus, CommandError>;

/// Conversion from handler return values into a [`CommandResult`].
pub trait IntoCommandResult {
    /// Performs the conversion.
    fn into_command_result(self) -> CommandResult;
}

impl IntoCommandResult for () {
    fn into_command_result(self) -> CommandResult {
        Ok(CommandStatus::Succeeded)
    }
}

impl IntoCommandResult for bool {
    fn into_command_result(self) -> CommandResult {
        Ok(if self {
            CommandStatus::Succeeded
        } else {
            CommandStatus::Failed
        })
    }
}

impl IntoCommandResult for CommandStatus {
    fn into_command_result(self) -> CommandResult {
        Ok(self)
    }
}

impl<R, E> IntoCommandResult for Result<R, E>
where
    R: IntoCommandResult,
    E: fmt::Display,
{
    fn into_command_result(self) -> CommandResult {
        match self {
            Ok(value) => value.into_command_result(),
            Err(error) => Err(CommandError::new(error.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn return_values_map_to_statuses() {
        assert_eq!(().into_command_result(), Ok(CommandStatus::Succeeded));
        assert_eq!(false.into_command_result(), Ok(CommandStatus::Failed));
        let failed: Result<(), String> = Err("boom".to_owned());
        assert_eq!(failed.into_command_result(), Err(CommandError::new("boom")));
        let nested: Result<bool, String> = Ok(false);
        assert_eq!(nested.into_command_result(), Ok(CommandStatus::Failed));
    }
}
