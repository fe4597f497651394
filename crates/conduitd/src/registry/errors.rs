//! Registration and dispatch failures.

use thiserror::Error;

use super::entry::Arity;
use super::params::ParamShape;

/// Problems with a single argument token.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArgumentError {
    /// A required argument was not supplied.
    #[error("missing {expected} argument at position {position}")]
    Missing {
        /// Zero-based argument position.
        position: usize,
        /// Label of the expected type.
        expected: &'static str,
    },
    /// A token could not be converted to the parameter type.
    #[error("argument {position} ('{token}') is not a valid {expected}: {reason}")]
    Invalid {
        /// Zero-based argument position.
        position: usize,
        /// Offending token.
        token: String,
        /// Label of the expected type.
        expected: &'static str,
        /// Conversion failure.
        reason: String,
    },
}

/// Reasons a command is rejected while the registry is built.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    /// The command name was blank or contained whitespace.
    #[error("invalid command name '{name}'")]
    InvalidName {
        /// Offending name.
        name: String,
    },
    /// Another command already uses this name.
    #[error("command name '{name}' is already registered")]
    DuplicateName {
        /// Conflicting name.
        name: String,
    },
    /// An alias collided with an existing name and was dropped.
    #[error("alias '{alias}' of '{command}' is already registered")]
    DuplicateAlias {
        /// Command declaring the alias.
        command: String,
        /// Conflicting alias.
        alias: String,
    },
    /// A positional parameter follows one that consumes every remaining token.
    #[error("'{command}' declares a parameter after its {shape:?} parameter")]
    TrailingParameter {
        /// Offending command.
        command: String,
        /// Shape of the open-ended parameter.
        shape: ParamShape,
    },
    /// A required parameter follows an optional one.
    #[error("'{command}' declares required parameter {position} after an optional one")]
    RequiredAfterOptional {
        /// Offending command.
        command: String,
        /// Zero-based positional index of the required parameter.
        position: usize,
    },
}

/// Failures reported to the caller instead of invoking a handler.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// The command line was blank.
    #[error("empty command line")]
    Empty,
    /// No command is registered under the name.
    #[error("unknown command '{name}'; try 'help'")]
    NotFound {
        /// Requested name.
        name: String,
    },
    /// The argument count is outside the command's bounds.
    #[error("'{command}' expects {arity} but got {given}")]
    Arity {
        /// Command name.
        command: String,
        /// Accepted argument counts.
        arity: Arity,
        /// Number of tokens supplied.
        given: usize,
    },
    /// An argument token could not be bound.
    #[error("'{command}': {source}")]
    InvalidArgument {
        /// Command name.
        command: String,
        /// Binding failure.
        #[source]
        source: ArgumentError,
    },
}
