//! Registered command metadata.

use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;

use super::{ArgumentError, Invocation, ParamShape, ParamSpec, RegistrationError};
use crate::command::CommandResult;

pub(crate) type Invoker<T> = Arc<
    dyn Fn(Arc<T>, Invocation) -> Result<BoxFuture<'static, CommandResult>, ArgumentError>
        + Send
        + Sync,
>;

/// Accepted range of positional argument counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arity {
    /// Fewest tokens accepted.
    pub min: usize,
    /// Most tokens accepted; `None` when unbounded.
    pub max: Option<usize>,
}

impl Arity {
    /// Derives the bounds from a handler's parameters.
    ///
    /// Required parameters raise both bounds, optional ones raise only the
    /// maximum, and a trailing variadic or rest-of-line parameter removes
    /// the maximum.
    ///
    /// # Errors
    ///
    /// Rejects parameter lists where an open-ended parameter is not last or
    /// a required parameter follows an optional one.
    pub fn from_params(command: &str, params: &[ParamSpec]) -> Result<Self, RegistrationError> {
        let mut arity = Self {
            min: 0,
            max: Some(0),
        };
        let mut seen_optional = false;
        let mut open_ended = None;
        let positional = params.iter().filter(|spec| spec.shape.is_positional());
        for (position, spec) in positional.enumerate() {
            if let Some(shape) = open_ended {
                return Err(RegistrationError::TrailingParameter {
                    command: command.to_owned(),
                    shape,
                });
            }
            match spec.shape {
                ParamShape::Required => {
                    if seen_optional {
                        return Err(RegistrationError::RequiredAfterOptional {
                            command: command.to_owned(),
                            position,
                        });
                    }
                    arity.min += 1;
                    arity.max = arity.max.map(|max| max + 1);
                }
                ParamShape::Optional => {
                    seen_optional = true;
                    arity.max = arity.max.map(|max| max + 1);
                }
                ParamShape::Variadic | ParamShape::RestOfLine => {
                    open_ended = Some(spec.shape);
                    arity.max = None;
                }
                ParamShape::Output | ParamShape::Connection | ParamShape::Cancellation => {}
            }
        }
        Ok(arity)
    }

    /// Returns `true` when `count` tokens satisfy the bounds.
    #[must_use]
    pub fn accepts(self, count: usize) -> bool {
        count >= self.min && self.max.is_none_or(|max| count <= max)
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let plural = |count: usize| if count == 1 { "argument" } else { "arguments" };
        match self.max {
            Some(0) => formatter.write_str("no arguments"),
            Some(max) if max == self.min => write!(formatter, "exactly {max} {}", plural(max)),
            Some(max) => write!(formatter, "{} to {max} arguments", self.min),
            None => write!(formatter, "at least {} {}", self.min, plural(self.min)),
        }
    }
}

/// Documentation for one positional parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamDoc {
    /// Display name.
    pub name: String,
    /// Description shown in help.
    pub description: String,
}

/// One registered command.
pub struct CommandEntry<T> {
    pub(crate) name: String,
    pub(crate) aliases: Vec<String>,
    pub(crate) description: String,
    pub(crate) params: Vec<ParamSpec>,
    pub(crate) docs: Vec<ParamDoc>,
    pub(crate) arity: Arity,
    pub(crate) invoker: Invoker<T>,
}

impl<T> CommandEntry<T> {
    /// Primary name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Alternative names, lower-cased and without duplicates.
    #[must_use]
    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    /// Human-readable description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Parameter specs in declaration order.
    #[must_use]
    pub fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    /// Positional parameter documentation in declaration order.
    #[must_use]
    pub fn docs(&self) -> &[ParamDoc] {
        &self.docs
    }

    /// Accepted argument counts.
    #[must_use]
    pub fn arity(&self) -> Arity {
        self.arity
    }

    /// Positional parameters paired with their display names.
    pub(crate) fn positional(&self) -> impl Iterator<Item = (&ParamSpec, &str)> {
        self.params
            .iter()
            .filter(|spec| spec.shape.is_positional())
            .enumerate()
            .map(|(index, spec)| {
                let name = self
                    .docs
                    .get(index)
                    .map_or(spec.label, |doc| doc.name.as_str());
                (spec, name)
            })
    }
}

impl<T> fmt::Debug for CommandEntry<T> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("CommandEntry")
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .field("arity", &self.arity)
            .finish_non_exhaustive()
    }
}
