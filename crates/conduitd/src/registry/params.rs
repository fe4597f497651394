//! Binding of handler parameters to invocation sources.
//!
//! Every handler parameter type implements [`CommandParam`], which reports
//! the parameter's role once at registration and extracts its value on each
//! call. Output, connection and cancellation parameters bind to fixed
//! sources. Everything else consumes positional tokens.

use std::fmt::Display;
use std::net::{IpAddr, SocketAddr};
use std::ops::Deref;
use std::path::PathBuf;
use std::str::FromStr;

use tokio_util::sync::CancellationToken;

use conduit_protocol::ConnectionId;

use super::{ArgumentError, Invocation};
use crate::command::OutputSink;

/// Role a parameter plays in an invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamShape {
    /// The command's output sink.
    Output,
    /// The calling connection's identifier.
    Connection,
    /// The command's cancellation token.
    Cancellation,
    /// The raw remainder of the line as one string.
    RestOfLine,
    /// One mandatory token.
    Required,
    /// One token that may be omitted.
    Optional,
    /// Every remaining token.
    Variadic,
}

impl ParamShape {
    /// Returns `true` for shapes that consume user-supplied tokens.
    #[must_use]
    pub const fn is_positional(self) -> bool {
        matches!(
            self,
            Self::RestOfLine | Self::Required | Self::Optional | Self::Variadic
        )
    }
}

/// Static description of one handler parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamSpec {
    /// Role of the parameter.
    pub shape: ParamShape,
    /// Human-readable type label used in help and errors.
    pub label: &'static str,
}

impl ParamSpec {
    /// Spec of a mandatory positional parameter of type `A`.
    #[must_use]
    pub const fn required<A: ArgValue>() -> Self {
        Self {
            shape: ParamShape::Required,
            label: A::LABEL,
        }
    }

    const fn fixed(shape: ParamShape, label: &'static str) -> Self {
        Self { shape, label }
    }
}

/// Handler parameter that can be bound from an [`Invocation`].
pub trait CommandParam: Sized + Send + 'static {
    /// Describes the parameter's role.
    fn spec() -> ParamSpec;

    /// Extracts the parameter value, consuming tokens where appropriate.
    ///
    /// # Errors
    ///
    /// Returns an [`ArgumentError`] when a token is missing or malformed.
    fn extract(invocation: &mut Invocation) -> Result<Self, ArgumentError>;
}

/// Value parsed from a single positional token.
pub trait ArgValue: Sized + Send + 'static {
    /// Human-readable type label.
    const LABEL: &'static str;

    /// Parses one token.
    ///
    /// # Errors
    ///
    /// Returns a description of why the token is unacceptable.
    fn parse_arg(token: &str) -> Result<Self, String>;
}

/// Remainder of the command line, bound verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestOfLine(pub String);

impl RestOfLine {
    /// Borrows the text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the owned text.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl Deref for RestOfLine {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl CommandParam for RestOfLine {
    fn spec() -> ParamSpec {
        ParamSpec::fixed(ParamShape::RestOfLine, "text")
    }

    fn extract(invocation: &mut Invocation) -> Result<Self, ArgumentError> {
        Ok(Self(invocation.arguments.take_rest()))
    }
}

impl CommandParam for OutputSink {
    fn spec() -> ParamSpec {
        ParamSpec::fixed(ParamShape::Output, "output")
    }

    fn extract(invocation: &mut Invocation) -> Result<Self, ArgumentError> {
        Ok(invocation.context.output.clone())
    }
}

impl CommandParam for ConnectionId {
    fn spec() -> ParamSpec {
        ParamSpec::fixed(ParamShape::Connection, "connection")
    }

    fn extract(invocation: &mut Invocation) -> Result<Self, ArgumentError> {
        Ok(invocation.context.connection)
    }
}

impl CommandParam for CancellationToken {
    fn spec() -> ParamSpec {
        ParamSpec::fixed(ParamShape::Cancellation, "cancellation")
    }

    fn extract(invocation: &mut Invocation) -> Result<Self, ArgumentError> {
        Ok(invocation.context.cancel.clone())
    }
}

impl<A: ArgValue> CommandParam for Option<A> {
    fn spec() -> ParamSpec {
        ParamSpec::fixed(ParamShape::Optional, A::LABEL)
    }

    fn extract(invocation: &mut Invocation) -> Result<Self, ArgumentError> {
        let position = invocation.arguments.position();
        invocation
            .arguments
            .next_token()
            .map(|token| parse_token::<A>(position, token))
            .transpose()
    }
}

impl<A: ArgValue> CommandParam for Vec<A> {
    fn spec() -> ParamSpec {
        ParamSpec::fixed(ParamShape::Variadic, A::LABEL)
    }

    fn extract(invocation: &mut Invocation) -> Result<Self, ArgumentError> {
        let mut values = Vec::with_capacity(invocation.arguments.remaining());
        loop {
            let position = invocation.arguments.position();
            let Some(token) = invocation.arguments.next_token() else {
                return Ok(values);
            };
            values.push(parse_token::<A>(position, token)?);
        }
    }
}

/// Extracts a mandatory positional value.
///
/// # Errors
///
/// Returns [`ArgumentError::Missing`] when no token remains and
/// [`ArgumentError::Invalid`] when the token does not parse.
pub fn extract_required<A: ArgValue>(invocation: &mut Invocation) -> Result<A, ArgumentError> {
    let position = invocation.arguments.position();
    let token = invocation
        .arguments
        .next_token()
        .ok_or(ArgumentError::Missing {
            position,
            expected: A::LABEL,
        })?;
    parse_token(position, token)
}

fn parse_token<A: ArgValue>(position: usize, token: &str) -> Result<A, ArgumentError> {
    A::parse_arg(token).map_err(|reason| ArgumentError::Invalid {
        position,
        token: token.to_owned(),
        expected: A::LABEL,
        reason,
    })
}

/// Parses an enum token case-insensitively against its variant names.
///
/// # Errors
///
/// Returns the list of accepted names when nothing matches.
pub fn parse_enum<E>(token: &str) -> Result<E, String>
where
    E: FromStr + strum::VariantNames,
    E::Err: Display,
{
    let variant = E::VARIANTS
        .iter()
        .find(|variant| variant.eq_ignore_ascii_case(token))
        .ok_or_else(|| format!("expected one of: {}", E::VARIANTS.join(", ")))?;
    variant.parse::<E>().map_err(|error| error.to_string())
}

/// Makes enums usable as positional handler parameters.
///
/// The enum must derive `strum::EnumString` and `strum::VariantNames`;
/// tokens match variant names without regard to case.
#[macro_export]
macro_rules! arg_enum {
    ($($ty:ty),+ $(,)?) => {$(
        impl $crate::registry::ArgValue for $ty {
            const LABEL: &'static str = stringify!($ty);

            fn parse_arg(token: &str) -> ::core::result::Result<Self, ::std::string::String> {
                $crate::registry::parse_enum::<Self>(token)
            }
        }

        impl $crate::registry::CommandParam for $ty {
            fn spec() -> $crate::registry::ParamSpec {
                $crate::registry::ParamSpec::required::<Self>()
            }

            fn extract(
                invocation: &mut $crate::registry::Invocation,
            ) -> ::core::result::Result<Self, $crate::registry::ArgumentError> {
                $crate::registry::extract_required(invocation)
            }
        }
    )+};
}

macro_rules! from_str_args {
    ($($ty:ty => $label:literal),+ $(,)?) => {$(
        impl ArgValue for $ty {
            const LABEL: &'static str = $label;

            fn parse_arg(token: &str) -> Result<Self, String> {
                token.parse::<$ty>().map_err(|error| error.to_string())
            }
        }
    )+};
}

macro_rules! required_params {
    ($($ty:ty),+ $(,)?) => {$(
        impl CommandParam for $ty {
            fn spec() -> ParamSpec {
                ParamSpec::required::<Self>()
            }

            fn extract(invocation: &mut Invocation) -> Result<Self, ArgumentError> {
                extract_required(invocation)
            }
        }
    )+};
}

from_str_args!(
    i8 => "int", i16 => "int", i32 => "int", i64 => "int", isize => "int",
    u8 => "uint", u16 => "uint", u32 => "uint", u64 => "uint", usize => "uint",
    f32 => "number", f64 => "number",
    char => "char",
    PathBuf => "path",
    IpAddr => "address",
    SocketAddr => "socket address",
);

impl ArgValue for String {
    const LABEL: &'static str = "string";

    fn parse_arg(token: &str) -> Result<Self, String> {
        Ok(token.to_owned())
    }
}

impl ArgValue for bool {
    const LABEL: &'static str = "bool";

    fn parse_arg(token: &str) -> Result<Self, String> {
        if token.eq_ignore_ascii_case("true") {
            Ok(true)
        } else if token.eq_ignore_ascii_case("false") {
            Ok(false)
        } else {
            Err("expected 'true' or 'false'".to_owned())
        }
    }
}

required_params!(
    String, bool, char, i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64, PathBuf,
    IpAddr, SocketAddr,
);
