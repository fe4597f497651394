//! Opaque correlation identifiers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Error raised when an identifier cannot be parsed.
#[derive(Debug, Error)]
#[error("invalid identifier '{input}': {source}")]
pub struct IdParseError {
    input: String,
    #[source]
    source: uuid::Error,
}

macro_rules! opaque_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Generates a fresh random identifier.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wraps an existing UUID.
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the underlying UUID.
            #[must_use]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(formatter)
            }
        }

        impl FromStr for $name {
            type Err = IdParseError;

            fn from_str(input: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(input.trim())
                    .map(Self)
                    .map_err(|source| IdParseError {
                        input: input.to_owned(),
                        source,
                    })
            }
        }
    };
}

opaque_id! {
    /// Correlates a command request with its response frames.
    RequestId
}

opaque_id! {
    /// Identifies a client connection registered with the service.
    ConnectionId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_are_unique() {
        assert_ne!(RequestId::new(), RequestId::new());
        assert_ne!(ConnectionId::new(), ConnectionId::new());
    }

    #[test]
    fn parses_display_output() {
        let id = RequestId::new();
        let parsed: RequestId = id.to_string().parse().expect("parse request id");
        assert_eq!(parsed, id);
    }

    #[test]
    fn rejects_garbage() {
        let error = "not-a-uuid"
            .parse::<ConnectionId>()
            .expect_err("garbage must fail");
        assert!(error.to_string().contains("not-a-uuid"));
    }

    #[test]
    fn serialises_as_plain_string() {
        let id = RequestId::new();
        let json = serde_json::to_string(&id).expect("serialise id");
        assert_eq!(json, format!("\"{id}\""));
    }
}
