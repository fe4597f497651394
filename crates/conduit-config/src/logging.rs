//! Log output formats understood by the daemon's subscriber.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Shape of each emitted log line.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LogFormat {
    /// One JSON object per event with fields flattened to the top level.
    #[default]
    Json,
    /// Terse single-line text.
    Compact,
    /// Multi-line text for interactive debugging.
    Pretty,
}

impl LogFormat {
    /// Returns `true` for formats meant to be read by people.
    #[must_use]
    pub const fn is_human_readable(self) -> bool {
        matches!(self, Self::Compact | Self::Pretty)
    }
}

/// Failure to parse a [`LogFormat`] from a string.
pub type LogFormatParseError = strum::ParseError;
