//! Response sequence markers.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Position of a response frame within the stream for one request.
///
/// Encoded on the wire as an integer: `0` for partial output, `-1` for
/// successful completion, `-2` for completion with an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i32", try_from = "i32")]
pub enum Sequence {
    /// Intermediate flush; may repeat any number of times.
    Partial,
    /// Terminal frame for a command that completed.
    Completed,
    /// Terminal frame for a command that failed.
    Failed,
}

impl Sequence {
    /// Returns the wire value.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::Partial => 0,
            Self::Completed => -1,
            Self::Failed => -2,
        }
    }

    /// Returns `true` for the frames that end a response stream.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Error raised for sequence values outside `{0, -1, -2}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid response sequence {0}")]
pub struct InvalidSequence(pub i32);

impl TryFrom<i32> for Sequence {
    type Error = InvalidSequence;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Partial),
            -1 => Ok(Self::Completed),
            -2 => Ok(Self::Failed),
            other => Err(InvalidSequence(other)),
        }
    }
}

impl From<Sequence> for i32 {
    fn from(sequence: Sequence) -> Self {
        sequence.code()
    }
}
