//! Request and response envelopes.
//!
//! Both envelopes are serialised as a single JSON object per line. Parsing
//! trims the trailing newline and rejects blank lines before handing the
//! payload to `serde_json`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::escape::escape;
use crate::ids::RequestId;
use crate::sequence::Sequence;

/// Errors surfaced while encoding or decoding protocol lines.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The line was blank.
    #[error("empty protocol line")]
    Empty,
    /// The line was not a valid envelope.
    #[error("malformed protocol line: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Command sent by a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandRequest {
    /// Correlation identifier echoed on every response frame.
    pub id: RequestId,
    /// Raw command line: the command name followed by its arguments.
    pub command_line: String,
}

impl CommandRequest {
    /// Builds a request with a fresh identifier.
    #[must_use]
    pub fn new(command_line: impl Into<String>) -> Self {
        Self {
            id: RequestId::new(),
            command_line: command_line.into(),
        }
    }

    /// Parses a request line.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Empty`] for blank lines and
    /// [`ProtocolError::Malformed`] when the JSON does not match the schema.
    pub fn parse(line: &str) -> Result<Self, ProtocolError> {
        parse_line(line)
    }

    /// Serialises the request as a line without the trailing newline.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Malformed`] if serialisation fails.
    pub fn to_line(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Frame of output sent back for a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandResponse {
    /// Identifier of the request this frame answers.
    pub id: RequestId,
    /// Position of the frame within the response stream.
    pub sequence: Sequence,
    /// Escaped output text.
    pub chunk: String,
}

impl CommandResponse {
    /// Builds a frame from an already escaped chunk.
    #[must_use]
    pub fn new(id: RequestId, sequence: Sequence, chunk: impl Into<String>) -> Self {
        Self {
            id,
            sequence,
            chunk: chunk.into(),
        }
    }

    /// Builds a frame, escaping raw text first.
    #[must_use]
    pub fn from_text(id: RequestId, sequence: Sequence, text: &str) -> Self {
        Self::new(id, sequence, escape(text))
    }

    /// Parses a response line.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Empty`] for blank lines and
    /// [`ProtocolError::Malformed`] when the JSON does not match the schema.
    pub fn parse(line: &str) -> Result<Self, ProtocolError> {
        parse_line(line)
    }

    /// Serialises the frame as a line without the trailing newline.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Malformed`] if serialisation fails.
    pub fn to_line(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }
}

fn parse_line<T>(line: &str) -> Result<T, ProtocolError>
where
    T: for<'de> Deserialize<'de>,
{
    let trimmed = line.trim_end();
    if trimmed.trim_start().is_empty() {
        return Err(ProtocolError::Empty);
    }
    Ok(serde_json::from_str(trimmed)?)
}
