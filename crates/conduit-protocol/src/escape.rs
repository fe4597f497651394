//! Escaping of protocol-significant characters in response chunks.

use thiserror::Error;

/// Character used to prefix escaped characters.
pub const ESCAPE_CHAR: char = '\\';

/// Characters that are escaped in handler output.
pub const ESCAPED_CHARS: [char; 3] = ['{', '}', '\\'];

/// Errors raised while reversing [`escape`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EscapeError {
    /// Input ended with an escape character that has nothing to escape.
    #[error("dangling escape character at byte offset {offset}")]
    DanglingEscape {
        /// Byte offset of the dangling escape character.
        offset: usize,
    },
}

/// Returns `true` when the character must be escaped.
#[must_use]
pub fn needs_escape(ch: char) -> bool {
    ESCAPED_CHARS.contains(&ch)
}

/// Appends `text` to `buffer`, prefixing every escaped character.
pub fn escape_into(buffer: &mut String, text: &str) {
    buffer.reserve(text.len());
    for ch in text.chars() {
        if needs_escape(ch) {
            buffer.push(ESCAPE_CHAR);
        }
        buffer.push(ch);
    }
}

/// Escapes `text` into a new string.
#[must_use]
pub fn escape(text: &str) -> String {
    let mut buffer = String::with_capacity(text.len());
    escape_into(&mut buffer, text);
    buffer
}

/// Reverses [`escape`].
///
/// An escape character followed by any character yields that character
/// verbatim, so chunks produced by older escapers that prefixed additional
/// characters still decode.
///
/// # Errors
///
/// Returns [`EscapeError::DanglingEscape`] when the input ends with an
/// unpaired escape character.
pub fn unescape(text: &str) -> Result<String, EscapeError> {
    let mut output = String::with_capacity(text.len());
    let mut chars = text.char_indices();
    while let Some((offset, ch)) = chars.next() {
        if ch != ESCAPE_CHAR {
            output.push(ch);
            continue;
        }
        match chars.next() {
            Some((_, escaped)) => output.push(escaped),
            None => return Err(EscapeError::DanglingEscape { offset }),
        }
    }
    Ok(output)
}
