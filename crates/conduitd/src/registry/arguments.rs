//! Whitespace tokenisation of command lines.

/// Splits a command line into its command name and the raw argument text.
///
/// Returns `None` for blank lines.
#[must_use]
pub fn split_command_line(line: &str) -> Option<(&str, &str)> {
    let trimmed = line.trim_start();
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.find(char::is_whitespace) {
        Some(end) => Some(trimmed.split_at(end)),
        None => Some((trimmed, "")),
    }
}

/// Positional argument tokens of one invocation.
///
/// Tokens are separated by runs of whitespace; empty entries never appear.
/// The original text is kept so a parameter can claim the rest of the line
/// verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Arguments {
    text: String,
    spans: Vec<(usize, usize)>,
    cursor: usize,
}

impl Arguments {
    /// Tokenises `text`.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let mut spans = Vec::new();
        let mut start = None;
        for (index, ch) in text.char_indices() {
            if ch.is_whitespace() {
                if let Some(begin) = start.take() {
                    spans.push((begin, index));
                }
            } else if start.is_none() {
                start = Some(index);
            }
        }
        if let Some(begin) = start {
            spans.push((begin, text.len()));
        }
        Self {
            text: text.to_owned(),
            spans,
            cursor: 0,
        }
    }

    /// Total number of tokens.
    #[must_use]
    pub fn len(&self) -> usize {
        self.spans.len()
    }

    /// Returns `true` when there are no tokens at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// Index of the next unconsumed token.
    #[must_use]
    pub fn position(&self) -> usize {
        self.cursor
    }

    /// Number of tokens not yet consumed.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.spans.len().saturating_sub(self.cursor)
    }

    /// Consumes and returns the next token.
    pub fn next_token(&mut self) -> Option<&str> {
        let (start, end) = *self.spans.get(self.cursor)?;
        self.cursor += 1;
        self.text.get(start..end)
    }

    /// Consumes every remaining token and returns the text they span,
    /// including interior whitespace.
    pub fn take_rest(&mut self) -> String {
        let Some(&(start, _)) = self.spans.get(self.cursor) else {
            return String::new();
        };
        self.cursor = self.spans.len();
        self.text
            .get(start..)
            .map(|rest| rest.trim_end().to_owned())
            .unwrap_or_default()
    }
}
