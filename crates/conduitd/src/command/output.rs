//! Buffered, escaping output writer handed to command handlers.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use conduit_protocol::escape_into;

/// Character sink that accumulates escaped handler output.
///
/// Clones share one buffer. Writing never blocks on the channel: text is
/// only sent when the owning command flushes.
#[derive(Clone, Default)]
pub struct OutputSink {
    buffer: Arc<Mutex<String>>,
}

impl OutputSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `text`, escaping protocol-significant characters.
    pub fn write(&self, text: &str) {
        escape_into(&mut self.lock(), text);
    }

    /// Appends `text` followed by a newline.
    pub fn write_line(&self, text: &str) {
        let mut buffer = self.lock();
        escape_into(&mut buffer, text);
        buffer.push('\n');
    }

    /// Appends formatted text; backs the `write!` and `writeln!` macros.
    pub fn write_fmt(&self, arguments: fmt::Arguments<'_>) {
        match arguments.as_str() {
            Some(text) => self.write(text),
            None => self.write(&arguments.to_string()),
        }
    }

    /// Returns `true` when nothing is waiting to be flushed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Returns a copy of the escaped buffer without draining it.
    #[must_use]
    pub fn contents(&self) -> String {
        self.lock().clone()
    }

    /// Drains the escaped buffer.
    pub(crate) fn take(&self) -> String {
        std::mem::take(&mut *self.lock())
    }

    /// Discards unflushed output.
    pub(crate) fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, String> {
        self.buffer.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for OutputSink {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("OutputSink")
            .field("buffered", &self.lock().len())
            .finish()
    }
}
