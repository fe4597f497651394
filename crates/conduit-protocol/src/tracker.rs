//! Client-side reassembly of response streams.

use std::collections::HashMap;

use thiserror::Error;

use crate::escape::{EscapeError, unescape};
use crate::ids::RequestId;
use crate::message::CommandResponse;
use crate::sequence::Sequence;

/// Errors raised when a response stream violates the protocol.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrackerError {
    /// A frame arrived after the terminal frame for its request.
    #[error("frame for request {id} arrived after its terminal frame")]
    AfterTerminal {
        /// Request identifier of the offending frame.
        id: RequestId,
    },
    /// A chunk could not be unescaped.
    #[error("invalid chunk for request {id}: {source}")]
    Escape {
        /// Request identifier of the offending frame.
        id: RequestId,
        /// Underlying escape error.
        #[source]
        source: EscapeError,
    },
}

/// Output of a request whose terminal frame has arrived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedResponse {
    /// Request identifier.
    pub id: RequestId,
    /// Terminal sequence ([`Sequence::Completed`] or [`Sequence::Failed`]).
    pub sequence: Sequence,
    /// Unescaped output accumulated across all frames.
    pub output: String,
}

impl CompletedResponse {
    /// Returns `true` when the command completed without error.
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.sequence == Sequence::Completed
    }
}

#[derive(Debug, Default)]
struct PendingStream {
    output: String,
    frames: usize,
}

/// Accumulates response frames per request and enforces terminal exclusivity.
#[derive(Debug, Default)]
pub struct ResponseTracker {
    pending: HashMap<RequestId, PendingStream>,
    finished: HashMap<RequestId, Sequence>,
}

impl ResponseTracker {
    /// Creates an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a frame, returning the completed response on terminal frames.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::AfterTerminal`] if the request already ended and
    /// [`TrackerError::Escape`] if the chunk is not validly escaped.
    pub fn accept(
        &mut self,
        response: &CommandResponse,
    ) -> Result<Option<CompletedResponse>, TrackerError> {
        if self.finished.contains_key(&response.id) {
            return Err(TrackerError::AfterTerminal { id: response.id });
        }
        let text = unescape(&response.chunk).map_err(|source| TrackerError::Escape {
            id: response.id,
            source,
        })?;
        let stream = self.pending.entry(response.id).or_default();
        stream.output.push_str(&text);
        stream.frames += 1;

        if !response.sequence.is_terminal() {
            return Ok(None);
        }
        let finished = self.pending.remove(&response.id).unwrap_or_default();
        self.finished.insert(response.id, response.sequence);
        Ok(Some(CompletedResponse {
            id: response.id,
            sequence: response.sequence,
            output: finished.output,
        }))
    }

    /// Returns the output received so far for an unfinished request.
    #[must_use]
    pub fn partial_output(&self, id: &RequestId) -> Option<&str> {
        self.pending.get(id).map(|stream| stream.output.as_str())
    }

    /// Returns the number of frames received for an unfinished request.
    #[must_use]
    pub fn frame_count(&self, id: &RequestId) -> usize {
        self.pending.get(id).map_or(0, |stream| stream.frames)
    }

    /// Returns the terminal sequence for a finished request.
    #[must_use]
    pub fn terminal(&self, id: &RequestId) -> Option<Sequence> {
        self.finished.get(id).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assembles_partial_frames() {
        let id = RequestId::new();
        let mut tracker = ResponseTracker::new();
        let first = CommandResponse::from_text(id, Sequence::Partial, "hello {");
        let last = CommandResponse::from_text(id, Sequence::Completed, "world}\n");

        assert_eq!(tracker.accept(&first).expect("partial"), None);
        assert_eq!(tracker.partial_output(&id), Some("hello {"));
        let done = tracker
            .accept(&last)
            .expect("terminal")
            .expect("completed response");
        assert!(done.succeeded());
        assert_eq!(done.output, "hello {world}\n");
        assert_eq!(tracker.terminal(&id), Some(Sequence::Completed));
    }

    #[test]
    fn rejects_frames_after_terminal() {
        let id = RequestId::new();
        let mut tracker = ResponseTracker::new();
        tracker
            .accept(&CommandResponse::from_text(id, Sequence::Failed, "boom"))
            .expect("terminal frame");
        let error = tracker
            .accept(&CommandResponse::from_text(id, Sequence::Partial, "late"))
            .expect_err("late frame must be rejected");
        assert_eq!(error, TrackerError::AfterTerminal { id });
    }

    #[test]
    fn keeps_streams_independent() {
        let (a, b) = (RequestId::new(), RequestId::new());
        let mut tracker = ResponseTracker::new();
        tracker
            .accept(&CommandResponse::from_text(a, Sequence::Partial, "a1"))
            .expect("a1");
        tracker
            .accept(&CommandResponse::from_text(b, Sequence::Completed, "b"))
            .expect("b");
        assert_eq!(tracker.frame_count(&a), 1);
        assert_eq!(tracker.partial_output(&a), Some("a1"));
        assert_eq!(tracker.terminal(&b), Some(Sequence::Completed));
    }

    #[test]
    fn reports_invalid_escapes() {
        let id = RequestId::new();
        let mut tracker = ResponseTracker::new();
        let error = tracker
            .accept(&CommandResponse::new(id, Sequence::Partial, "oops\\"))
            .expect_err("dangling escape");
        assert!(matches!(error, TrackerError::Escape { .. }));
    }
}
