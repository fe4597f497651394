//! Response sink double that records every frame it is asked to send.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use conduit_protocol::{CommandResponse, RequestId, Sequence};

use crate::command::ResponseSink;

/// Sink collecting frames and released identifiers.
#[derive(Debug, Default)]
pub struct RecordingSink {
    frames: Mutex<Vec<CommandResponse>>,
    released: Mutex<Vec<RequestId>>,
    refuse: bool,
}

impl RecordingSink {
    /// Sink that reports every send as undeliverable.
    #[must_use]
    pub fn refusing() -> Self {
        Self {
            refuse: true,
            ..Self::default()
        }
    }

    /// Frames received so far.
    #[must_use]
    pub fn frames(&self) -> Vec<CommandResponse> {
        self.frames
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Sequences of the frames received so far.
    #[must_use]
    pub fn sequences(&self) -> Vec<Sequence> {
        self.frames().iter().map(|frame| frame.sequence).collect()
    }

    /// Identifiers released by their commands.
    #[must_use]
    pub fn released(&self) -> Vec<RequestId> {
        self.released
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl ResponseSink for RecordingSink {
    async fn send(&self, response: CommandResponse) -> bool {
        if self.refuse {
            return false;
        }
        self.frames
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(response);
        true
    }

    fn release(&self, id: RequestId) {
        self.released
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(id);
    }
}
