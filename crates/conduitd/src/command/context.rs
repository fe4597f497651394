//! Flush scheduling and terminal-frame bookkeeping for one request.

use std::any::Any;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use conduit_protocol::{CommandResponse, RequestId, Sequence};

use super::{COMMAND_TARGET, CommandResult, CommandStatus, OutputSink};

/// Destination for the frames of in-flight commands.
#[async_trait]
pub trait ResponseSink: Send + Sync {
    /// Sends one frame. Returns `false` when the frame could not be delivered.
    async fn send(&self, response: CommandResponse) -> bool;

    /// Stops tracking the command `id`.
    fn release(&self, id: RequestId);
}

/// How a handler finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Completion {
    Succeeded,
    Failed,
    Errored(String),
    Cancelled,
}

impl Completion {
    fn from_join(joined: Result<CommandResult, JoinError>, cancelled: bool) -> Self {
        match joined {
            Ok(Ok(CommandStatus::Succeeded)) => Self::Succeeded,
            Ok(Ok(CommandStatus::Failed)) => Self::Failed,
            Ok(Err(_)) | Err(_) if cancelled => Self::Cancelled,
            Ok(Err(error)) => Self::Errored(error.message().to_owned()),
            Err(error) if error.is_panic() => {
                Self::Errored(panic_message(error.into_panic().as_ref()))
            }
            Err(_) => Self::Cancelled,
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    let detail = payload
        .downcast_ref::<&str>()
        .map(|text| (*text).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_owned());
    format!("command panicked: {detail}")
}

#[derive(Debug, Default)]
struct FlushState {
    closed: bool,
    last: Option<Sequence>,
}

/// Execution context of one request.
///
/// The output buffer is guarded by a plain mutex so producers never wait
/// on the channel. Sending is serialised by an async mutex, which also
/// records whether the terminal frame has gone out.
pub struct ConnectedCommand {
    id: RequestId,
    output: OutputSink,
    cancel: CancellationToken,
    flush: AsyncMutex<FlushState>,
    sink: Mutex<Option<Weak<dyn ResponseSink>>>,
    disposed: AtomicBool,
}

impl ConnectedCommand {
    /// Creates a context whose cancellation is a child of `parent`.
    pub fn new(id: RequestId, sink: Weak<dyn ResponseSink>, parent: &CancellationToken) -> Arc<Self> {
        Arc::new(Self {
            id,
            output: OutputSink::new(),
            cancel: parent.child_token(),
            flush: AsyncMutex::new(FlushState::default()),
            sink: Mutex::new(Some(sink)),
            disposed: AtomicBool::new(false),
        })
    }

    /// Correlation identifier of the request.
    #[must_use]
    pub fn id(&self) -> RequestId {
        self.id
    }

    /// Sink handed to the handler.
    #[must_use]
    pub fn output(&self) -> OutputSink {
        self.output.clone()
    }

    /// Token the handler observes for cooperative cancellation.
    #[must_use]
    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Returns `true` once the terminal frame has been produced.
    pub async fn is_closed(&self) -> bool {
        self.flush.lock().await.closed
    }

    /// Sequence of the most recent frame sent.
    pub async fn last_sequence(&self) -> Option<Sequence> {
        self.flush.lock().await.last
    }

    /// Runs `handler` alongside the periodic flush task.
    ///
    /// The returned task resolves once the terminal frame has been sent and
    /// the context disposed.
    pub fn spawn<F>(self: &Arc<Self>, interval: Duration, handler: F) -> JoinHandle<()>
    where
        F: Future<Output = CommandResult> + Send + 'static,
    {
        tokio::spawn(Arc::clone(self).flush_loop(interval));
        let handler = tokio::spawn(handler);
        let command = Arc::clone(self);
        tokio::spawn(async move {
            let joined = handler.await;
            let completion = Completion::from_join(joined, command.cancel.is_cancelled());
            debug!(
                target: COMMAND_TARGET,
                id = %command.id,
                completion = ?completion,
                "command finished"
            );
            command.finish(completion).await;
            command.dispose();
        })
    }

    async fn flush_loop(self: Arc<Self>, interval: Duration) {
        let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }
            if !self.flush_partial().await {
                break;
            }
        }
    }

    /// Sends buffered output as a non-final frame.
    ///
    /// Returns `false` once the context is closed and further flushes are
    /// pointless.
    pub async fn flush_partial(&self) -> bool {
        let mut state = self.flush.lock().await;
        if state.closed {
            return false;
        }
        if self.output.is_empty() {
            return true;
        }
        let chunk = self.output.take();
        state.last = Some(Sequence::Partial);
        self.deliver(CommandResponse::new(self.id, Sequence::Partial, chunk))
            .await
    }

    /// Sends the terminal frame for `completion`. Later calls are no-ops.
    pub(crate) async fn finish(&self, completion: Completion) {
        let mut state = self.flush.lock().await;
        if state.closed {
            return;
        }
        state.closed = true;
        let sequence = match completion {
            Completion::Succeeded | Completion::Cancelled => Sequence::Completed,
            Completion::Failed => Sequence::Failed,
            Completion::Errored(message) => {
                self.output.clear();
                self.output.write(&message);
                Sequence::Failed
            }
        };
        state.last = Some(sequence);
        let chunk = self.output.take();
        self.deliver(CommandResponse::new(self.id, sequence, chunk))
            .await;
    }

    async fn deliver(&self, response: CommandResponse) -> bool {
        let Some(sink) = self.sink() else {
            return false;
        };
        let sequence = response.sequence;
        let delivered = sink.send(response).await;
        if !delivered {
            warn!(
                target: COMMAND_TARGET,
                id = %self.id,
                sequence = sequence.code(),
                "response frame was not delivered"
            );
        }
        delivered
    }

    fn sink(&self) -> Option<Arc<dyn ResponseSink>> {
        self.sink
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .and_then(Weak::upgrade)
    }

    /// Cancels the flush task and detaches from the owning connection.
    ///
    /// Only the first call has any effect.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.cancel.cancel();
        let sink = self
            .sink
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(sink) = sink.as_ref().and_then(Weak::upgrade) {
            sink.release(self.id);
        }
    }

    /// Returns `true` after [`ConnectedCommand::dispose`] has run.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for ConnectedCommand {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("ConnectedCommand")
            .field("id", &self.id)
            .field("disposed", &self.is_disposed())
            .finish_non_exhaustive()
    }
}
