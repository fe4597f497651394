//! In-process endpoint used by tests.
//!
//! Clients obtained from [`MemoryEndpoint::connect`] are queued until a
//! pending channel claims them, mirroring how an OS endpoint backlogs
//! connection attempts.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use futures::StreamExt;
use tokio::io::{AsyncWriteExt, DuplexStream, ReadHalf, WriteHalf};
use tokio::sync::{Mutex, mpsc};
use tokio_util::codec::{FramedRead, LinesCodec};

use conduit_protocol::{
    CommandRequest, CommandResponse, CompletedResponse, RequestId, ResponseTracker,
};

use super::{ChannelEndpoint, DuplexChannel, OUTPUT_BUFFER_SIZE, PendingChannel, TransportError};

/// Endpoint whose channels are in-memory duplex pipes.
#[derive(Debug)]
pub struct MemoryEndpoint {
    name: String,
    sender: mpsc::UnboundedSender<DuplexStream>,
    receiver: Arc<Mutex<mpsc::UnboundedReceiver<DuplexStream>>>,
    created: AtomicUsize,
}

impl MemoryEndpoint {
    /// Builds an endpoint identified by `name`.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            name: name.into(),
            sender,
            receiver: Arc::new(Mutex::new(receiver)),
            created: AtomicUsize::new(0),
        }
    }

    /// Attaches a new client.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint's receiving side has been dropped.
    pub fn connect(&self) -> io::Result<MemoryClient> {
        let (server, client) = tokio::io::duplex(OUTPUT_BUFFER_SIZE);
        self.sender
            .send(server)
            .map_err(|_| io::Error::new(io::ErrorKind::ConnectionRefused, "endpoint closed"))?;
        Ok(MemoryClient::new(client))
    }

    /// Number of server-side channel instances created so far.
    #[must_use]
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChannelEndpoint for MemoryEndpoint {
    fn name(&self) -> &str {
        &self.name
    }

    async fn create(&self) -> Result<Box<dyn PendingChannel>, TransportError> {
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(PendingMemoryChannel {
            name: self.name.clone(),
            receiver: Arc::clone(&self.receiver),
        }))
    }
}

struct PendingMemoryChannel {
    name: String,
    receiver: Arc<Mutex<mpsc::UnboundedReceiver<DuplexStream>>>,
}

#[async_trait]
impl PendingChannel for PendingMemoryChannel {
    async fn wait_for_client(self: Box<Self>) -> Result<Box<dyn DuplexChannel>, TransportError> {
        let mut receiver = self.receiver.lock().await;
        match receiver.recv().await {
            Some(stream) => Ok(Box::new(stream)),
            None => Err(TransportError::Closed {
                endpoint: self.name.clone(),
            }),
        }
    }
}

/// Client end of an in-memory channel speaking the line protocol.
pub struct MemoryClient {
    reader: FramedRead<ReadHalf<DuplexStream>, LinesCodec>,
    writer: WriteHalf<DuplexStream>,
    tracker: ResponseTracker,
}

impl MemoryClient {
    fn new(stream: DuplexStream) -> Self {
        let (read, writer) = tokio::io::split(stream);
        Self {
            reader: FramedRead::new(read, LinesCodec::new()),
            writer,
            tracker: ResponseTracker::new(),
        }
    }

    /// Sends a command line and returns its correlation identifier.
    ///
    /// # Errors
    ///
    /// Returns an error when the daemon side of the channel is gone.
    pub async fn send(&mut self, command_line: &str) -> io::Result<RequestId> {
        let request = CommandRequest::new(command_line);
        let line = request
            .to_line()
            .map_err(|error| io::Error::new(io::ErrorKind::InvalidData, error))?;
        self.send_raw(&line).await?;
        Ok(request.id)
    }

    /// Writes a raw line, bypassing envelope encoding.
    ///
    /// # Errors
    ///
    /// Returns an error when the daemon side of the channel is gone.
    pub async fn send_raw(&mut self, line: &str) -> io::Result<()> {
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await
    }

    /// Reads the next response frame, or `None` once the daemon closes.
    ///
    /// # Errors
    ///
    /// Returns an error for unreadable or undecodable lines.
    pub async fn recv(&mut self) -> io::Result<Option<CommandResponse>> {
        let Some(line) = self.reader.next().await else {
            return Ok(None);
        };
        let line = line.map_err(|error| io::Error::new(io::ErrorKind::InvalidData, error))?;
        let response = CommandResponse::parse(&line)
            .map_err(|error| io::Error::new(io::ErrorKind::InvalidData, error))?;
        Ok(Some(response))
    }

    /// Reads frames until the command `id` terminates.
    ///
    /// Frames for other identifiers are tracked and left for later calls.
    ///
    /// # Errors
    ///
    /// Returns an error if the channel closes first or a frame violates
    /// ordering.
    pub async fn complete(&mut self, id: RequestId) -> io::Result<CompletedResponse> {
        loop {
            let Some(response) = self.recv().await? else {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "channel closed before the command completed",
                ));
            };
            let completed = self
                .tracker
                .accept(&response)
                .map_err(|error| io::Error::new(io::ErrorKind::InvalidData, error))?;
            if let Some(completed) = completed
                && completed.id == id
            {
                return Ok(completed);
            }
        }
    }

    /// Sends `command_line` and waits for its terminal frame.
    ///
    /// # Errors
    ///
    /// See [`MemoryClient::send`] and [`MemoryClient::complete`].
    pub async fn run(&mut self, command_line: &str) -> io::Result<CompletedResponse> {
        let id = self.send(command_line).await?;
        self.complete(id).await
    }

    /// Tracker holding every frame received so far.
    #[must_use]
    pub fn tracker(&self) -> &ResponseTracker {
        &self.tracker
    }
}
