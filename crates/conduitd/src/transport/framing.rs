//! Line framing of protocol envelopes onto a duplex channel.
//!
//! Each envelope is one JSON object terminated by `\n`. Inbound lines are
//! capped so a misbehaving client cannot grow the read buffer without bound.

use std::io;

use futures::StreamExt;
use tokio::io::{AsyncWriteExt, BufWriter, ReadHalf, WriteHalf};
use tokio_util::codec::{FramedRead, LinesCodec, LinesCodecError};

use conduit_protocol::{CommandRequest, CommandResponse, ProtocolError};

use super::{DuplexChannel, INPUT_BUFFER_SIZE, OUTPUT_BUFFER_SIZE};

/// Largest accepted request line in bytes.
pub(crate) const MAX_LINE_BYTES: usize = 1024 * 1024;

type Channel = Box<dyn DuplexChannel>;

/// Errors raised while reading or writing frames.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// A request line exceeded [`MAX_LINE_BYTES`].
    #[error("request line exceeds {max} bytes")]
    Oversized {
        /// Configured limit.
        max: usize,
    },
    /// A line could not be decoded as an envelope.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    /// The channel failed.
    #[error("channel I/O failed: {0}")]
    Io(#[from] io::Error),
}

impl From<LinesCodecError> for FrameError {
    fn from(error: LinesCodecError) -> Self {
        match error {
            LinesCodecError::MaxLineLengthExceeded => Self::Oversized {
                max: MAX_LINE_BYTES,
            },
            LinesCodecError::Io(source) => Self::Io(source),
        }
    }
}

/// Splits a connected channel into framed read and write halves.
pub(crate) fn split_channel(channel: Channel) -> (FrameReader, FrameWriter) {
    let (read, write) = tokio::io::split(channel);
    let reader = FramedRead::with_capacity(
        read,
        LinesCodec::new_with_max_length(MAX_LINE_BYTES),
        INPUT_BUFFER_SIZE,
    );
    (
        FrameReader { inner: reader },
        FrameWriter {
            inner: BufWriter::with_capacity(OUTPUT_BUFFER_SIZE, write),
        },
    )
}

/// Decodes [`CommandRequest`] envelopes from the inbound half.
pub(crate) struct FrameReader {
    inner: FramedRead<ReadHalf<Channel>, LinesCodec>,
}

impl FrameReader {
    /// Reads the next request, skipping blank lines.
    ///
    /// Returns `None` once the client closes its end.
    pub(crate) async fn next_request(&mut self) -> Option<Result<CommandRequest, FrameError>> {
        loop {
            let line = match self.inner.next().await? {
                Ok(line) => line,
                Err(error) => return Some(Err(error.into())),
            };
            match CommandRequest::parse(&line) {
                Ok(request) => return Some(Ok(request)),
                Err(ProtocolError::Empty) => {}
                Err(error) => return Some(Err(error.into())),
            }
        }
    }
}

/// Encodes [`CommandResponse`] envelopes onto the outbound half.
pub(crate) struct FrameWriter {
    inner: BufWriter<WriteHalf<Channel>>,
}

impl FrameWriter {
    /// Writes one response line and flushes it to the channel.
    pub(crate) async fn send(&mut self, response: &CommandResponse) -> Result<(), FrameError> {
        let line = response.to_line()?;
        self.inner.write_all(line.as_bytes()).await?;
        self.inner.write_all(b"\n").await?;
        self.inner.flush().await?;
        Ok(())
    }

    /// Flushes and closes the outbound half.
    pub(crate) async fn shutdown(&mut self) -> Result<(), FrameError> {
        self.inner.shutdown().await?;
        Ok(())
    }
}
