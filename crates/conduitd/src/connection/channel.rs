//! One duplex channel and its accept/read loop.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex as AsyncMutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use conduit_protocol::{CommandRequest, CommandResponse, ConnectionId, RequestId};

use super::pool::PoolInner;
use super::state::{AtomicState, ConnectionState};
use super::{CONNECTION_TARGET, ConnectionError};
use crate::command::{ConnectedCommand, ResponseSink};
use crate::service::ServiceFacade;
use crate::transport::{ChannelEndpoint, FrameReader, FrameWriter, split_channel};

/// Longest wait for buffered output to drain when a channel closes.
const SHUTDOWN_GRACE: Duration = Duration::from_millis(250);

/// Pool member owning one channel instance.
///
/// Clones refer to the same connection.
#[derive(Clone)]
pub struct ChannelConnection {
    inner: Arc<ConnectionInner>,
}

pub(crate) struct ConnectionInner {
    serial: u64,
    state: AtomicState,
    started: AtomicBool,
    disposed: AtomicBool,
    cancel: CancellationToken,
    id: Mutex<Option<ConnectionId>>,
    writer: AsyncMutex<Option<FrameWriter>>,
    commands: Mutex<HashMap<RequestId, Arc<ConnectedCommand>>>,
    pool: Weak<PoolInner>,
    endpoint: Arc<dyn ChannelEndpoint>,
    service: Arc<dyn ServiceFacade>,
    flush_interval: Duration,
}

/// Collaborators shared by every connection of a pool.
pub(crate) struct ConnectionParts {
    pub(crate) serial: u64,
    pub(crate) pool: Weak<PoolInner>,
    pub(crate) endpoint: Arc<dyn ChannelEndpoint>,
    pub(crate) service: Arc<dyn ServiceFacade>,
    pub(crate) flush_interval: Duration,
    pub(crate) parent: CancellationToken,
}

impl ChannelConnection {
    pub(crate) fn new(parts: ConnectionParts) -> Self {
        Self {
            inner: Arc::new(ConnectionInner {
                serial: parts.serial,
                state: AtomicState::new(ConnectionState::Starting),
                started: AtomicBool::new(false),
                disposed: AtomicBool::new(false),
                cancel: parts.parent.child_token(),
                id: Mutex::new(None),
                writer: AsyncMutex::new(None),
                commands: Mutex::new(HashMap::new()),
                pool: parts.pool,
                endpoint: parts.endpoint,
                service: parts.service,
                flush_interval: parts.flush_interval,
            }),
        }
    }

    /// Schedules the accept/read loop. Only the first call has any effect.
    pub fn start(&self) {
        if self.inner.started.swap(true, Ordering::AcqRel) {
            return;
        }
        tokio::spawn(Arc::clone(&self.inner).run());
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.inner.state.load()
    }

    /// Pool-local serial number used in diagnostics.
    #[must_use]
    pub fn serial(&self) -> u64 {
        self.inner.serial
    }

    /// Identifier assigned by the service while connected.
    #[must_use]
    pub fn connection_id(&self) -> Option<ConnectionId> {
        *self.inner.lock_id()
    }

    /// Number of commands currently executing on this connection.
    #[must_use]
    pub fn active_commands(&self) -> usize {
        self.inner.lock_commands().len()
    }

    /// Requests shutdown of the connection. Only the first call has any effect.
    ///
    /// A connection that was never started closes immediately; a running
    /// one is closed by its loop once the cancellation is observed.
    pub fn dispose(&self) {
        if self.inner.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.inner.cancel.cancel();
        if !self.inner.started.swap(true, Ordering::AcqRel) {
            self.inner.state.close();
        }
    }

    /// Returns a handle the service can keep without owning the connection.
    #[must_use]
    pub fn handle(&self) -> ConnectionHandle {
        ConnectionHandle {
            inner: Arc::downgrade(&self.inner),
        }
    }

    pub(crate) fn is(&self, inner: &Arc<ConnectionInner>) -> bool {
        Arc::ptr_eq(&self.inner, inner)
    }
}

impl fmt::Debug for ChannelConnection {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ChannelConnection")
            .field("serial", &self.inner.serial)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl ConnectionInner {
    async fn run(self: Arc<Self>) {
        if let Err(error) = self.serve().await {
            warn!(
                target: CONNECTION_TARGET,
                serial = self.serial,
                error = %error,
                "connection failed"
            );
            if self.state.load() == ConnectionState::Open {
                self.back_off().await;
            }
        }
        self.close().await;
    }

    /// Holds the idle slot for a while so a persistent endpoint fault does
    /// not respawn connections in a tight loop.
    async fn back_off(&self) {
        let Some(delay) = self.pool.upgrade().map(|pool| pool.attach_failed()) else {
            return;
        };
        debug!(
            target: CONNECTION_TARGET,
            serial = self.serial,
            delay = ?delay,
            "delaying replacement after endpoint failure"
        );
        tokio::select! {
            () = self.cancel.cancelled() => {}
            () = tokio::time::sleep(delay) => {}
        }
    }

    async fn serve(self: &Arc<Self>) -> Result<(), ConnectionError> {
        let opened = !self.cancel.is_cancelled()
            && self
                .state
                .transition(ConnectionState::Starting, ConnectionState::Open);
        if !opened {
            return Ok(());
        }

        let pending = self.endpoint.create().await?;
        debug!(
            target: CONNECTION_TARGET,
            serial = self.serial,
            endpoint = self.endpoint.name(),
            "waiting for client"
        );
        let channel = tokio::select! {
            () = self.cancel.cancelled() => return Ok(()),
            channel = pending.wait_for_client() => channel?,
        };
        if let Some(pool) = self.pool.upgrade() {
            pool.attached();
        }
        let (mut reader, writer) = split_channel(channel);
        *self.writer.lock().await = Some(writer);

        let handle = ConnectionHandle {
            inner: Arc::downgrade(self),
        };
        let Some(id) = self.service.connect(handle) else {
            info!(
                target: CONNECTION_TARGET,
                serial = self.serial,
                "service refused connection"
            );
            return Ok(());
        };
        *self.lock_id() = Some(id);
        if !self
            .state
            .transition(ConnectionState::Open, ConnectionState::Connected)
        {
            return Ok(());
        }
        info!(
            target: CONNECTION_TARGET,
            serial = self.serial,
            connection = %id,
            "client connected"
        );

        self.read_loop(id, &mut reader).await
    }

    async fn read_loop(
        self: &Arc<Self>,
        id: ConnectionId,
        reader: &mut FrameReader,
    ) -> Result<(), ConnectionError> {
        loop {
            if let Some(pool) = self.pool.upgrade() {
                pool.add();
            }
            if self.service.state().is_terminal() {
                debug!(
                    target: CONNECTION_TARGET,
                    serial = self.serial,
                    "service stopping; closing connection"
                );
                return Ok(());
            }

            let next = tokio::select! {
                biased;
                () = self.cancel.cancelled() => return Ok(()),
                next = reader.next_request() => next,
            };
            match next {
                None => {
                    debug!(
                        target: CONNECTION_TARGET,
                        serial = self.serial,
                        "client closed channel"
                    );
                    return Ok(());
                }
                Some(Ok(request)) => self.dispatch(id, request),
                Some(Err(error)) => return Err(error.into()),
            }
        }
    }

    fn dispatch(self: &Arc<Self>, connection: ConnectionId, request: CommandRequest) {
        let CommandRequest { id, command_line } = request;
        let weak: Weak<Self> = Arc::downgrade(self);
        let sink: Weak<dyn ResponseSink> = weak;
        let command = ConnectedCommand::new(id, sink, &self.cancel);
        match self.lock_commands().entry(id) {
            Entry::Occupied(_) => {
                warn!(
                    target: CONNECTION_TARGET,
                    serial = self.serial,
                    request = %id,
                    "ignoring request with an identifier already in flight"
                );
                return;
            }
            Entry::Vacant(slot) => {
                slot.insert(Arc::clone(&command));
            }
        }

        debug!(
            target: CONNECTION_TARGET,
            serial = self.serial,
            request = %id,
            command_line = %command_line,
            "dispatching command"
        );
        let service = Arc::clone(&self.service);
        let output = command.output();
        let cancel = command.cancellation();
        command.spawn(self.flush_interval, async move {
            service
                .execute(connection, &command_line, output, cancel)
                .await
        });
    }

    async fn close(self: &Arc<Self>) {
        if self.state.close() == ConnectionState::Closed {
            return;
        }
        self.cancel.cancel();
        let commands: Vec<_> = self.lock_commands().drain().map(|(_, command)| command).collect();
        for command in commands {
            command.dispose();
        }

        let writer = self.writer.lock().await.take();
        if let Some(mut writer) = writer {
            match tokio::time::timeout(SHUTDOWN_GRACE, writer.shutdown()).await {
                Ok(Ok(())) => {}
                Ok(Err(error)) => debug!(
                    target: CONNECTION_TARGET,
                    serial = self.serial,
                    error = %error,
                    "channel shutdown failed"
                ),
                Err(_) => debug!(
                    target: CONNECTION_TARGET,
                    serial = self.serial,
                    "client is not draining output; dropping channel"
                ),
            }
        }

        let id = self.lock_id().take();
        if let Some(id) = id {
            self.service.disconnect(id);
            info!(
                target: CONNECTION_TARGET,
                serial = self.serial,
                connection = %id,
                "client disconnected"
            );
        }

        if let Some(pool) = self.pool.upgrade() {
            pool.remove(self);
        }
    }

    fn lock_id(&self) -> MutexGuard<'_, Option<ConnectionId>> {
        self.id.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_commands(&self) -> MutexGuard<'_, HashMap<RequestId, Arc<ConnectedCommand>>> {
        self.commands.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl ResponseSink for ConnectionInner {
    async fn send(&self, response: CommandResponse) -> bool {
        let mut writer = tokio::select! {
            () = self.cancel.cancelled() => return false,
            writer = self.writer.lock() => writer,
        };
        let Some(channel) = writer.as_mut() else {
            return false;
        };
        let sent = tokio::select! {
            () = self.cancel.cancelled() => return false,
            sent = channel.send(&response) => sent,
        };
        match sent {
            Ok(()) => true,
            Err(error) => {
                warn!(
                    target: CONNECTION_TARGET,
                    serial = self.serial,
                    error = %error,
                    "failed to write response; closing connection"
                );
                writer.take();
                self.cancel.cancel();
                false
            }
        }
    }

    fn release(&self, id: RequestId) {
        self.lock_commands().remove(&id);
    }
}

/// Weak reference to a connection handed to the service on connect.
#[derive(Clone)]
pub struct ConnectionHandle {
    inner: Weak<ConnectionInner>,
}

impl ConnectionHandle {
    /// Current state, or `Closed` once the connection has been dropped.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.inner
            .upgrade()
            .map_or(ConnectionState::Closed, |inner| inner.state.load())
    }

    /// Returns `true` while a client is attached.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Pool-local serial number, if the connection still exists.
    #[must_use]
    pub fn serial(&self) -> Option<u64> {
        self.inner.upgrade().map(|inner| inner.serial)
    }

    /// Number of commands in flight on the connection.
    #[must_use]
    pub fn active_commands(&self) -> usize {
        self.inner
            .upgrade()
            .map_or(0, |inner| inner.lock_commands().len())
    }

    /// Asks the connection to close.
    pub fn close(&self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.cancel.cancel();
        }
    }
}

impl fmt::Debug for ConnectionHandle {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ConnectionHandle")
            .field("serial", &self.serial())
            .field("state", &self.state())
            .finish()
    }
}
