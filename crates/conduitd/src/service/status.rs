//! Shared service status: lifecycle state and attached clients.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::info;

use conduit_protocol::ConnectionId;

use super::{SERVICE_TARGET, ServiceState};
use crate::connection::ConnectionHandle;

/// State shared between the host service and its command targets.
#[derive(Debug)]
pub struct ServiceStatus {
    state: AtomicU8,
    connections: Mutex<HashMap<ConnectionId, ConnectionHandle>>,
    started: Instant,
}

impl ServiceStatus {
    /// Creates a status in the `Starting` state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(ServiceState::Starting as u8),
            connections: Mutex::new(HashMap::new()),
            started: Instant::now(),
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ServiceState {
        ServiceState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Moves to `state`, returning the previous one.
    pub fn set_state(&self, state: ServiceState) -> ServiceState {
        let previous = ServiceState::from_u8(self.state.swap(state as u8, Ordering::AcqRel));
        if previous != state {
            info!(
                target: SERVICE_TARGET,
                from = %previous,
                to = %state,
                "service state changed"
            );
        }
        previous
    }

    /// Time since the status was created.
    #[must_use]
    pub fn uptime(&self) -> Duration {
        self.started.elapsed()
    }

    /// Number of registered clients.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.lock().len()
    }

    /// Registered clients with their handles.
    #[must_use]
    pub fn connections(&self) -> Vec<(ConnectionId, ConnectionHandle)> {
        self.lock()
            .iter()
            .map(|(id, handle)| (*id, handle.clone()))
            .collect()
    }

    /// Serialisable summary.
    #[must_use]
    pub fn snapshot(&self) -> StatusSnapshot {
        let mut connections: Vec<ConnectionSummary> = self
            .lock()
            .iter()
            .map(|(id, handle)| ConnectionSummary {
                id: *id,
                serial: handle.serial(),
                active_commands: handle.active_commands(),
            })
            .collect();
        connections.sort_by_key(|summary| summary.serial);
        StatusSnapshot {
            state: self.state(),
            uptime_ms: u64::try_from(self.uptime().as_millis()).unwrap_or(u64::MAX),
            connections,
        }
    }

    pub(crate) fn register(&self, id: ConnectionId, handle: ConnectionHandle) {
        self.lock().insert(id, handle);
    }

    pub(crate) fn unregister(&self, id: ConnectionId) -> bool {
        self.lock().remove(&id).is_some()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ConnectionId, ConnectionHandle>> {
        self.connections.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for ServiceStatus {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time view of the service, rendered by the `status` command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusSnapshot {
    /// Lifecycle state.
    pub state: ServiceState,
    /// Milliseconds since start.
    pub uptime_ms: u64,
    /// Attached clients ordered by serial.
    pub connections: Vec<ConnectionSummary>,
}

/// One attached client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionSummary {
    /// Identifier assigned on connect.
    pub id: ConnectionId,
    /// Pool-local serial, absent once the connection is gone.
    pub serial: Option<u64>,
    /// Commands in flight.
    pub active_commands: usize,
}
