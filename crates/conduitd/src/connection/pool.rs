//! Self-replenishing pool of channel connections.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use conduit_config::Config;

use super::channel::{ChannelConnection, ConnectionInner, ConnectionParts};
use super::state::ConnectionState;
use super::{POOL_TARGET, PoolError};
use crate::service::ServiceFacade;
use crate::transport::ChannelEndpoint;

const ATTACH_BACKOFF_BASE: Duration = Duration::from_millis(10);
const ATTACH_BACKOFF_MAX: Duration = Duration::from_secs(1);

/// Pool sizing and timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolOptions {
    /// Ceiling on connections that are not `Closed`.
    pub max_connections: usize,
    /// Period of the replenishment heartbeat; `None` disables it.
    pub heartbeat: Option<Duration>,
    /// Period between partial output flushes for each command.
    pub flush_interval: Duration,
}

impl PoolOptions {
    /// Derives pool options from the daemon configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_connections: config.max_connections(),
            heartbeat: config.heartbeat(),
            flush_interval: config.flush_interval(),
        }
    }
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Capacity-bounded set of connections that keeps one idle slot open.
///
/// Whenever a connection closes it is removed and a replacement is created,
/// provided the pool is below its ceiling and not disposed. Clones share
/// the same pool.
#[derive(Clone)]
pub struct ConnectionPool {
    inner: Arc<PoolInner>,
}

pub(crate) struct PoolInner {
    options: PoolOptions,
    endpoint: Arc<dyn ChannelEndpoint>,
    service: Arc<dyn ServiceFacade>,
    connections: Mutex<Vec<ChannelConnection>>,
    disposed: AtomicBool,
    cancel: CancellationToken,
    serials: AtomicU64,
    attach_failures: AtomicU32,
}

impl ConnectionPool {
    /// Creates the pool and starts its first connection.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::ZeroCapacity`] when `max_connections` is zero.
    pub fn new(
        endpoint: Arc<dyn ChannelEndpoint>,
        service: Arc<dyn ServiceFacade>,
        options: PoolOptions,
    ) -> Result<Self, PoolError> {
        Self::linked(endpoint, service, options, &CancellationToken::new())
    }

    /// Creates a pool whose connections are cancelled along with `parent`.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::ZeroCapacity`] when `max_connections` is zero.
    pub fn linked(
        endpoint: Arc<dyn ChannelEndpoint>,
        service: Arc<dyn ServiceFacade>,
        options: PoolOptions,
        parent: &CancellationToken,
    ) -> Result<Self, PoolError> {
        if options.max_connections == 0 {
            return Err(PoolError::ZeroCapacity);
        }
        let inner = Arc::new(PoolInner {
            options,
            endpoint,
            service,
            connections: Mutex::new(Vec::with_capacity(options.max_connections)),
            disposed: AtomicBool::new(false),
            cancel: parent.child_token(),
            serials: AtomicU64::new(0),
            attach_failures: AtomicU32::new(0),
        });
        info!(
            target: POOL_TARGET,
            endpoint = inner.endpoint.name(),
            max_connections = options.max_connections,
            heartbeat = ?options.heartbeat,
            "connection pool starting"
        );
        inner.add();
        if let Some(period) = options.heartbeat {
            tokio::spawn(heartbeat(Arc::downgrade(&inner), inner.cancel.clone(), period));
        }
        Ok(Self { inner })
    }

    /// Ensures an idle connection exists if the pool is below its ceiling.
    pub fn add(&self) {
        self.inner.add();
    }

    /// Number of connections with an attached client.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.inner.count(|state| state == ConnectionState::Connected)
    }

    /// Number of connections that are not `Closed`.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.inner.count(ConnectionState::is_live)
    }

    /// Number of connections waiting for a client.
    #[must_use]
    pub fn idle_count(&self) -> usize {
        self.inner.count(ConnectionState::is_idle)
    }

    /// Snapshot of every tracked connection's state.
    #[must_use]
    pub fn states(&self) -> Vec<ConnectionState> {
        self.inner
            .lock()
            .iter()
            .map(ChannelConnection::state)
            .collect()
    }

    /// Configured ceiling.
    #[must_use]
    pub fn max_connections(&self) -> usize {
        self.inner.options.max_connections
    }

    /// Returns `true` once [`ConnectionPool::dispose`] has run.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::Acquire)
    }

    /// Disposes every connection and stops replenishment.
    pub fn dispose(&self) {
        if self.inner.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.inner.cancel.cancel();
        let connections = std::mem::take(&mut *self.inner.lock());
        info!(
            target: POOL_TARGET,
            connections = connections.len(),
            "connection pool disposing"
        );
        for connection in connections {
            connection.dispose();
        }
    }
}

impl std::fmt::Debug for ConnectionPool {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("ConnectionPool")
            .field("max_connections", &self.inner.options.max_connections)
            .field("states", &self.states())
            .finish()
    }
}

impl PoolInner {
    pub(crate) fn add(self: &Arc<Self>) {
        if self.disposed.load(Ordering::Acquire) || self.service.state().is_terminal() {
            return;
        }
        let connection = {
            let mut connections = self.lock();
            connections.retain(|connection| connection.state().is_live());
            let idle = connections
                .iter()
                .filter(|connection| connection.state().is_idle())
                .count();
            if idle > 0 || connections.len() >= self.options.max_connections {
                return;
            }
            let connection = ChannelConnection::new(ConnectionParts {
                serial: self.serials.fetch_add(1, Ordering::Relaxed),
                pool: Arc::downgrade(self),
                endpoint: Arc::clone(&self.endpoint),
                service: Arc::clone(&self.service),
                flush_interval: self.options.flush_interval,
                parent: self.cancel.clone(),
            });
            connections.push(connection.clone());
            connection
        };
        debug!(
            target: POOL_TARGET,
            serial = connection.serial(),
            "starting pool connection"
        );
        connection.start();
    }

    pub(crate) fn remove(self: &Arc<Self>, inner: &Arc<ConnectionInner>) {
        self.lock().retain(|connection| !connection.is(inner));
        self.add();
    }

    /// Records a connection that failed before a client attached and
    /// returns how long it should wait before giving up its slot.
    pub(crate) fn attach_failed(&self) -> Duration {
        let streak = self.attach_failures.fetch_add(1, Ordering::AcqRel);
        ATTACH_BACKOFF_BASE
            .saturating_mul(1_u32 << streak.min(7))
            .min(ATTACH_BACKOFF_MAX)
    }

    pub(crate) fn attached(&self) {
        self.attach_failures.store(0, Ordering::Release);
    }

    fn count(&self, predicate: impl Fn(ConnectionState) -> bool) -> usize {
        self.lock()
            .iter()
            .filter(|connection| predicate(connection.state()))
            .count()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<ChannelConnection>> {
        self.connections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

async fn heartbeat(pool: Weak<PoolInner>, cancel: CancellationToken, period: Duration) {
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            () = cancel.cancelled() => return,
            _ = ticker.tick() => {}
        }
        let Some(pool) = pool.upgrade() else {
            return;
        };
        pool.add();
    }
}
