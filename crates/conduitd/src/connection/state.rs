//! Connection lifecycle states.

use std::sync::atomic::{AtomicU8, Ordering};

use strum::Display;

/// Lifecycle of a channel connection.
///
/// `Starting → Open → Connected → Closed`, with `Closed` reachable from
/// every other state and never left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ConnectionState {
    /// Constructed; the loop has not been scheduled.
    Starting,
    /// A channel instance exists and is waiting for a client.
    Open,
    /// A client is attached and registered with the service.
    Connected,
    /// Terminal; the channel has been released.
    Closed,
}

impl ConnectionState {
    /// Returns `true` for connections that can still accept a client.
    #[must_use]
    pub const fn is_idle(self) -> bool {
        matches!(self, Self::Starting | Self::Open)
    }

    /// Returns `true` for every state except [`ConnectionState::Closed`].
    #[must_use]
    pub const fn is_live(self) -> bool {
        !matches!(self, Self::Closed)
    }

    const fn as_u8(self) -> u8 {
        match self {
            Self::Starting => 0,
            Self::Open => 1,
            Self::Connected => 2,
            Self::Closed => 3,
        }
    }

    const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Starting,
            1 => Self::Open,
            2 => Self::Connected,
            _ => Self::Closed,
        }
    }
}

/// Atomic cell holding a [`ConnectionState`].
#[derive(Debug)]
pub(crate) struct AtomicState(AtomicU8);

impl AtomicState {
    pub(crate) const fn new(state: ConnectionState) -> Self {
        Self(AtomicU8::new(state.as_u8()))
    }

    pub(crate) fn load(&self) -> ConnectionState {
        ConnectionState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Moves from `from` to `to`; fails if another transition won the race.
    pub(crate) fn transition(&self, from: ConnectionState, to: ConnectionState) -> bool {
        if from == ConnectionState::Closed {
            return false;
        }
        self.0
            .compare_exchange(from.as_u8(), to.as_u8(), Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Forces the state to `Closed`, returning the previous state.
    pub(crate) fn close(&self) -> ConnectionState {
        ConnectionState::from_u8(self.0.swap(ConnectionState::Closed.as_u8(), Ordering::AcqRel))
    }
}
