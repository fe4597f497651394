//! Host service lifecycle states.

use serde::Serialize;
use strum::Display;

/// Lifecycle state of the host service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum ServiceState {
    /// Initialising; connections are accepted.
    Starting = 0,
    /// Serving commands.
    Running = 1,
    /// Connections stay open but commands are refused.
    Paused = 2,
    /// Shutting down; read loops end and new clients are refused.
    Stopping = 3,
    /// Stopped.
    Stopped = 4,
}

impl ServiceState {
    /// Returns `true` once the service is shutting down.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Stopping | Self::Stopped)
    }

    /// Returns `true` while commands may run.
    #[must_use]
    pub const fn accepts_commands(self) -> bool {
        matches!(self, Self::Starting | Self::Running)
    }

    pub(crate) const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Starting,
            1 => Self::Running,
            2 => Self::Paused,
            3 => Self::Stopping,
            _ => Self::Stopped,
        }
    }
}
