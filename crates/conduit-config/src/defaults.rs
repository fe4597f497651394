//! Built-in values used when no layer supplies a setting.

use crate::logging::LogFormat;
use crate::pipe::PipeName;

/// Connection ceiling used when none is configured.
pub const DEFAULT_MAX_CONNECTIONS: usize = 4;

/// Pool heartbeat period in milliseconds; `0` leaves the heartbeat off.
pub const DEFAULT_HEARTBEAT_MS: u64 = 0;

/// Partial output flush period in milliseconds.
pub const DEFAULT_FLUSH_INTERVAL_MS: u64 = 250;

/// Filter directives applied when none are configured.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Owned copy of [`DEFAULT_LOG_FILTER`] for serde defaults.
#[must_use]
pub fn default_log_filter() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Log format used when none is configured.
#[must_use]
pub const fn default_log_format() -> LogFormat {
    LogFormat::Json
}

pub(crate) const fn default_max_connections() -> usize {
    DEFAULT_MAX_CONNECTIONS
}

pub(crate) const fn default_heartbeat_ms() -> u64 {
    DEFAULT_HEARTBEAT_MS
}

pub(crate) const fn default_flush_interval_ms() -> u64 {
    DEFAULT_FLUSH_INTERVAL_MS
}

/// Endpoint the daemon binds when none is configured.
///
/// On Unix this is `conduit/conduitd.sock` under `$XDG_RUNTIME_DIR`. Without
/// a runtime directory the socket goes below the temporary directory in a
/// per-user `uid-<euid>` subdirectory so users never share a socket.
#[must_use]
pub fn default_endpoint() -> PipeName {
    #[cfg(unix)]
    {
        unix_endpoint()
    }
    #[cfg(not(unix))]
    {
        PipeName::from_windows_pipe("conduitd")
    }
}

#[cfg(unix)]
fn unix_endpoint() -> PipeName {
    use camino::Utf8PathBuf;

    let runtime = dirs::runtime_dir().and_then(|dir| Utf8PathBuf::from_path_buf(dir).ok());
    let directory = match runtime {
        Some(dir) => dir.join("conduit"),
        None => {
            let temp = Utf8PathBuf::from_path_buf(std::env::temp_dir())
                .unwrap_or_else(|_| Utf8PathBuf::from("/tmp"));
            // SAFETY: geteuid has no preconditions and cannot fail.
            let uid = unsafe { libc::geteuid() };
            temp.join("conduit").join(format!("uid-{uid}"))
        }
    };
    PipeName::from_unix_path(directory.join("conduitd.sock"))
}
