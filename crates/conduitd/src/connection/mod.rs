//! Connection state machine and the pool that replenishes it.

mod channel;
mod errors;
mod pool;
mod state;

pub use self::channel::{ChannelConnection, ConnectionHandle};
pub use self::errors::{ConnectionError, PoolError};
pub use self::pool::{ConnectionPool, PoolOptions};
pub use self::state::ConnectionState;

const CONNECTION_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::connection");
const POOL_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::pool");
