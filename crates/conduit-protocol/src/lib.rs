//! Wire types shared by Conduit clients and the `conduitd` control plane.
//!
//! Every message travels as a single JSON object terminated by a newline.
//! Clients send a [`CommandRequest`] carrying a correlation identifier and a
//! raw command line. The daemon answers with any number of
//! [`CommandResponse`] frames for that identifier: zero or more partial
//! frames ([`Sequence::Partial`]) followed by exactly one terminal frame
//! ([`Sequence::Completed`] or [`Sequence::Failed`]).
//!
//! Response chunks are escaped with [`escape`] so that handler output can
//! never be mistaken for framing syntax; clients reverse this with
//! [`unescape`]. [`ResponseTracker`] performs both the unescaping and the
//! ordering checks on the client side.

mod escape;
mod ids;
mod message;
mod sequence;
mod tracker;

pub use escape::{
    ESCAPE_CHAR, ESCAPED_CHARS, EscapeError, escape, escape_into, needs_escape, unescape,
};
pub use ids::{ConnectionId, IdParseError, RequestId};
pub use message::{CommandRequest, CommandResponse, ProtocolError};
pub use sequence::{InvalidSequence, Sequence};
pub use tracker::{CompletedResponse, ResponseTracker, TrackerError};
