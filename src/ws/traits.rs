//! Core traits for the pluggable connection transport.

use std::fmt;

use tokio::sync::mpsc;
use url::Url;

use super::error::WsError;

/// Identifies one physical connection attempt.
///
/// Every call to [`Transport::open`] receives a fresh id so events from a
/// discarded socket can be told apart from events of the live one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle callback delivered by a transport for one connection.
#[non_exhaustive]
#[derive(Debug)]
pub enum TransportEvent {
    /// The handshake completed and the socket is open
    Open,
    /// A text frame arrived
    Message(String),
    /// The peer started the close handshake
    Closing {
        /// Close code sent by the peer
        code: u16,
        /// Close reason sent by the peer
        reason: String,
    },
    /// The socket is fully closed
    Closed {
        /// Final close code
        code: u16,
        /// Final close reason
        reason: String,
    },
    /// Opening failed or the established socket broke
    Failure(WsError),
}

/// A [`TransportEvent`] tagged with the connection it belongs to.
#[non_exhaustive]
#[derive(Debug)]
pub struct ConnectionEvent {
    pub id: ConnectionId,
    pub event: TransportEvent,
}

impl ConnectionEvent {
    #[must_use]
    pub const fn new(id: ConnectionId, event: TransportEvent) -> Self {
        Self { id, event }
    }
}

/// Channel on which a transport reports [`ConnectionEvent`]s.
pub type EventSender = mpsc::UnboundedSender<ConnectionEvent>;

/// Opens message-oriented connections and reports their lifecycle.
///
/// Events for a single connection must be delivered in order and without
/// overlap. Alerts flow server to client only, so no send path is required.
pub trait Transport: Send + Sync + 'static {
    /// Handle used to close the connection.
    type Handle: TransportHandle;

    /// Begin opening `url`. The call must not block; progress is reported on `events`.
    fn open(&self, id: ConnectionId, url: &Url, events: EventSender) -> Self::Handle;
}

/// Owned handle of one connection created by a [`Transport`].
///
/// Dropping the handle without calling [`TransportHandle::close`] abandons
/// the connection without a close handshake.
pub trait TransportHandle: Send + 'static {
    /// Start a graceful close. Calling it more than once is a no-op.
    fn close(&mut self, code: u16, reason: &str);
}
