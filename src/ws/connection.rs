#![expect(
    clippy::module_name_repetitions,
    reason = "Connection types expose their domain in the name for clarity"
)]

use url::Url;

use super::traits::{
    ConnectionEvent, ConnectionId, EventSender, Transport, TransportEvent, TransportHandle,
};

/// Close code used when a live socket is replaced by a new open request.
const REPLACED_CLOSE_CODE: u16 = 1000;
const REPLACED_CLOSE_REASON: &str = "Reconnecting";

/// Connection state tracking.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, strum_macros::Display)]
pub enum ConnectionState {
    /// No socket
    #[default]
    Idle,
    /// Open request issued
    Connecting,
    /// Socket open, messages flow
    Connected,
    /// Close handshake in progress
    Closing,
    /// The last attempt failed
    Failed,
}

impl ConnectionState {
    /// Check if the connection is currently active.
    #[must_use]
    pub const fn is_connected(self) -> bool {
        matches!(self, Self::Connected)
    }
}

struct ActiveConnection<H> {
    id: ConnectionId,
    endpoint: Url,
    handle: H,
}

/// Owns at most one logical connection and its [`ConnectionState`].
///
/// The manager does no I/O of its own: it asks its [`Transport`] to open and
/// close sockets and folds the transport's [`ConnectionEvent`]s into state
/// transitions via [`ConnectionManager::handle`]. Events carrying the id of a
/// socket that is no longer live are dropped, so no two sockets ever feed the
/// state machine at once.
pub struct ConnectionManager<T: Transport> {
    transport: T,
    events: EventSender,
    state: ConnectionState,
    active: Option<ActiveConnection<T::Handle>>,
    next_id: u64,
}

impl<T: Transport> ConnectionManager<T> {
    /// Create a manager whose connections report on `events`.
    pub fn new(transport: T, events: EventSender) -> Self {
        Self {
            transport,
            events,
            state: ConnectionState::Idle,
            active: None,
            next_id: 0,
        }
    }

    /// Get the current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Endpoint of the live connection, if any.
    #[must_use]
    pub fn endpoint(&self) -> Option<&Url> {
        self.active.as_ref().map(|active| &active.endpoint)
    }

    /// Id of the live connection, if any.
    #[must_use]
    pub fn connection_id(&self) -> Option<ConnectionId> {
        self.active.as_ref().map(|active| active.id)
    }

    /// Open a connection to `url`, discarding any live socket first.
    pub fn open(&mut self, url: &Url) -> ConnectionId {
        if self.active.is_some() {
            self.discard(REPLACED_CLOSE_CODE, REPLACED_CLOSE_REASON);
        }

        self.next_id = self.next_id.wrapping_add(1);
        let id = ConnectionId::new(self.next_id);

        #[cfg(feature = "tracing")]
        tracing::debug!(%id, endpoint = %url, "Opening connection");

        let handle = self.transport.open(id, url, self.events.clone());
        self.active = Some(ActiveConnection {
            id,
            endpoint: url.clone(),
            handle,
        });
        self.state = ConnectionState::Connecting;

        id
    }

    /// Gracefully close the connection.
    ///
    /// When connected this starts the close handshake and the state moves to
    /// [`ConnectionState::Closing`] until the transport reports `Closed`. A
    /// pending open is abandoned outright. Idle and closing connections are
    /// left untouched.
    pub fn close(&mut self, code: u16, reason: &str) {
        match self.state {
            ConnectionState::Idle | ConnectionState::Closing => {}
            ConnectionState::Connected => {
                if let Some(active) = self.active.as_mut() {
                    active.handle.close(code, reason);
                }
                self.state = ConnectionState::Closing;
            }
            ConnectionState::Connecting | ConnectionState::Failed => {
                self.discard(code, reason);
            }
        }
    }

    /// Close whatever is live and return to [`ConnectionState::Idle`] immediately.
    ///
    /// Events still in flight for the old socket are ignored afterwards.
    pub fn shutdown(&mut self, code: u16, reason: &str) {
        self.discard(code, reason);
    }

    fn discard(&mut self, code: u16, reason: &str) {
        if let Some(mut active) = self.active.take() {
            #[cfg(feature = "tracing")]
            tracing::debug!(id = %active.id, code, reason, "Discarding connection");
            active.handle.close(code, reason);
        }
        self.state = ConnectionState::Idle;
    }

    /// Apply a transport event to the state machine.
    ///
    /// Returns the event when it belongs to the live connection and is
    /// meaningful in the current state, `None` when it was stale or ignored.
    pub fn handle(&mut self, event: ConnectionEvent) -> Option<TransportEvent> {
        let ConnectionEvent { id, event } = event;

        if self.connection_id() != Some(id) {
            #[cfg(feature = "tracing")]
            tracing::trace!(%id, ?event, "Ignoring event from stale connection");
            return None;
        }

        match (&event, self.state) {
            (TransportEvent::Open, ConnectionState::Connecting) => {
                self.state = ConnectionState::Connected;
            }
            (TransportEvent::Message(_), ConnectionState::Connected) => {}
            (TransportEvent::Closing { .. }, ConnectionState::Connected) => {
                self.state = ConnectionState::Closing;
            }
            (TransportEvent::Closed { .. }, _) => {
                self.active = None;
                self.state = ConnectionState::Idle;
            }
            (TransportEvent::Failure(_), _) => {
                self.active = None;
                self.state = ConnectionState::Failed;
            }
            (_, state) => {
                #[cfg(feature = "tracing")]
                tracing::trace!(%id, ?event, %state, "Ignoring event in current state");
                #[cfg(not(feature = "tracing"))]
                let _ = state;
                return None;
            }
        }

        Some(event)
    }
}
