#![expect(
    clippy::module_name_repetitions,
    reason = "Error types include the module name to indicate their scope"
)]

use std::error::Error as StdError;
use std::fmt;

use tokio_tungstenite::tungstenite;

use crate::error::{Error, Kind};

/// Why a connection attempt or a live connection ended abnormally.
///
/// Only ever delivered as [`TransportEvent::Failure`](super::TransportEvent::Failure);
/// the controller turns it into a scheduled retry, never into a returned error.
#[non_exhaustive]
#[derive(Debug)]
pub enum WsError {
    /// TCP, TLS or the upgrade handshake failed
    OpenFailed(tungstenite::Error),
    /// Reading or writing an open socket failed
    TransportFailure(tungstenite::Error),
    /// The open did not finish within the connect timeout
    Timeout,
    /// A PING went unanswered for longer than the heartbeat timeout
    HeartbeatTimeout,
}

impl WsError {
    /// Whether the endpoint was never reached.
    #[must_use]
    pub const fn is_open_failure(&self) -> bool {
        matches!(self, Self::OpenFailed(_) | Self::Timeout)
    }
}

impl fmt::Display for WsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OpenFailed(e) => write!(f, "unable to open connection: {e}"),
            Self::TransportFailure(e) => write!(f, "connection failed: {e}"),
            Self::Timeout => f.write_str("open timed out"),
            Self::HeartbeatTimeout => f.write_str("heartbeat timed out"),
        }
    }
}

impl StdError for WsError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::OpenFailed(e) | Self::TransportFailure(e) => Some(e),
            Self::Timeout | Self::HeartbeatTimeout => None,
        }
    }
}

impl From<WsError> for Error {
    fn from(e: WsError) -> Self {
        Error::with_source(Kind::WebSocket, e)
    }
}
