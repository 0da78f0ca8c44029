use std::fmt;

use serde::Serialize;

use crate::ws::{ConnectionState, ReconnectState};

pub(crate) const CONNECTING: &str = "Connecting...";
pub(crate) const CONNECTED: &str = "Connected - Listening for alerts";
pub(crate) const CLOSING: &str = "Connection closing...";
pub(crate) const DISCONNECTED: &str = "Disconnected - Attempting reconnection...";
pub(crate) const FAILED: &str = "Connection failed - Reconnecting...";
pub(crate) const EXHAUSTED: &str = "Connection failed - Retry limit reached";
pub(crate) const STOPPED: &str = "Stopped";

/// Read-only view of the engine for observers.
///
/// Never stored; always derived from the connection and retry state.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EngineStatus {
    /// Not started, or stopped
    #[default]
    Idle,
    /// First connection attempt after a start
    Connecting,
    /// Waiting for, or performing, a scheduled retry
    Reconnecting {
        /// 1-based retry number
        attempt: u32,
    },
    /// Listening for alerts
    Connected,
    /// Close handshake in progress
    Closing,
    /// Retries exhausted; only a new start leaves this state
    Failed,
}

impl EngineStatus {
    /// Project the engine state onto a status.
    #[must_use]
    pub fn derive(running: bool, connection: ConnectionState, reconnect: ReconnectState) -> Self {
        if !running {
            return Self::Idle;
        }

        match connection {
            ConnectionState::Connecting if reconnect.attempt_count > 0 => Self::Reconnecting {
                attempt: reconnect.attempt_count,
            },
            ConnectionState::Connecting => Self::Connecting,
            ConnectionState::Connected => Self::Connected,
            ConnectionState::Closing => Self::Closing,
            ConnectionState::Idle | ConnectionState::Failed if reconnect.is_scheduled => {
                Self::Reconnecting {
                    attempt: reconnect.attempt_count,
                }
            }
            ConnectionState::Idle | ConnectionState::Failed => Self::Failed,
        }
    }

    /// Whether the engine gave up and waits for an explicit start.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Failed)
    }

    #[must_use]
    pub const fn is_connected(self) -> bool {
        matches!(self, Self::Connected)
    }
}

impl fmt::Display for EngineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("Idle"),
            Self::Connecting => f.write_str("Connecting"),
            Self::Reconnecting { attempt } => write!(f, "Reconnecting (attempt {attempt})"),
            Self::Connected => f.write_str("Connected"),
            Self::Closing => f.write_str("Closing"),
            Self::Failed => f.write_str("Failed"),
        }
    }
}
