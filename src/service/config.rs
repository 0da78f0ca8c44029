#![expect(
    clippy::module_name_repetitions,
    reason = "Configuration types intentionally mirror the module name for clarity"
)]

use std::error::Error as StdError;
use std::fmt;
use std::time::Duration;

use bon::Builder;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::alert::SoundSelector;
use crate::error::{Error, Kind};
use crate::ws::config::Config;

const DEFAULT_WAKE_CEILING_DURATION: Duration = Duration::from_secs(10 * 60);
const DEFAULT_ALERT_TITLE: &str = "Alert!";
const NORMAL_CLOSE_CODE: u16 = 1000;

/// What to listen to and how to ring.
///
/// Supplied on every [`start`](crate::service::LifecycleController::start);
/// a later start replaces it.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Builder)]
pub struct ServiceConfig {
    /// WebSocket endpoint; `http(s)` URLs are accepted and upgraded to `ws(s)`
    #[builder(into)]
    pub endpoint_url: String,
    /// Alert sound; `None` uses the host's default
    #[builder(into)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sound: Option<SoundSelector>,
}

impl ServiceConfig {
    #[must_use]
    pub fn new<S: Into<String>>(endpoint_url: S) -> Self {
        Self {
            endpoint_url: endpoint_url.into(),
            sound: None,
        }
    }

    /// Validate the endpoint and normalize it to a connectable WebSocket URL.
    pub fn endpoint(&self) -> Result<Url, StartError> {
        let raw = self.endpoint_url.trim();
        if raw.is_empty() {
            return Err(StartError::invalid("endpoint URL is empty"));
        }

        let mut url = Url::parse(raw)
            .map_err(|e| StartError::invalid(format!("endpoint URL `{raw}` is invalid: {e}")))?;

        let upgraded = match url.scheme() {
            "ws" | "wss" => None,
            "http" => Some("ws"),
            "https" => Some("wss"),
            other => {
                return Err(StartError::invalid(format!(
                    "unsupported endpoint scheme `{other}`"
                )));
            }
        };
        if let Some(scheme) = upgraded {
            url.set_scheme(scheme).map_err(|()| {
                StartError::invalid(format!("unable to use scheme `{scheme}` for `{raw}`"))
            })?;
        }

        if url.host_str().is_none_or(str::is_empty) {
            return Err(StartError::invalid(format!("endpoint URL `{raw}` has no host")));
        }

        Ok(url)
    }
}

/// Synchronous rejection of a start request. No state changes when it is returned.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartError {
    /// The endpoint URL is empty or not a connectable URI
    InvalidConfig {
        /// Why the configuration was rejected
        reason: String,
    },
}

impl StartError {
    fn invalid<S: Into<String>>(reason: S) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for StartError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfig { reason } => write!(f, "invalid service config: {reason}"),
        }
    }
}

impl StdError for StartError {}

impl From<StartError> for Error {
    fn from(err: StartError) -> Self {
        Error::with_source(Kind::Validation, err)
    }
}

/// Engine tunables. Every field has a default.
#[non_exhaustive]
#[derive(Debug, Clone, Builder)]
pub struct EngineConfig {
    /// Connect timeout, heartbeat, and reconnect policy
    #[builder(default)]
    pub connection: Config,
    /// Longest the stay-awake resource is held without being released
    #[builder(default = DEFAULT_WAKE_CEILING_DURATION)]
    pub wake_ceiling: Duration,
    /// Title of every alert notification
    #[builder(into, default = DEFAULT_ALERT_TITLE.to_owned())]
    pub alert_title: String,
    /// Close code sent when stopping or replacing a connection
    #[builder(default = NORMAL_CLOSE_CODE)]
    pub close_code: u16,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}
