//! Boundary traits for the host's notification and sound facilities.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Result;

/// Opaque reference to an alert sound resource (a URI, file path, or any
/// key the host's [`SoundSink`] understands).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SoundSelector(String);

impl SoundSelector {
    #[must_use]
    pub fn new<S: Into<String>>(value: S) -> Self {
        Self(value.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SoundSelector {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for SoundSelector {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for SoundSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of one posted alert notification.
///
/// Backed by a UUIDv7, so ids are unique and sort in posting order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationId(Uuid);

impl NotificationId {
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::now_v7())
    }

    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Displays alerts and the persistent status line.
///
/// Implementations are called while the engine holds its internal lock and
/// must not call back into the controller.
pub trait NotificationSink: Send + Sync + 'static {
    /// Show a new visible alert. Distinct ids must not replace each other.
    fn post(&self, id: NotificationId, title: &str, body: &str) -> Result<()>;

    /// Replace the single low-priority status line.
    fn update_status(&self, text: &str) -> Result<()>;
}

/// Plays the alert sound.
pub trait SoundSink: Send + Sync + 'static {
    /// Start playing `sound`, or the system default when `None`.
    fn play(&self, sound: Option<&SoundSelector>) -> Result<()>;

    fn is_playing(&self) -> bool;

    fn stop(&self);
}

/// Sink that only writes alerts and status changes to the log.
#[cfg(feature = "tracing")]
#[expect(
    clippy::exhaustive_structs,
    reason = "Unit sink is constructed by value, e.g. `Arc::new(LogSink)`"
)]
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

#[cfg(feature = "tracing")]
impl NotificationSink for LogSink {
    fn post(&self, id: NotificationId, title: &str, body: &str) -> Result<()> {
        tracing::info!(%id, title, body, "Alert");
        Ok(())
    }

    fn update_status(&self, text: &str) -> Result<()> {
        tracing::info!(status = text, "Status changed");
        Ok(())
    }
}

#[cfg(feature = "tracing")]
impl SoundSink for LogSink {
    fn play(&self, sound: Option<&SoundSelector>) -> Result<()> {
        tracing::info!(sound = sound.map_or("default", SoundSelector::as_str), "Playing alert sound");
        Ok(())
    }

    fn is_playing(&self) -> bool {
        false
    }

    fn stop(&self) {}
}
