#![expect(
    clippy::module_name_repetitions,
    reason = "Configuration types intentionally mirror the module name for clarity"
)]

use std::time::Duration;

use backoff::backoff::Backoff;

const DEFAULT_CONNECT_TIMEOUT_DURATION: Duration = Duration::from_secs(10);
const DEFAULT_HEARTBEAT_INTERVAL_DURATION: Duration = Duration::from_secs(30);
const DEFAULT_HEARTBEAT_TIMEOUT_DURATION: Duration = Duration::from_secs(15);
const DEFAULT_RECONNECT_BASE_DELAY: Duration = Duration::from_secs(5);
const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 10;

/// Configuration for WebSocket connection behavior.
#[non_exhaustive]
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum time an open request may take before it is reported as failed
    pub connect_timeout: Duration,
    /// Keep-alive probing; `None` disables it
    pub heartbeat: Option<HeartbeatConfig>,
    /// Reconnection strategy configuration
    pub reconnect: ReconnectPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT_DURATION,
            heartbeat: Some(HeartbeatConfig::default()),
            reconnect: ReconnectPolicy::default(),
        }
    }
}

impl Config {
    #[must_use]
    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    #[must_use]
    pub fn with_heartbeat(mut self, heartbeat: Option<HeartbeatConfig>) -> Self {
        self.heartbeat = heartbeat;
        self
    }

    #[must_use]
    pub fn with_reconnect(mut self, reconnect: ReconnectPolicy) -> Self {
        self.reconnect = reconnect;
        self
    }
}

/// Protocol-level PING/PONG keep-alive settings.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeartbeatConfig {
    /// Interval for sending PING frames while connected
    pub interval: Duration,
    /// Maximum time to wait for PONG before considering the connection dead
    pub timeout: Duration,
}

impl HeartbeatConfig {
    #[must_use]
    pub const fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self::new(
            DEFAULT_HEARTBEAT_INTERVAL_DURATION,
            DEFAULT_HEARTBEAT_TIMEOUT_DURATION,
        )
    }
}

/// Linear reconnection policy.
///
/// The n-th retry waits `base_delay * n`. Once `max_attempts` retries have been
/// scheduled no further retry is produced.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Delay unit; attempt `n` waits `n` units
    pub base_delay: Duration,
    /// Maximum number of reconnection attempts before giving up.
    /// `None` means infinite retries.
    pub max_attempts: Option<u32>,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base_delay: DEFAULT_RECONNECT_BASE_DELAY,
            max_attempts: Some(DEFAULT_MAX_RECONNECT_ATTEMPTS),
        }
    }
}

impl ReconnectPolicy {
    #[must_use]
    pub const fn new(base_delay: Duration, max_attempts: Option<u32>) -> Self {
        Self {
            base_delay,
            max_attempts,
        }
    }

    /// Delay before the given (1-based) attempt.
    #[must_use]
    pub fn delay(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }

    /// Whether another retry may be scheduled after `attempt_count` retries.
    #[must_use]
    pub fn allows_retry(&self, attempt_count: u32) -> bool {
        self.max_attempts.is_none_or(|max| attempt_count < max)
    }
}

/// Snapshot of the retry bookkeeping owned by the lifecycle controller.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconnectState {
    /// Retries scheduled since the last successful open
    pub attempt_count: u32,
    /// Whether a retry timer is currently pending
    pub is_scheduled: bool,
}

impl ReconnectState {
    #[must_use]
    pub const fn new(attempt_count: u32, is_scheduled: bool) -> Self {
        Self {
            attempt_count,
            is_scheduled,
        }
    }
}

/// [`Backoff`] implementation driving a [`ReconnectPolicy`].
///
/// The attempt counter is incremented before the delay is computed, so the
/// first call yields `1 * base_delay`.
#[derive(Debug, Clone)]
pub struct LinearBackoff {
    policy: ReconnectPolicy,
    attempt: u32,
}

impl LinearBackoff {
    #[must_use]
    pub const fn new(policy: ReconnectPolicy) -> Self {
        Self { policy, attempt: 0 }
    }

    /// Number of retries handed out since the last reset.
    #[must_use]
    pub const fn attempt(&self) -> u32 {
        self.attempt
    }
}

impl From<ReconnectPolicy> for LinearBackoff {
    fn from(policy: ReconnectPolicy) -> Self {
        Self::new(policy)
    }
}

impl Backoff for LinearBackoff {
    fn reset(&mut self) {
        self.attempt = 0;
    }

    fn next_backoff(&mut self) -> Option<Duration> {
        if !self.policy.allows_retry(self.attempt) {
            return None;
        }

        self.attempt = self.attempt.saturating_add(1);
        Some(self.policy.delay(self.attempt))
    }
}
