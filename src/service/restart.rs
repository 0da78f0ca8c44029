//! "Was running" bookkeeping for host restart hooks.
//!
//! The engine never persists anything itself. It reports its run state to a
//! host-provided [`RunStateStore`]; after a host restart the hook reads the
//! record back and calls [`LifecycleController::resume`](super::LifecycleController::resume).

use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use super::config::ServiceConfig;

/// Last known run state, as written on every start and stop.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRecord {
    /// `true` from a start until the matching stop; left `true` by abnormal teardown
    pub was_running: bool,
    /// Configuration of the last start
    pub config: Option<ServiceConfig>,
}

impl RunRecord {
    #[must_use]
    pub const fn new(was_running: bool, config: Option<ServiceConfig>) -> Self {
        Self {
            was_running,
            config,
        }
    }

    /// The configuration to restart with, if the engine should be restarted.
    #[must_use]
    pub fn resumable(&self) -> Option<&ServiceConfig> {
        self.config.as_ref().filter(|_| self.was_running)
    }
}

/// Host storage for the [`RunRecord`], surviving process restarts.
pub trait RunStateStore: Send + Sync + 'static {
    fn load(&self) -> Option<RunRecord>;

    fn save(&self, record: &RunRecord);
}

/// Process-local store, for hosts that persist the record elsewhere.
#[derive(Debug, Default)]
pub struct MemoryRunStore {
    record: Mutex<Option<RunRecord>>,
}

impl MemoryRunStore {
    #[must_use]
    pub fn new(record: Option<RunRecord>) -> Self {
        Self {
            record: Mutex::new(record),
        }
    }
}

impl RunStateStore for MemoryRunStore {
    fn load(&self) -> Option<RunRecord> {
        // Recovering from poison is fine: the record is replaced wholesale.
        self.record
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn save(&self, record: &RunRecord) {
        *self.record.lock().unwrap_or_else(PoisonError::into_inner) = Some(record.clone());
    }
}
