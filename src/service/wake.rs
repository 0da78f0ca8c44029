//! Scoped "prevent suspend" resource.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

/// Host facility that keeps the device from suspending background work.
pub trait SuspendInhibitor: Send + Sync + 'static {
    /// Begin inhibiting suspend. `ceiling` is the longest the host should honor it.
    fn acquire(&self, ceiling: Duration);

    fn release(&self);
}

/// Inhibitor for hosts without a suspend concept.
#[expect(
    clippy::exhaustive_structs,
    reason = "Unit inhibitor is constructed by value"
)]
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopInhibitor;

impl SuspendInhibitor for NoopInhibitor {
    fn acquire(&self, _ceiling: Duration) {}

    fn release(&self) {}
}

/// Held stay-awake resource.
///
/// Released at most once: explicitly via [`StayAwake::release`], when the
/// safety ceiling elapses, or on drop, whichever comes first. Further releases
/// are no-ops. Must be acquired within a tokio runtime context.
pub struct StayAwake {
    inhibitor: Arc<dyn SuspendInhibitor>,
    held: Arc<AtomicBool>,
    expiry: CancellationToken,
}

impl StayAwake {
    pub fn acquire(inhibitor: Arc<dyn SuspendInhibitor>, ceiling: Duration) -> Self {
        inhibitor.acquire(ceiling);

        let held = Arc::new(AtomicBool::new(true));
        let expiry = CancellationToken::new();

        let ceiling_inhibitor = Arc::clone(&inhibitor);
        let ceiling_held = Arc::clone(&held);
        let ceiling_token = expiry.clone();
        tokio::spawn(async move {
            tokio::select! {
                () = ceiling_token.cancelled() => {}
                () = sleep(ceiling) => {
                    if ceiling_held.swap(false, Ordering::AcqRel) {
                        #[cfg(feature = "tracing")]
                        tracing::warn!("Stay-awake ceiling of {ceiling:?} reached, releasing");
                        ceiling_inhibitor.release();
                    }
                }
            }
        });

        #[cfg(feature = "tracing")]
        tracing::debug!(?ceiling, "Stay-awake acquired");

        Self {
            inhibitor,
            held,
            expiry,
        }
    }

    #[must_use]
    pub fn is_held(&self) -> bool {
        self.held.load(Ordering::Acquire)
    }

    pub fn release(&self) {
        self.expiry.cancel();
        if self.held.swap(false, Ordering::AcqRel) {
            #[cfg(feature = "tracing")]
            tracing::debug!("Stay-awake released");
            self.inhibitor.release();
        }
    }
}

impl Drop for StayAwake {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for StayAwake {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StayAwake")
            .field("held", &self.is_held())
            .finish_non_exhaustive()
    }
}
