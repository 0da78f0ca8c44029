#![expect(
    clippy::module_name_repetitions,
    reason = "Controller types expose their domain in the name for clarity"
)]

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use backoff::backoff::Backoff as _;
use bon::Builder;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use url::Url;

use super::config::{EngineConfig, ServiceConfig, StartError};
use super::restart::{RunRecord, RunStateStore};
use super::status::{self, EngineStatus};
use super::wake::{NoopInhibitor, StayAwake, SuspendInhibitor};
use crate::alert::{AlertDispatcher, NotificationSink, SoundSink};
use crate::ws::{
    ConnectionEvent, ConnectionManager, LinearBackoff, ReconnectState, Transport, TransportEvent,
    WsTransport,
};

const STOP_REASON: &str = "Service stopped";
const TEARDOWN_REASON: &str = "Service torn down";

fn noop_inhibitor() -> Arc<dyn SuspendInhibitor> {
    Arc::new(NoopInhibitor)
}

/// Host-provided facilities the engine calls into.
#[derive(Builder)]
pub struct Collaborators {
    notifications: Arc<dyn NotificationSink>,
    sound: Arc<dyn SoundSink>,
    #[builder(default = noop_inhibitor())]
    inhibitor: Arc<dyn SuspendInhibitor>,
    run_store: Option<Arc<dyn RunStateStore>>,
}

/// Everything that exists only between a start and the matching stop.
struct Session {
    config: ServiceConfig,
    endpoint: Url,
    dispatcher: Arc<AlertDispatcher>,
    stay_awake: StayAwake,
}

struct PendingRetry {
    generation: u64,
    token: CancellationToken,
}

/// State guarded by the controller's single lock.
struct Engine<T: Transport> {
    connection: ConnectionManager<T>,
    backoff: LinearBackoff,
    retry: Option<PendingRetry>,
    /// Bumped whenever pending retries must be invalidated
    retry_generation: u64,
    session: Option<Session>,
}

impl<T: Transport> Engine<T> {
    fn reconnect_state(&self) -> ReconnectState {
        ReconnectState::new(self.backoff.attempt(), self.retry.is_some())
    }

    fn status(&self) -> EngineStatus {
        EngineStatus::derive(
            self.session.is_some(),
            self.connection.state(),
            self.reconnect_state(),
        )
    }

    fn cancel_retry(&mut self) {
        if let Some(retry) = self.retry.take() {
            retry.token.cancel();
        }
        self.retry_generation = self.retry_generation.wrapping_add(1);
    }
}

struct Inner<T: Transport> {
    engine: Mutex<Engine<T>>,
    status_tx: watch::Sender<EngineStatus>,
    collaborators: Collaborators,
    config: EngineConfig,
    runtime: Handle,
}

/// Starts, stops, and supervises the alert connection.
///
/// The controller owns one [`ConnectionManager`], feeds its inbound messages
/// to an [`AlertDispatcher`], and schedules retries according to the
/// [`ReconnectPolicy`](crate::ws::ReconnectPolicy) when the connection drops.
///
/// [`start`](Self::start), [`stop`](Self::stop), and [`status`](Self::status)
/// may be called from any thread, inside or outside the runtime, and never
/// block on I/O. All state lives behind a single lock, and [`stop`](Self::stop)
/// always wins: once it returns no reconnect happens until the next start.
///
/// Cloning yields another handle to the same engine. Dropping the last handle
/// tears the engine down without recording a stop, so a restart hook sees it
/// as still running.
///
/// # Example
///
/// ```rust, no_run
/// use std::sync::Arc;
///
/// use alert_relay::alert::LogSink;
/// use alert_relay::service::{Collaborators, EngineConfig, LifecycleController, ServiceConfig};
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let collaborators = Collaborators::builder()
///         .notifications(Arc::new(LogSink))
///         .sound(Arc::new(LogSink))
///         .build();
///     let controller = LifecycleController::websocket(collaborators, EngineConfig::default());
///
///     controller.start(ServiceConfig::new("ws://192.168.1.20:8765/alerts"))?;
///     tokio::signal::ctrl_c().await?;
///     controller.stop();
///
///     Ok(())
/// }
/// ```
pub struct LifecycleController<T: Transport = WsTransport> {
    inner: Arc<Inner<T>>,
}

impl<T: Transport> Clone for LifecycleController<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl LifecycleController<WsTransport> {
    /// Create a controller using the WebSocket transport.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    #[must_use]
    pub fn websocket(collaborators: Collaborators, config: EngineConfig) -> Self {
        let transport = WsTransport::new(&config.connection);
        Self::new(transport, collaborators, config)
    }
}

impl<T: Transport> LifecycleController<T> {
    /// Create a stopped controller driving `transport`.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn new(transport: T, collaborators: Collaborators, config: EngineConfig) -> Self {
        let runtime = Handle::current();
        let (events_tx, mut events_rx) = mpsc::unbounded_channel::<ConnectionEvent>();
        let (status_tx, _) = watch::channel(EngineStatus::Idle);

        let engine = Engine {
            connection: ConnectionManager::new(transport, events_tx),
            backoff: config.connection.reconnect.into(),
            retry: None,
            retry_generation: 0,
            session: None,
        };
        let inner = Arc::new(Inner {
            engine: Mutex::new(engine),
            status_tx,
            collaborators,
            config,
            runtime,
        });

        // Serializes every transport callback through one task
        let weak = Arc::downgrade(&inner);
        inner.runtime.spawn(async move {
            while let Some(event) = events_rx.recv().await {
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                inner.on_event(event);
            }
        });

        Self { inner }
    }

    /// Validate `config` and (re)start listening.
    ///
    /// When already running, the live connection is closed, the retry ladder
    /// is reset, and a new connection is opened with the new configuration.
    pub fn start(&self, config: ServiceConfig) -> Result<(), StartError> {
        let endpoint = config.endpoint()?;
        let _runtime = self.inner.runtime.enter();

        let mut engine = self.inner.lock();
        engine.cancel_retry();
        engine.backoff.reset();

        if let Some(previous) = engine.session.take() {
            #[cfg(feature = "tracing")]
            tracing::debug!(
                previous = %previous.endpoint,
                endpoint = %endpoint,
                "Restarting with new configuration"
            );
            previous.stay_awake.release();
        }

        let stay_awake = StayAwake::acquire(
            Arc::clone(&self.inner.collaborators.inhibitor),
            self.inner.config.wake_ceiling,
        );
        let dispatcher = Arc::new(AlertDispatcher::new(
            Arc::clone(&self.inner.collaborators.notifications),
            Arc::clone(&self.inner.collaborators.sound),
            config.sound.clone(),
            self.inner.config.alert_title.clone(),
        ));

        engine.connection.open(&endpoint);
        engine.session = Some(Session {
            config: config.clone(),
            endpoint,
            dispatcher,
            stay_awake,
        });

        self.inner.record_run_state(true, Some(config));
        self.inner.publish(&engine, status::CONNECTING);

        Ok(())
    }

    /// Stop listening. Idempotent.
    ///
    /// Cancels any pending retry, closes the connection, silences the alert
    /// sound, and releases the stay-awake resource.
    pub fn stop(&self) {
        let mut engine = self.inner.lock();
        engine.cancel_retry();
        engine.backoff.reset();
        engine
            .connection
            .shutdown(self.inner.config.close_code, STOP_REASON);

        let Some(session) = engine.session.take() else {
            return;
        };

        #[cfg(feature = "tracing")]
        tracing::debug!(endpoint = %session.endpoint, "Stopped");

        session.stay_awake.release();
        session.dispatcher.silence();
        self.inner.record_run_state(false, Some(session.config));
        self.inner.publish(&engine, status::STOPPED);
    }

    /// Restart with the stored configuration if the run store says the engine
    /// was running when the process went away.
    ///
    /// Returns whether a start was issued.
    pub fn resume(&self) -> Result<bool, StartError> {
        let Some(store) = &self.inner.collaborators.run_store else {
            return Ok(false);
        };
        let Some(config) = store
            .load()
            .and_then(|record| record.resumable().cloned())
        else {
            return Ok(false);
        };

        #[cfg(feature = "tracing")]
        tracing::debug!(endpoint = %config.endpoint_url, "Resuming after restart");

        self.start(config)?;
        Ok(true)
    }

    /// Current engine status.
    #[must_use]
    pub fn status(&self) -> EngineStatus {
        self.inner.lock().status()
    }

    /// Subscribe to status changes.
    #[must_use]
    pub fn status_receiver(&self) -> watch::Receiver<EngineStatus> {
        self.inner.status_tx.subscribe()
    }

    /// Whether a start is in effect (no stop since the last start).
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.inner.lock().session.is_some()
    }

    /// Retry bookkeeping: retries spent since the last open, and whether one is pending.
    #[must_use]
    pub fn reconnect_state(&self) -> ReconnectState {
        self.inner.lock().reconnect_state()
    }

    /// Configuration of the current run.
    #[must_use]
    pub fn config(&self) -> Option<ServiceConfig> {
        self.inner
            .lock()
            .session
            .as_ref()
            .map(|session| session.config.clone())
    }

    /// Endpoint of the live connection attempt, if any.
    #[must_use]
    pub fn active_endpoint(&self) -> Option<Url> {
        self.inner.lock().connection.endpoint().cloned()
    }
}

impl<T: Transport> Inner<T> {
    fn lock(&self) -> MutexGuard<'_, Engine<T>> {
        // Every mutation leaves the engine consistent before it can panic,
        // so a poisoned lock is still usable.
        self.engine.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, engine: &Engine<T>, text: &str) {
        let status = engine.status();
        self.status_tx.send_replace(status);

        if let Err(e) = self.collaborators.notifications.update_status(text) {
            #[cfg(feature = "tracing")]
            tracing::warn!(%status, error = %e, "Unable to update status line");
            #[cfg(not(feature = "tracing"))]
            let _ = &e;
        }
    }

    fn record_run_state(&self, was_running: bool, config: Option<ServiceConfig>) {
        if let Some(store) = &self.collaborators.run_store {
            store.save(&RunRecord::new(was_running, config));
        }
    }

    fn on_event(self: &Arc<Self>, event: ConnectionEvent) {
        let mut engine = self.lock();

        // Stop wins over anything still in flight
        if engine.session.is_none() {
            return;
        }
        let Some(event) = engine.connection.handle(event) else {
            return;
        };

        match event {
            TransportEvent::Open => {
                #[cfg(feature = "tracing")]
                tracing::debug!(
                    retries = engine.backoff.attempt(),
                    "Connected, listening for alerts"
                );
                engine.backoff.reset();
                self.publish(&engine, status::CONNECTED);
            }
            TransportEvent::Message(payload) => {
                let dispatcher = engine
                    .session
                    .as_ref()
                    .map(|session| Arc::clone(&session.dispatcher));
                drop(engine);

                if let Some(dispatcher) = dispatcher {
                    dispatcher.dispatch(&payload);
                }
            }
            TransportEvent::Closing { code, reason } => {
                #[cfg(feature = "tracing")]
                tracing::debug!(code, %reason, "Connection closing");
                #[cfg(not(feature = "tracing"))]
                let _ = (code, reason);
                self.publish(&engine, status::CLOSING);
            }
            TransportEvent::Closed { code, reason } => {
                #[cfg(feature = "tracing")]
                tracing::debug!(code, %reason, "Connection closed");
                #[cfg(not(feature = "tracing"))]
                let _ = (code, reason);
                self.schedule_reconnect(&mut engine, status::DISCONNECTED);
            }
            TransportEvent::Failure(error) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(%error, unreachable = error.is_open_failure(), "Connection failed");
                #[cfg(not(feature = "tracing"))]
                let _ = error;
                self.schedule_reconnect(&mut engine, status::FAILED);
            }
        }
    }

    /// Arm a retry timer unless one is pending or the policy is exhausted.
    fn schedule_reconnect(self: &Arc<Self>, engine: &mut Engine<T>, text: &str) {
        if engine.retry.is_some() {
            #[cfg(feature = "tracing")]
            tracing::trace!("Reconnect already scheduled");
            return;
        }

        let Some(delay) = engine.backoff.next_backoff() else {
            #[cfg(feature = "tracing")]
            tracing::warn!(
                attempts = engine.backoff.attempt(),
                "Reconnect attempts exhausted, waiting for an explicit start"
            );
            self.publish(engine, status::EXHAUSTED);
            return;
        };

        engine.retry_generation = engine.retry_generation.wrapping_add(1);
        let generation = engine.retry_generation;
        let token = CancellationToken::new();

        let weak = Arc::downgrade(self);
        let cancelled = token.clone();
        self.runtime.spawn(async move {
            tokio::select! {
                () = cancelled.cancelled() => {}
                () = sleep(delay) => {
                    if let Some(inner) = weak.upgrade() {
                        inner.fire_retry(generation);
                    }
                }
            }
        });

        #[cfg(feature = "tracing")]
        tracing::debug!(
            attempt = engine.backoff.attempt(),
            ?delay,
            "Scheduling reconnect"
        );

        engine.retry = Some(PendingRetry { generation, token });
        self.publish(engine, text);
    }

    /// Timer callback: reopen unless the retry was superseded or stopped.
    fn fire_retry(&self, generation: u64) {
        let mut engine = self.lock();

        let authoritative = engine
            .retry
            .as_ref()
            .is_some_and(|retry| retry.generation == generation);
        let Some(endpoint) = engine
            .session
            .as_ref()
            .filter(|_| authoritative)
            .map(|session| session.endpoint.clone())
        else {
            #[cfg(feature = "tracing")]
            tracing::trace!(generation, "Ignoring stale reconnect timer");
            return;
        };

        engine.retry = None;

        #[cfg(feature = "tracing")]
        tracing::debug!(attempt = engine.backoff.attempt(), %endpoint, "Reconnecting");

        engine.connection.open(&endpoint);
        self.publish(&engine, status::CONNECTING);
    }
}

impl<T: Transport> Drop for Inner<T> {
    fn drop(&mut self) {
        let close_code = self.config.close_code;
        let engine = self.engine.get_mut().unwrap_or_else(PoisonError::into_inner);

        engine.cancel_retry();
        engine.connection.shutdown(close_code, TEARDOWN_REASON);

        if let Some(session) = engine.session.take() {
            #[cfg(feature = "tracing")]
            tracing::debug!(endpoint = %session.endpoint, "Torn down while running");
            session.stay_awake.release();
            session.dispatcher.silence();
        }
    }
}
