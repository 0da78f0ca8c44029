#![allow(
    clippy::unwrap_used,
    clippy::missing_panics_doc,
    reason = "Do not need additional syntax for setting up tests"
)]
#![allow(
    unused,
    reason = "Each test binary uses a different subset of these helpers"
)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use alert_relay::alert::{NotificationId, NotificationSink, SoundSelector, SoundSink};
use alert_relay::error::Error;
use alert_relay::service::{
    Collaborators, EngineConfig, EngineStatus, LifecycleController, MemoryRunStore,
    RunStateStore, SuspendInhibitor,
};
use alert_relay::ws::{
    ConnectionEvent, ConnectionId, EventSender, Transport, TransportEvent, TransportHandle,
    WsError,
};
use tokio::sync::mpsc;
use tokio::time::timeout;
use url::Url;

/// A notification posted through [`RecordingNotifications`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    pub id: NotificationId,
    pub title: String,
    pub body: String,
}

/// Notification sink that records everything and streams posts to the test.
pub struct RecordingNotifications {
    pub posts: Mutex<Vec<Post>>,
    pub statuses: Mutex<Vec<String>>,
    pub fail_posts: AtomicBool,
    posts_tx: mpsc::UnboundedSender<Post>,
}

impl RecordingNotifications {
    pub fn channel() -> (Arc<Self>, mpsc::UnboundedReceiver<Post>) {
        let (posts_tx, posts_rx) = mpsc::unbounded_channel();
        let sink = Arc::new(Self {
            posts: Mutex::default(),
            statuses: Mutex::default(),
            fail_posts: AtomicBool::new(false),
            posts_tx,
        });
        (sink, posts_rx)
    }

    pub fn statuses(&self) -> Vec<String> {
        self.statuses.lock().unwrap().clone()
    }

    pub fn post_count(&self) -> usize {
        self.posts.lock().unwrap().len()
    }
}

impl NotificationSink for RecordingNotifications {
    fn post(&self, id: NotificationId, title: &str, body: &str) -> alert_relay::Result<()> {
        let post = Post {
            id,
            title: title.to_owned(),
            body: body.to_owned(),
        };
        self.posts.lock().unwrap().push(post.clone());
        drop(self.posts_tx.send(post));

        if self.fail_posts.load(Ordering::SeqCst) {
            return Err(Error::sink("notifications disabled"));
        }
        Ok(())
    }

    fn update_status(&self, text: &str) -> alert_relay::Result<()> {
        self.statuses.lock().unwrap().push(text.to_owned());
        Ok(())
    }
}

/// Sound sink that starts "playing" on every successful play call.
#[derive(Default)]
pub struct RecordingSound {
    pub plays: AtomicUsize,
    pub stops: AtomicUsize,
    pub playing: AtomicBool,
    pub fail: AtomicBool,
    pub selectors: Mutex<Vec<Option<SoundSelector>>>,
}

impl RecordingSound {
    pub fn play_count(&self) -> usize {
        self.plays.load(Ordering::SeqCst)
    }
}

impl SoundSink for RecordingSound {
    fn play(&self, sound: Option<&SoundSelector>) -> alert_relay::Result<()> {
        self.plays.fetch_add(1, Ordering::SeqCst);
        self.selectors.lock().unwrap().push(sound.cloned());
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::sink("audio focus denied"));
        }
        self.playing.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }

    fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
        self.playing.store(false, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub struct RecordingInhibitor {
    pub acquired: AtomicUsize,
    pub released: AtomicUsize,
}

impl RecordingInhibitor {
    pub fn acquired(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }
}

impl SuspendInhibitor for RecordingInhibitor {
    fn acquire(&self, _ceiling: Duration) {
        self.acquired.fetch_add(1, Ordering::SeqCst);
    }

    fn release(&self) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

/// One connection opened through the [`ScriptedTransport`]; the test plays
/// the transport's part by emitting events for it.
pub struct Opened {
    pub id: ConnectionId,
    pub url: Url,
    events: EventSender,
}

impl Opened {
    pub fn emit(&self, event: TransportEvent) {
        drop(self.events.send(ConnectionEvent::new(self.id, event)));
    }

    pub fn accept(&self) {
        self.emit(TransportEvent::Open);
    }

    pub fn message(&self, text: &str) {
        self.emit(TransportEvent::Message(text.to_owned()));
    }

    pub fn fail(&self) {
        self.emit(TransportEvent::Failure(WsError::Timeout));
    }

    pub fn closing(&self, code: u16, reason: &str) {
        self.emit(TransportEvent::Closing {
            code,
            reason: reason.to_owned(),
        });
    }

    pub fn closed(&self, code: u16, reason: &str) {
        self.emit(TransportEvent::Closed {
            code,
            reason: reason.to_owned(),
        });
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Closed {
    pub id: ConnectionId,
    pub code: u16,
    pub reason: String,
}

/// Transport whose sockets are driven entirely by the test.
pub struct ScriptedTransport {
    opens_tx: mpsc::UnboundedSender<Opened>,
    closes: Arc<Mutex<Vec<Closed>>>,
}

pub struct ScriptedHandle {
    id: ConnectionId,
    closes: Arc<Mutex<Vec<Closed>>>,
    closed: bool,
}

impl Transport for ScriptedTransport {
    type Handle = ScriptedHandle;

    fn open(&self, id: ConnectionId, url: &Url, events: EventSender) -> ScriptedHandle {
        drop(self.opens_tx.send(Opened {
            id,
            url: url.clone(),
            events,
        }));
        ScriptedHandle {
            id,
            closes: Arc::clone(&self.closes),
            closed: false,
        }
    }
}

impl TransportHandle for ScriptedHandle {
    fn close(&mut self, code: u16, reason: &str) {
        if std::mem::replace(&mut self.closed, true) {
            return;
        }
        self.closes.lock().unwrap().push(Closed {
            id: self.id,
            code,
            reason: reason.to_owned(),
        });
    }
}

/// Test side of a [`ScriptedTransport`].
pub struct Script {
    opens_rx: mpsc::UnboundedReceiver<Opened>,
    closes: Arc<Mutex<Vec<Closed>>>,
}

impl Script {
    /// Wait for the engine to open the next connection.
    pub async fn next_open(&mut self) -> Opened {
        timeout(Duration::from_secs(3600), self.opens_rx.recv())
            .await
            .expect("no connection was opened")
            .expect("transport was dropped")
    }

    /// `true` when no connection is opened within `duration`.
    pub async fn no_open_within(&mut self, duration: Duration) -> bool {
        timeout(duration, self.opens_rx.recv()).await.is_err()
    }

    pub fn try_next_open(&mut self) -> Option<Opened> {
        self.opens_rx.try_recv().ok()
    }

    pub fn closes(&self) -> Vec<Closed> {
        self.closes.lock().unwrap().clone()
    }
}

pub fn scripted_transport() -> (ScriptedTransport, Script) {
    let (opens_tx, opens_rx) = mpsc::unbounded_channel();
    let closes = Arc::new(Mutex::new(Vec::new()));
    (
        ScriptedTransport {
            opens_tx,
            closes: Arc::clone(&closes),
        },
        Script { opens_rx, closes },
    )
}

/// Recording collaborators shared by every harness.
pub struct Sinks {
    pub notifications: Arc<RecordingNotifications>,
    pub posts: mpsc::UnboundedReceiver<Post>,
    pub sound: Arc<RecordingSound>,
    pub inhibitor: Arc<RecordingInhibitor>,
    pub store: Arc<MemoryRunStore>,
}

impl Sinks {
    pub fn new(store: MemoryRunStore) -> Self {
        let (notifications, posts) = RecordingNotifications::channel();
        Self {
            notifications,
            posts,
            sound: Arc::new(RecordingSound::default()),
            inhibitor: Arc::new(RecordingInhibitor::default()),
            store: Arc::new(store),
        }
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators::builder()
            .notifications(Arc::clone(&self.notifications) as Arc<dyn NotificationSink>)
            .sound(Arc::clone(&self.sound) as Arc<dyn SoundSink>)
            .inhibitor(Arc::clone(&self.inhibitor) as Arc<dyn SuspendInhibitor>)
            .run_store(Arc::clone(&self.store) as Arc<dyn RunStateStore>)
            .build()
    }

    /// Wait for the next posted alert.
    pub async fn next_post(&mut self) -> Post {
        timeout(Duration::from_secs(10), self.posts.recv())
            .await
            .expect("no alert was posted")
            .expect("notification sink was dropped")
    }
}

/// Controller over a [`ScriptedTransport`] plus everything needed to observe it.
pub struct Harness {
    pub controller: LifecycleController<ScriptedTransport>,
    pub script: Script,
    pub sinks: Sinks,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_store(MemoryRunStore::default())
    }

    pub fn with_store(store: MemoryRunStore) -> Self {
        let (transport, script) = scripted_transport();
        let sinks = Sinks::new(store);
        let controller =
            LifecycleController::new(transport, sinks.collaborators(), EngineConfig::default());
        Self {
            controller,
            script,
            sinks,
        }
    }
}

/// Wait until the controller's status satisfies `predicate`.
pub async fn wait_for_status<T, F>(controller: &LifecycleController<T>, predicate: F) -> EngineStatus
where
    T: Transport,
    F: FnMut(&EngineStatus) -> bool,
{
    let mut rx = controller.status_receiver();
    let status = *timeout(Duration::from_secs(10), rx.wait_for(predicate))
        .await
        .expect("timed out waiting for status")
        .expect("status channel closed");
    status
}

/// Let the event pump drain whatever has been emitted so far.
pub async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}
