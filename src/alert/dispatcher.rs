use std::sync::Arc;

use super::sink::{NotificationId, NotificationSink, SoundSink, SoundSelector};

/// Turns each inbound payload into one sound trigger and one notification.
///
/// The two side effects are independent: a failing sound sink never prevents
/// the notification and vice versa. Failures are logged and swallowed so an
/// undeliverable alert cannot affect the connection.
pub struct AlertDispatcher {
    notifications: Arc<dyn NotificationSink>,
    sound: Arc<dyn SoundSink>,
    selector: Option<SoundSelector>,
    title: String,
}

impl AlertDispatcher {
    pub fn new<S: Into<String>>(
        notifications: Arc<dyn NotificationSink>,
        sound: Arc<dyn SoundSink>,
        selector: Option<SoundSelector>,
        title: S,
    ) -> Self {
        Self {
            notifications,
            sound,
            selector,
            title: title.into(),
        }
    }

    /// Ring and post a notification carrying `payload` verbatim.
    ///
    /// Returns the id the notification was posted under.
    pub fn dispatch(&self, payload: &str) -> NotificationId {
        #[cfg(feature = "tracing")]
        tracing::debug!(payload, "Dispatching alert");

        self.ring();

        let id = NotificationId::generate();
        if let Err(e) = self.notifications.post(id, &self.title, payload) {
            #[cfg(feature = "tracing")]
            tracing::warn!(%id, error = %e, "Unable to post alert notification");
            #[cfg(not(feature = "tracing"))]
            let _ = &e;
        }

        id
    }

    /// Play the configured sound unless it is already playing.
    fn ring(&self) {
        if self.sound.is_playing() {
            #[cfg(feature = "tracing")]
            tracing::trace!("Alert sound already playing, not restarting it");
            return;
        }

        if let Err(e) = self.sound.play(self.selector.as_ref()) {
            #[cfg(feature = "tracing")]
            tracing::warn!(error = %e, "Unable to play alert sound");
            #[cfg(not(feature = "tracing"))]
            let _ = &e;
        }
    }

    /// Silence the alert sound if it is playing.
    pub fn silence(&self) {
        if self.sound.is_playing() {
            self.sound.stop();
        }
    }
}
