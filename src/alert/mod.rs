//! Alert fan-out.
//!
//! Every inbound message becomes exactly one [`AlertDispatcher::dispatch`]:
//! a sound trigger on the host [`SoundSink`] and a visible notification on the
//! host [`NotificationSink`]. Payloads are never parsed, filtered, or
//! deduplicated.

pub mod dispatcher;
pub mod sink;

pub use dispatcher::AlertDispatcher;
#[cfg(feature = "tracing")]
pub use sink::LogSink;
pub use sink::{NotificationId, NotificationSink, SoundSelector, SoundSink};
