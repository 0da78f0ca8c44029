//! Core WebSocket infrastructure.
//!
//! This module separates connection bookkeeping from socket I/O so the state
//! machine can be driven by any transport.
//!
//! # Architecture
//!
//! - [`ConnectionManager`]: Owns one logical connection and its [`ConnectionState`]
//! - [`Transport`]: Opens sockets and reports [`ConnectionEvent`]s
//! - [`WsTransport`]: `tokio-tungstenite` transport with connect timeout and heartbeat
//! - [`ReconnectPolicy`]: Linear backoff with an attempt cap
//!
//! # Example
//!
//! ```ignore
//! let (events_tx, mut events_rx) = tokio::sync::mpsc::unbounded_channel();
//! let mut connection = ConnectionManager::new(WsTransport::default(), events_tx);
//! connection.open(&"wss://example.com/alerts".parse()?);
//!
//! while let Some(event) = events_rx.recv().await {
//!     if let Some(TransportEvent::Message(text)) = connection.handle(event) {
//!         println!("Received: {text}");
//!     }
//! }
//! ```

pub mod config;
pub mod connection;
pub mod error;
pub mod traits;
pub mod transport;

pub use config::{Config, HeartbeatConfig, LinearBackoff, ReconnectPolicy, ReconnectState};
pub use connection::{ConnectionManager, ConnectionState};
#[expect(
    clippy::module_name_repetitions,
    reason = "WsError includes module name for clarity when used outside this module"
)]
pub use error::WsError;
pub use traits::*;
pub use transport::{WsHandle, WsTransport};
