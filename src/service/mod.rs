//! Engine lifecycle: start/stop contract, status projection, stay-awake
//! scoping, and the restart hook.
//!
//! # Example
//!
//! ```rust, no_run
//! use std::sync::Arc;
//!
//! use alert_relay::alert::LogSink;
//! use alert_relay::service::{Collaborators, EngineConfig, LifecycleController, ServiceConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let controller = LifecycleController::websocket(
//!     Collaborators::builder()
//!         .notifications(Arc::new(LogSink))
//!         .sound(Arc::new(LogSink))
//!         .build(),
//!     EngineConfig::default(),
//! );
//!
//! controller.start(ServiceConfig::new("wss://alerts.example.com/feed"))?;
//! println!("{}", controller.status());
//! controller.stop();
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod controller;
pub mod restart;
pub mod status;
pub mod wake;

pub use config::{EngineConfig, ServiceConfig, StartError};
pub use controller::{Collaborators, LifecycleController};
pub use restart::{MemoryRunStore, RunRecord, RunStateStore};
pub use status::EngineStatus;
pub use wake::{NoopInhibitor, StayAwake, SuspendInhibitor};
