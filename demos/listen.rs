//! Listen for alerts on a WebSocket endpoint and log them.
//!
//! Alerts and status lines are written through the tracing log sink:
//! ```sh
//! RUST_LOG=info,alert_relay=debug cargo run --example listen -- ws://192.168.1.20:8765/alerts
//! ```
//!
//! Optionally log to a file:
//! ```sh
//! LOG_FILE=listen.log RUST_LOG=info cargo run --example listen -- ws://192.168.1.20:8765/alerts
//! ```

use std::fs::File;
use std::sync::Arc;

use alert_relay::alert::LogSink;
use alert_relay::service::{Collaborators, EngineConfig, LifecycleController, ServiceConfig};
use anyhow::Context as _;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Ok(path) = std::env::var("LOG_FILE") {
        let file = File::create(path)?;
        tracing_subscriber::registry()
            .with(EnvFilter::from_default_env())
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(file)
                    .with_ansi(false),
            )
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .init();
    }

    let endpoint = std::env::args()
        .nth(1)
        .context("usage: listen <ws://host:port/path> [sound]")?;
    let sound = std::env::args().nth(2);

    let collaborators = Collaborators::builder()
        .notifications(Arc::new(LogSink))
        .sound(Arc::new(LogSink))
        .build();
    let controller = LifecycleController::websocket(collaborators, EngineConfig::default());

    let config = ServiceConfig::builder()
        .endpoint_url(endpoint)
        .maybe_sound(sound)
        .build();
    controller.start(config)?;

    let mut status = controller.status_receiver();
    tokio::select! {
        result = tokio::signal::ctrl_c() => result?,
        () = async {
            while status.changed().await.is_ok() {
                info!(status = %*status.borrow_and_update(), "Engine status changed");
            }
        } => {}
    }

    controller.stop();
    info!("Stopped");

    Ok(())
}
