//! [`Transport`] implementation backed by `tokio-tungstenite`.

use std::time::Duration;

use futures::{SinkExt as _, StreamExt as _};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{Instant, interval, timeout};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use url::Url;

use super::config::{Config, HeartbeatConfig};
use super::error::WsError;
use super::traits::{
    ConnectionEvent, ConnectionId, EventSender, Transport, TransportEvent, TransportHandle,
};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Upper bound on waiting for the peer to answer our close frame.
const CLOSE_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// Close code reported when the socket ends without a close frame.
const ABNORMAL_CLOSE_CODE: u16 = 1006;

#[derive(Debug)]
struct CloseRequest {
    code: u16,
    reason: String,
}

enum Heartbeat {
    Ping,
    Expired,
}

/// WebSocket transport that runs each connection on its own tokio task.
///
/// Must be used from within a tokio runtime context.
#[derive(Debug, Clone)]
pub struct WsTransport {
    connect_timeout: Duration,
    heartbeat: Option<HeartbeatConfig>,
}

impl WsTransport {
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self {
            connect_timeout: config.connect_timeout,
            heartbeat: config.heartbeat,
        }
    }
}

impl Default for WsTransport {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}

/// Handle to a connection task spawned by [`WsTransport`].
#[derive(Debug)]
pub struct WsHandle {
    close_tx: Option<oneshot::Sender<CloseRequest>>,
}

impl TransportHandle for WsHandle {
    fn close(&mut self, code: u16, reason: &str) {
        if let Some(tx) = self.close_tx.take() {
            _ = tx.send(CloseRequest {
                code,
                reason: reason.to_owned(),
            });
        }
    }
}

impl Transport for WsTransport {
    type Handle = WsHandle;

    fn open(&self, id: ConnectionId, url: &Url, events: EventSender) -> WsHandle {
        let (close_tx, close_rx) = oneshot::channel();
        let endpoint = url.to_string();
        let transport = self.clone();

        tokio::spawn(async move {
            transport.run(id, endpoint, events, close_rx).await;
        });

        WsHandle {
            close_tx: Some(close_tx),
        }
    }
}

impl WsTransport {
    /// Open the socket and pump it until it closes, fails or is abandoned.
    async fn run(
        self,
        id: ConnectionId,
        endpoint: String,
        events: EventSender,
        mut close_rx: oneshot::Receiver<CloseRequest>,
    ) {
        let report = |event: TransportEvent| {
            _ = events.send(ConnectionEvent::new(id, event));
        };

        let ws_stream = tokio::select! {
            result = timeout(self.connect_timeout, connect_async(endpoint.as_str())) => {
                match result {
                    Ok(Ok((ws_stream, _))) => ws_stream,
                    Ok(Err(e)) => {
                        #[cfg(feature = "tracing")]
                        tracing::warn!(%id, %endpoint, error = %e, "Unable to connect");
                        report(TransportEvent::Failure(WsError::OpenFailed(e)));
                        return;
                    }
                    Err(_elapsed) => {
                        #[cfg(feature = "tracing")]
                        tracing::warn!(%id, %endpoint, "Connect timed out after {:?}", self.connect_timeout);
                        report(TransportEvent::Failure(WsError::Timeout));
                        return;
                    }
                }
            }
            // Closed or abandoned before the handshake finished
            _ = &mut close_rx => return,
        };

        report(TransportEvent::Open);

        if let Err(e) = self.handle_connection(ws_stream, &mut close_rx, &report).await {
            #[cfg(feature = "tracing")]
            tracing::warn!(%id, "Connection failed: {e}");
            report(TransportEvent::Failure(e));
        }
    }

    /// Handle an active WebSocket connection.
    async fn handle_connection<F>(
        &self,
        ws_stream: WsStream,
        close_rx: &mut oneshot::Receiver<CloseRequest>,
        report: &F,
    ) -> Result<(), WsError>
    where
        F: Fn(TransportEvent),
    {
        let (mut write, mut read) = ws_stream.split();

        // Channel to notify heartbeat loop when PONG is received
        let (pong_tx, pong_rx) = watch::channel(Instant::now());
        let (heartbeat_tx, mut heartbeat_rx) = mpsc::unbounded_channel();

        let heartbeat_handle = self.heartbeat.map(|config| {
            tokio::spawn(async move {
                Self::heartbeat_loop(heartbeat_tx, config, pong_rx).await;
            })
        });
        let stop_heartbeat = || {
            if let Some(handle) = &heartbeat_handle {
                handle.abort();
            }
        };

        let mut remote_close: Option<(u16, String)> = None;

        let result = loop {
            tokio::select! {
                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            #[cfg(feature = "tracing")]
                            tracing::trace!(%text, "Received WebSocket text message");
                            report(TransportEvent::Message(text.to_string()));
                        }
                        Some(Ok(Message::Pong(_))) => {
                            _ = pong_tx.send(Instant::now());
                        }
                        Some(Ok(Message::Close(frame))) => {
                            let (code, reason) = close_parts(frame);
                            report(TransportEvent::Closing { code, reason: reason.clone() });
                            remote_close = Some((code, reason));
                        }
                        Some(Ok(_)) => {
                            // Binary frames carry no alerts; PINGs are answered by tungstenite.
                        }
                        Some(Err(e)) => break Err(WsError::TransportFailure(e)),
                        None => {
                            let (code, reason) = remote_close
                                .take()
                                .unwrap_or_else(|| (ABNORMAL_CLOSE_CODE, "Connection lost".to_owned()));
                            report(TransportEvent::Closed { code, reason });
                            break Ok(());
                        }
                    }
                }

                request = &mut *close_rx => {
                    let Ok(request) = request else {
                        // Handle dropped: abandon without a handshake
                        break Ok(());
                    };
                    let frame = CloseFrame {
                        code: CloseCode::from(request.code),
                        reason: request.reason.clone().into(),
                    };
                    if write.send(Message::Close(Some(frame))).await.is_ok() {
                        _ = timeout(CLOSE_HANDSHAKE_TIMEOUT, async {
                            while let Some(Ok(_)) = read.next().await {}
                        })
                        .await;
                    }
                    report(TransportEvent::Closed { code: request.code, reason: request.reason });
                    break Ok(());
                }

                Some(signal) = heartbeat_rx.recv() => {
                    match signal {
                        Heartbeat::Ping => {
                            if let Err(e) = write.send(Message::Ping(Vec::new().into())).await {
                                break Err(WsError::TransportFailure(e));
                            }
                        }
                        Heartbeat::Expired => break Err(WsError::HeartbeatTimeout),
                    }
                }
            }
        };

        // Cleanup
        stop_heartbeat();

        result
    }

    /// Heartbeat loop that requests PING frames and monitors PONG responses.
    async fn heartbeat_loop(
        heartbeat_tx: mpsc::UnboundedSender<Heartbeat>,
        config: HeartbeatConfig,
        mut pong_rx: watch::Receiver<Instant>,
    ) {
        let mut ping_interval = interval(config.interval);
        // The first tick completes immediately; the socket was just opened
        ping_interval.tick().await;

        loop {
            ping_interval.tick().await;

            // Mark current PONG state as seen before sending PING
            // This prevents changed() from returning immediately due to a stale PONG
            drop(pong_rx.borrow_and_update());

            let ping_sent = Instant::now();
            if heartbeat_tx.send(Heartbeat::Ping).is_err() {
                // Message loop has terminated
                break;
            }

            match timeout(config.timeout, pong_rx.changed()).await {
                Ok(Ok(())) => {
                    let last_pong = *pong_rx.borrow_and_update();
                    if last_pong < ping_sent {
                        #[cfg(feature = "tracing")]
                        tracing::debug!("PONG older than last PING, connection may be stale");
                        _ = heartbeat_tx.send(Heartbeat::Expired);
                        break;
                    }
                }
                Ok(Err(_)) => {
                    // Channel closed, connection is terminating
                    break;
                }
                Err(_) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(
                        "Heartbeat timeout: no PONG received within {:?}",
                        config.timeout
                    );
                    _ = heartbeat_tx.send(Heartbeat::Expired);
                    break;
                }
            }
        }
    }
}

fn close_parts(frame: Option<CloseFrame>) -> (u16, String) {
    frame.map_or_else(
        || (1005, String::new()),
        |frame| (u16::from(frame.code), frame.reason.to_string()),
    )
}
