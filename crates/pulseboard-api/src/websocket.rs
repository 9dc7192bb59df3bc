//! Push-feed WebSocket with auto-reconnect.
//!
//! Connects to the dashboard's push endpoint and forwards every text frame,
//! in arrival order, through an [`mpsc`] channel together with
//! open/close lifecycle events. Frames are not interpreted here. Handles
//! reconnection with exponential backoff + jitter automatically; frames
//! missed while disconnected are not replayed.
//!
//! # Example
//!
//! ```rust,ignore
//! use pulseboard_api::websocket::{ReconnectConfig, TransportEvent, WebSocketHandle};
//! use tokio_util::sync::CancellationToken;
//! use url::Url;
//!
//! let url = Url::parse("wss://dash.example.com/data/stream/")?;
//! let (handle, mut events) =
//!     WebSocketHandle::connect(url, ReconnectConfig::default(), CancellationToken::new(), None);
//!
//! while let Some(event) = events.recv().await {
//!     if let TransportEvent::Frame(text) = event {
//!         println!("{text}");
//!     }
//! }
//!
//! handle.shutdown();
//! ```

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite::{self, ClientRequestBuilder};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::Error;

// ── TransportEvent ───────────────────────────────────────────────────

/// What the transport reports to its single consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// A connection was (re-)established.
    Opened,
    /// An established connection ended. Reconnection follows unless shut down.
    Closed { reason: String },
    /// One complete text frame.
    Frame(String),
}

/// Observable state of the underlying link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Connecting,
    Open,
    Reconnecting { attempt: u32 },
    Closed,
}

// ── ReconnectConfig ──────────────────────────────────────────────────

/// Exponential backoff configuration for WebSocket reconnection.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Delay before the first reconnection attempt. Default: 1s.
    pub initial_delay: Duration,

    /// Upper bound on backoff delay. Default: 30s.
    pub max_delay: Duration,

    /// Maximum reconnection attempts before giving up.
    /// `None` means retry forever.
    pub max_retries: Option<u32>,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            max_retries: None,
        }
    }
}

// ── WebSocketHandle ──────────────────────────────────────────────────

/// Handle to a running push-feed connection.
///
/// Dropping the handle stops the background task.
pub struct WebSocketHandle {
    outbound_tx: mpsc::UnboundedSender<String>,
    link_state: watch::Receiver<LinkState>,
    cancel: CancellationToken,
}

impl WebSocketHandle {
    /// Spawn the reconnection loop and return immediately.
    ///
    /// The first connection attempt happens asynchronously. Inbound events
    /// arrive on the returned receiver in the order the server sent them.
    /// `cookie` is sent as the `Cookie` header on every upgrade request.
    pub fn connect(
        ws_url: Url,
        reconnect: ReconnectConfig,
        cancel: CancellationToken,
        cookie: Option<SecretString>,
    ) -> (Self, mpsc::UnboundedReceiver<TransportEvent>) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (state_tx, link_state) = watch::channel(LinkState::Connecting);

        let cancel = cancel.child_token();
        let task_cancel = cancel.clone();
        tokio::spawn(async move {
            let link = Link {
                url: ws_url,
                cookie,
                event_tx,
                state_tx,
                cancel: task_cancel,
            };
            ws_loop(link, outbound_rx, reconnect).await;
        });

        (
            Self {
                outbound_tx,
                link_state,
                cancel,
            },
            event_rx,
        )
    }

    /// Queue a text frame for the server.
    ///
    /// Fails with [`Error::NotConnected`] while the link is not open; the
    /// frame is dropped in that case.
    pub fn send(&self, text: impl Into<String>) -> Result<(), Error> {
        if *self.link_state.borrow() != LinkState::Open {
            return Err(Error::NotConnected);
        }
        self.outbound_tx
            .send(text.into())
            .map_err(|_| Error::NotConnected)
    }

    /// Subscribe to link state changes.
    pub fn link_state(&self) -> watch::Receiver<LinkState> {
        self.link_state.clone()
    }

    /// Signal the background task to shut down gracefully.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

impl Drop for WebSocketHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

// ── Background reconnection loop ─────────────────────────────────────

/// Everything a single connection needs, shared across reconnects.
struct Link {
    url: Url,
    cookie: Option<SecretString>,
    event_tx: mpsc::UnboundedSender<TransportEvent>,
    state_tx: watch::Sender<LinkState>,
    cancel: CancellationToken,
}

/// How a single connection attempt ended.
struct ConnectionEnd {
    opened: bool,
    result: Result<(), Error>,
}

/// Main loop: connect → read → on error, backoff → reconnect.
async fn ws_loop(
    link: Link,
    mut outbound_rx: mpsc::UnboundedReceiver<String>,
    reconnect: ReconnectConfig,
) {
    let mut attempt: u32 = 0;

    loop {
        let end = tokio::select! {
            biased;
            () = link.cancel.cancelled() => break,
            end = connect_and_read(&link, &mut outbound_rx) => end,
        };

        if link.cancel.is_cancelled() || link.event_tx.is_closed() {
            break;
        }

        if end.opened {
            attempt = 0;
        }

        match end.result {
            // Clean disconnect (server close frame or stream ended).
            // Reconnect immediately.
            Ok(()) => {
                tracing::info!("WebSocket disconnected cleanly, reconnecting");
                link.state_tx.send_replace(LinkState::Reconnecting { attempt: 0 });
            }
            Err(e) => {
                tracing::warn!(error = %e, attempt, "WebSocket error");

                if let Some(max) = reconnect.max_retries {
                    if attempt >= max {
                        tracing::error!(
                            max_retries = max,
                            "WebSocket reconnection limit reached, giving up"
                        );
                        break;
                    }
                }

                let delay = calculate_backoff(attempt, &reconnect);
                tracing::info!(
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    attempt,
                    "Waiting before reconnect"
                );
                attempt += 1;
                link.state_tx.send_replace(LinkState::Reconnecting { attempt });

                tokio::select! {
                    biased;
                    () = link.cancel.cancelled() => break,
                    () = tokio::time::sleep(delay) => {}
                }
            }
        }
    }

    link.state_tx.send_replace(LinkState::Closed);
    tracing::debug!("WebSocket loop exiting");
}

// ── Single connection lifecycle ──────────────────────────────────────

/// Establish a single WebSocket connection and pump frames until it drops.
///
/// Emits [`TransportEvent::Opened`] once the upgrade succeeds and
/// [`TransportEvent::Closed`] when that connection ends.
async fn connect_and_read(
    link: &Link,
    outbound_rx: &mut mpsc::UnboundedReceiver<String>,
) -> ConnectionEnd {
    tracing::info!(url = %link.url, "Connecting to WebSocket");

    let ws_stream = match open(link).await {
        Ok(stream) => stream,
        Err(e) => {
            return ConnectionEnd {
                opened: false,
                result: Err(e),
            };
        }
    };

    tracing::info!("WebSocket connected");
    link.state_tx.send_replace(LinkState::Open);
    let _ = link.event_tx.send(TransportEvent::Opened);

    let result = pump(ws_stream, link, outbound_rx).await;

    let reason = match &result {
        Ok(()) => "closed".to_owned(),
        Err(e) => e.to_string(),
    };
    link.state_tx.send_replace(LinkState::Connecting);
    let _ = link.event_tx.send(TransportEvent::Closed { reason });

    ConnectionEnd {
        opened: true,
        result,
    }
}

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// Perform the upgrade request, with the session cookie if configured.
async fn open(link: &Link) -> Result<WsStream, Error> {
    let uri: tungstenite::http::Uri = link
        .url
        .as_str()
        .parse()
        .map_err(|e: tungstenite::http::uri::InvalidUri| Error::WebSocketConnect(e.to_string()))?;

    let mut request = ClientRequestBuilder::new(uri);
    if let Some(cookie) = link.cookie.as_ref() {
        request = request.with_header("Cookie", cookie.expose_secret());
    }

    let (ws_stream, _response) = tokio_tungstenite::connect_async(request)
        .await
        .map_err(|e| Error::WebSocketConnect(e.to_string()))?;

    Ok(ws_stream)
}

/// Read frames and write queued outbound frames until the connection ends.
async fn pump(
    ws_stream: WsStream,
    link: &Link,
    outbound_rx: &mut mpsc::UnboundedReceiver<String>,
) -> Result<(), Error> {
    let (mut write, mut read) = ws_stream.split();

    loop {
        tokio::select! {
            biased;
            () = link.cancel.cancelled() => {
                let _ = write.send(tungstenite::Message::Close(None)).await;
                return Ok(());
            }
            Some(text) = outbound_rx.recv() => {
                tracing::debug!(frame = %text, "WebSocket send");
                write
                    .send(tungstenite::Message::Text(text.into()))
                    .await
                    .map_err(|e| Error::WebSocketConnect(e.to_string()))?;
            }
            frame = read.next() => {
                match frame {
                    Some(Ok(tungstenite::Message::Text(text))) => {
                        if link.event_tx.send(TransportEvent::Frame(text.as_str().to_owned())).is_err() {
                            // Consumer is gone; nothing left to deliver to.
                            return Ok(());
                        }
                    }
                    Some(Ok(tungstenite::Message::Ping(_))) => {
                        // tungstenite handles pong replies automatically
                        tracing::trace!("WebSocket ping");
                    }
                    Some(Ok(tungstenite::Message::Close(frame))) => {
                        if let Some(ref cf) = frame {
                            tracing::info!(
                                code = %cf.code,
                                reason = %cf.reason,
                                "WebSocket close frame received"
                            );
                            let code = u16::from(cf.code);
                            if code != 1000 {
                                return Err(Error::WebSocketClosed {
                                    code,
                                    reason: cf.reason.as_str().to_owned(),
                                });
                            }
                        } else {
                            tracing::info!("WebSocket close frame received (no payload)");
                        }
                        return Ok(());
                    }
                    Some(Err(e)) => {
                        return Err(Error::WebSocketConnect(e.to_string()));
                    }
                    None => {
                        // Stream ended without a close frame
                        tracing::info!("WebSocket stream ended");
                        return Ok(());
                    }
                    _ => {
                        // Binary, Pong, Frame -- ignore
                    }
                }
            }
        }
    }
}

// ── Backoff calculation ──────────────────────────────────────────────

/// Exponential backoff with jitter.
///
/// `delay = min(initial * 2^attempt, max) + jitter`
///
/// Jitter is +-25% to spread out reconnection storms from many dashboards.
fn calculate_backoff(attempt: u32, config: &ReconnectConfig) -> Duration {
    let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
    let base = config.initial_delay.as_secs_f64() * 2.0_f64.powi(exponent);
    let capped = base.min(config.max_delay.as_secs_f64());

    // Deterministic "jitter" seeded from the attempt number.
    let jitter_factor = 1.0 + 0.25 * (f64::from(attempt) * 7.3).sin();
    let with_jitter = (capped * jitter_factor).max(0.0);

    Duration::from_secs_f64(with_jitter)
}

// ── Tests ────────────────────────────────────────────────────────────
