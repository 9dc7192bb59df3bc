// ── Diagnostics sink ──
//
// Latency readout, connection status and protocol-level logging. Only the
// most recent latency is kept; there is no history.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::{debug, info, trace, warn};

/// Connection status as seen by the diagnostics readout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connecting,
    Connected,
    Disconnected { reason: String },
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connecting => f.write_str("connecting"),
            Self::Connected => f.write_str("connected"),
            Self::Disconnected { reason } => write!(f, "disconnected: {reason}"),
        }
    }
}

/// Milliseconds between server emission and local observation.
///
/// May be negative when the clocks are skewed; the value is reported as is.
#[allow(clippy::cast_precision_loss, clippy::as_conversions)]
pub fn latency_ms(observed_at: DateTime<Utc>, emitted_at_secs: f64) -> f64 {
    let observed_ms = observed_at.timestamp_micros() as f64 / 1_000.0;
    observed_ms - emitted_at_secs * 1_000.0
}

/// Render a latency for display, two decimal places.
pub fn format_latency(ms: f64) -> String {
    format!("{ms:.2} ms")
}

/// Cloneable handle publishing diagnostic readouts.
#[derive(Clone)]
pub struct DiagnosticsSink {
    latency: Arc<watch::Sender<Option<f64>>>,
    status: Arc<watch::Sender<ConnectionStatus>>,
}

impl Default for DiagnosticsSink {
    fn default() -> Self {
        Self::new()
    }
}

impl DiagnosticsSink {
    pub fn new() -> Self {
        let (latency, _) = watch::channel(None);
        let (status, _) = watch::channel(ConnectionStatus::Connecting);
        Self {
            latency: Arc::new(latency),
            status: Arc::new(status),
        }
    }

    /// Publish the latency of the most recent event.
    pub fn record_latency(&self, ms: f64) {
        debug!(latency_ms = ms, "event latency");
        self.latency.send_replace(Some(ms));
    }

    pub fn latest_latency(&self) -> Option<f64> {
        *self.latency.borrow()
    }

    pub fn watch_latency(&self) -> watch::Receiver<Option<f64>> {
        self.latency.subscribe()
    }

    pub fn connection_opened(&self) {
        info!("push feed connected");
        self.status.send_replace(ConnectionStatus::Connected);
    }

    pub fn connection_closed(&self, reason: &str) {
        warn!(reason, "push feed disconnected");
        self.status.send_replace(ConnectionStatus::Disconnected {
            reason: reason.to_owned(),
        });
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status.borrow().clone()
    }

    pub fn watch_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.status.subscribe()
    }

    /// A frame could not be decoded. Dropped after logging.
    pub fn protocol_error(&self, reason: &str, frame: &str) {
        warn!(reason, frame, "cannot handle message");
    }

    /// A decoded event had a type this client does not handle.
    pub fn unrecognized(&self, raw_type: &str) {
        debug!(raw_type, "change type not recognised");
    }

    /// Raw inbound frame, for the developer log.
    pub fn frame_received(&self, frame: &str) {
        trace!(frame, "frame received");
    }
}
