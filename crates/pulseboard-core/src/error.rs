// ── Core error types ──
//
// User-facing errors from pulseboard-core. The `From<pulseboard_api::Error>`
// impl translates transport-layer failures into domain-level variants.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Session rejected by server: {message}")]
    Unauthorized { message: String },

    #[error("Request timed out")]
    Timeout,

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("API error: {message}")]
    Api {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<pulseboard_api::Error> for CoreError {
    fn from(err: pulseboard_api::Error) -> Self {
        use pulseboard_api::Error as ApiError;

        match err {
            ApiError::Transport(ref e) if e.is_timeout() => CoreError::Timeout,
            ApiError::Transport(ref e) if e.is_connect() => CoreError::ConnectionFailed {
                url: e
                    .url()
                    .map_or_else(|| "<unknown>".into(), ToString::to_string),
                reason: e.to_string(),
            },
            ApiError::Transport(e) => CoreError::Api {
                message: e.to_string(),
                status: e.status().map(|s| s.as_u16()),
            },
            ApiError::Http { status, body } if matches!(status, 401 | 403) => {
                CoreError::Unauthorized {
                    message: format!("HTTP {status}: {body}"),
                }
            }
            ApiError::Http { status, body } => CoreError::Api {
                message: body,
                status: Some(status),
            },
            ApiError::InvalidUrl(e) => CoreError::Config {
                message: format!("invalid URL: {e}"),
            },
            err @ (ApiError::UnsupportedScheme { .. }
            | ApiError::InvalidHeader(_)
            | ApiError::Tls(_)) => CoreError::Config {
                message: err.to_string(),
            },
            ApiError::WebSocketConnect(reason) => CoreError::ConnectionFailed {
                url: "websocket".into(),
                reason,
            },
            err @ (ApiError::WebSocketClosed { .. } | ApiError::NotConnected) => {
                CoreError::ConnectionFailed {
                    url: "websocket".into(),
                    reason: err.to_string(),
                }
            }
            ApiError::Deserialization { message, .. } => CoreError::Api {
                message: format!("unexpected response: {message}"),
                status: None,
            },
        }
    }
}
