// ── Push-feed wire format ──
//
// Inbound frames are a two-layer envelope: an outer object carrying either
// an `error` string or a `content` string, where `content` is itself a
// JSON-encoded object `{ id, time, type, ...fields }`. Outbound frames are
// `{ "command": "subscribe" | "unsubscribe" }`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Longest frame excerpt kept on a [`DecodeError::Protocol`].
const FRAME_PREVIEW_CHARS: usize = 200;

/// Why an inbound frame did not produce a [`Notification`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    /// The server reported an error in the envelope. Surfaced to the user.
    #[error("server error: {0}")]
    Server(String),

    /// The frame is malformed at either envelope layer. Dropped and logged.
    #[error("protocol error: {reason}")]
    Protocol { reason: String, frame: String },
}

impl DecodeError {
    fn protocol(reason: impl Into<String>, frame: &str) -> Self {
        Self::Protocol {
            reason: reason.into(),
            frame: frame.chars().take(FRAME_PREVIEW_CHARS).collect(),
        }
    }
}

/// One change notification, decoded from both envelope layers.
///
/// `fields` holds the record snapshot: every inner key except `time` and
/// `type`, so it still carries `id`.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    /// Raw `type`, e.g. `"data.update"`. Non-string values are kept as
    /// their JSON text; `None` when the key is absent.
    pub kind: Option<String>,
    /// Server timestamp in unix seconds (fractional), if numeric.
    pub time: Option<f64>,
    /// Raw `id` value, if any.
    pub id: Option<Value>,
    pub fields: Map<String, Value>,
}

/// Parse one inbound text frame.
///
/// Only invalid JSON (or a non-object) at either layer is a protocol error;
/// a well-formed object with odd `time` or `type` values still decodes.
/// An `error` string takes precedence over `content`. Empty strings count
/// as absent on both keys. Unknown outer keys are ignored.
pub fn parse_frame(text: &str) -> Result<Notification, DecodeError> {
    let value: Value = serde_json::from_str(text)
        .map_err(|e| DecodeError::protocol(format!("invalid envelope: {e}"), text))?;

    let Value::Object(envelope) = value else {
        return Err(DecodeError::protocol("envelope is not an object", text));
    };

    if let Some(message) = non_empty_str(&envelope, "error") {
        return Err(DecodeError::Server(message.to_owned()));
    }

    let Some(content) = non_empty_str(&envelope, "content") else {
        return Err(DecodeError::protocol("envelope has neither error nor content", text));
    };

    parse_content(content)
}

fn non_empty_str<'a>(object: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    object
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

fn parse_content(content: &str) -> Result<Notification, DecodeError> {
    let value: Value = serde_json::from_str(content)
        .map_err(|e| DecodeError::protocol(format!("invalid content: {e}"), content))?;

    let Value::Object(mut fields) = value else {
        return Err(DecodeError::protocol("content is not an object", content));
    };

    let time = fields.remove("time").as_ref().and_then(Value::as_f64);

    let kind = match fields.remove("type") {
        None => None,
        Some(Value::String(kind)) => Some(kind),
        Some(other) => Some(other.to_string()),
    };

    let id = fields.get("id").cloned();

    Ok(Notification {
        kind,
        time,
        id,
        fields,
    })
}

// ── Outbound ─────────────────────────────────────────────────────────

/// A command frame sent to the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "lowercase")]
pub enum Command {
    Subscribe,
    Unsubscribe,
}

impl Command {
    /// Serialize into the text frame the server expects.
    pub fn to_frame(self) -> String {
        match self {
            Self::Subscribe => r#"{"command":"subscribe"}"#.to_owned(),
            Self::Unsubscribe => r#"{"command":"unsubscribe"}"#.to_owned(),
        }
    }
}
