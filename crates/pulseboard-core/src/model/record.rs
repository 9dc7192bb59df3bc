// ── Record identity and snapshots ──
//
// Records are opaque key/value snapshots rendered verbatim. The only field
// the client interprets is `id`, which correlates pushed changes with rows
// already on screen.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ── RecordId ────────────────────────────────────────────────────────

/// Identifier correlating a change event with a displayed row.
///
/// Numbers and strings never compare equal to each other: `5` and `"5"`
/// are distinct identifiers. Numeric ids are canonicalised so `5` and `5.0`
/// are the same identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Int(i64),
    /// Integers above `i64::MAX`.
    UInt(u64),
    Text(String),
}

impl RecordId {
    /// Interpret a raw JSON value as an identifier.
    ///
    /// Integers, floats without a fractional part and strings qualify;
    /// other floats, booleans, arrays, objects and `null` do not.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n
                .as_i64()
                .map(Self::Int)
                .or_else(|| n.as_u64().map(Self::UInt))
                .or_else(|| n.as_f64().and_then(whole_float)),
            Value::String(s) => Some(Self::Text(s.clone())),
            _ => None,
        }
    }
}

/// `5.0` → `Int(5)`. Only values exactly representable as `i64`.
#[allow(clippy::float_cmp, clippy::as_conversions, clippy::cast_possible_truncation)]
fn whole_float(f: f64) -> Option<RecordId> {
    // 2^63; `i64::MAX` itself is not representable as f64.
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    (f.is_finite() && f.fract() == 0.0 && (-LIMIT..LIMIT).contains(&f))
        .then_some(RecordId::Int(f as i64))
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{n}"),
            Self::UInt(n) => write!(f, "{n}"),
            Self::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<i64> for RecordId {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

// ── Record ──────────────────────────────────────────────────────────

/// A full record snapshot, e.g. `{ "id": 5, "instrument": "BNP", ... }`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// The record's identifier, if it carries a usable one.
    pub fn id(&self) -> Option<RecordId> {
        self.0.get("id").and_then(RecordId::from_value)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Render one field as table cell text.
    ///
    /// Strings are shown without quotes, `null` and missing fields as empty.
    pub fn cell(&self, key: &str) -> String {
        match self.0.get(key) {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        }
    }
}

impl From<Map<String, Value>> for Record {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

impl TryFrom<Value> for Record {
    type Error = Value;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(fields) => Ok(Self(fields)),
            other => Err(other),
        }
    }
}
