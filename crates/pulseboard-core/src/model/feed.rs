// ── Activity feed entries and visual markings ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};

use super::record::Record;

/// Visual marking applied to a row or feed entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Marking {
    /// An existing record changed.
    Success,
    /// A new record appeared.
    Warning,
}

/// One entry in the "new activity" feed. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedEntry {
    seq: u64,
    marking: Marking,
    payload: Record,
    received_at: DateTime<Utc>,
}

impl FeedEntry {
    pub(crate) fn new(seq: u64, marking: Marking, payload: Record, received_at: DateTime<Utc>) -> Self {
        Self {
            seq,
            marking,
            payload,
            received_at,
        }
    }

    /// Monotonic position in the feed, starting at 1.
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn marking(&self) -> Marking {
        self.marking
    }

    pub fn payload(&self) -> &Record {
        &self.payload
    }

    pub fn received_at(&self) -> DateTime<Utc> {
        self.received_at
    }
}
