// ── Change event domain types ──

use serde::{Deserialize, Serialize};

use super::record::{Record, RecordId};

/// Wire `type` of an update to an existing record.
pub const UPDATE_TYPE: &str = "data.update";

/// Wire `type` of a newly created record.
pub const CREATE_TYPE: &str = "data.new";

/// What changed. Decoded once at the boundary; nothing downstream sees raw JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Change {
    /// An existing record changed; `payload` is its full new snapshot.
    Updated { record_id: RecordId, payload: Record },
    /// A record was created; it cannot already be on screen.
    Created { payload: Record },
    /// A type this client does not handle (empty when `type` was absent),
    /// or an update without a usable id.
    Unrecognized { raw_type: String },
}

/// The unit of work flowing from server to client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// Server-side production time, unix seconds (fractional). `None` when
    /// the frame carried no numeric `time`.
    pub emitted_at_secs: Option<f64>,
    pub change: Change,
}

impl ChangeEvent {
    /// Short label for logging.
    pub fn kind(&self) -> &str {
        match &self.change {
            Change::Updated { .. } => "updated",
            Change::Created { .. } => "created",
            Change::Unrecognized { .. } => "unrecognized",
        }
    }
}
