// ── Domain model ──
//
// Canonical types shared by the decoder, the reconciliation engine and the
// views. Raw wire JSON stops at `decode`; everything here is typed.

mod event;
mod feed;
mod record;

pub use event::{CREATE_TYPE, Change, ChangeEvent, UPDATE_TYPE};
pub use feed::{FeedEntry, Marking};
pub use record::{Record, RecordId};
