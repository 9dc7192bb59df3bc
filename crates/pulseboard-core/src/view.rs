// ── View seams ──
//
// The reconciliation engine mutates the screen only through these traits.
// `store::RecordTable` and `store::ActivityFeed` are the production
// implementations; tests substitute plain in-memory fakes.

use chrono::{DateTime, Utc};

use crate::model::{Marking, Record, RecordId};

/// The currently displayed page of records, in display order.
pub trait TableView {
    fn row_count(&self) -> usize;

    fn row(&self, index: usize) -> Option<&Record>;

    /// Replace the row's data in place. Position is unchanged.
    fn replace_row(&mut self, index: usize, record: Record);

    fn set_highlight(&mut self, index: usize, marking: Marking);

    /// Clear the highlight on the first row carrying `record_id`.
    ///
    /// Returns `false` when no such row is displayed any more.
    fn clear_highlight(&mut self, record_id: &RecordId) -> bool;

    /// Ask for the current page to be reloaded from the server.
    fn request_refresh(&mut self);
}

/// Append-only log of recent activity.
pub trait FeedView {
    /// Append one entry and return its sequence number.
    fn append(&mut self, payload: Record, marking: Marking, received_at: DateTime<Utc>) -> u64;
}
