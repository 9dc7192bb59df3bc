// ── View state stores ──
//
// In-memory state behind the dashboard. Each store owns its data and
// republishes an immutable snapshot on every mutation, so renderers never
// hold a lock.

mod feed;
mod table;

pub use feed::{ActivityFeed, DEFAULT_FEED_CAPACITY, FeedSnapshot};
pub use table::{DisplayedRow, RecordTable, TableSnapshot};
