// ── Activity feed ──

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::watch;

use crate::model::{FeedEntry, Marking, Record};
use crate::stream::ViewStream;
use crate::view::FeedView;

/// Default number of entries kept before the oldest are evicted.
pub const DEFAULT_FEED_CAPACITY: usize = 500;

/// Entries in arrival order, oldest first.
pub type FeedSnapshot = Vec<Arc<FeedEntry>>;

/// Bounded, append-only log of change activity.
///
/// Entries are never edited after insertion. Once `capacity` is reached
/// the oldest entry is evicted for each new one.
pub struct ActivityFeed {
    entries: VecDeque<Arc<FeedEntry>>,
    capacity: usize,
    next_seq: u64,
    snapshot: watch::Sender<Arc<FeedSnapshot>>,
}

impl ActivityFeed {
    pub fn new(capacity: usize) -> Self {
        let (snapshot, _) = watch::channel(Arc::new(Vec::new()));
        Self {
            entries: VecDeque::with_capacity(capacity.min(DEFAULT_FEED_CAPACITY)),
            capacity: capacity.max(1),
            next_seq: 1,
            snapshot,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn subscribe(&self) -> ViewStream<FeedSnapshot> {
        ViewStream::new(self.snapshot.subscribe())
    }
}

impl FeedView for ActivityFeed {
    fn append(&mut self, payload: Record, marking: Marking, received_at: DateTime<Utc>) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;

        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries
            .push_back(Arc::new(FeedEntry::new(seq, marking, payload, received_at)));

        let snap: FeedSnapshot = self.entries.iter().cloned().collect();
        self.snapshot.send_replace(Arc::new(snap));
        seq
    }
}
