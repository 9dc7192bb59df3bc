// ── Transient row highlights ──
//
// Each highlighted row gets its own expiry timer keyed by record id.
// Re-highlighting a record cancels its previous timer, so a burst of updates
// keeps the row lit until `ttl` after the last one. Expiries are delivered
// over a channel to the session loop, which owns the table.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::model::RecordId;

/// How long an updated row stays highlighted by default.
pub const DEFAULT_HIGHLIGHT_TTL: Duration = Duration::from_secs(5);

/// A highlight timer fired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightExpired {
    pub record_id: RecordId,
    pub generation: u64,
}

struct Pending {
    generation: u64,
    cancel: CancellationToken,
}

pub struct HighlightScheduler {
    ttl: Duration,
    pending: HashMap<RecordId, Pending>,
    next_generation: u64,
    expired_tx: mpsc::UnboundedSender<HighlightExpired>,
}

impl HighlightScheduler {
    pub fn new(ttl: Duration) -> (Self, mpsc::UnboundedReceiver<HighlightExpired>) {
        let (expired_tx, expired_rx) = mpsc::unbounded_channel();
        (
            Self {
                ttl,
                pending: HashMap::new(),
                next_generation: 0,
                expired_tx,
            },
            expired_rx,
        )
    }

    /// Number of highlights waiting to expire.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Start (or restart) the expiry timer for `record_id`.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn schedule(&mut self, record_id: RecordId) {
        self.next_generation += 1;
        let generation = self.next_generation;
        let cancel = CancellationToken::new();

        if let Some(previous) = self.pending.insert(
            record_id.clone(),
            Pending {
                generation,
                cancel: cancel.clone(),
            },
        ) {
            previous.cancel.cancel();
        }

        let ttl = self.ttl;
        let tx = self.expired_tx.clone();
        tokio::spawn(async move {
            tokio::select! {
                () = cancel.cancelled() => {}
                () = tokio::time::sleep(ttl) => {
                    // Receiver gone means the session ended; nothing to clear.
                    let _ = tx.send(HighlightExpired { record_id, generation });
                }
            }
        });
    }

    /// Settle a fired timer.
    ///
    /// Returns `true` when `expired` is the current timer for its record and
    /// the highlight should be cleared, `false` for a superseded one.
    pub fn settle(&mut self, expired: &HighlightExpired) -> bool {
        match self.pending.get(&expired.record_id) {
            Some(p) if p.generation == expired.generation => {
                self.pending.remove(&expired.record_id);
                true
            }
            _ => {
                trace!(record_id = %expired.record_id, "stale highlight expiry");
                false
            }
        }
    }
}

impl Drop for HighlightScheduler {
    fn drop(&mut self) {
        for (_, p) in self.pending.drain() {
            p.cancel.cancel();
        }
    }
}
