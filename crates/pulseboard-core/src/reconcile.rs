// ── Reconciliation engine ──
//
// Applies one decoded change event to the table and the activity feed.
// Latency is published before anything else, for every event type that
// carries a timestamp.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::diagnostics::{DiagnosticsSink, latency_ms};
use crate::highlight::HighlightScheduler;
use crate::model::{Change, ChangeEvent, Marking, Record, RecordId};
use crate::view::{FeedView, TableView};

/// What [`ReconciliationEngine::apply`] did with an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Update processed. `row` is the replaced row, if one was displayed.
    Updated { row: Option<usize>, feed_seq: u64 },
    /// Create processed. A page refresh has been requested.
    Created { feed_seq: u64 },
    /// Type not handled. Only logged.
    Ignored { raw_type: String },
}

pub struct ReconciliationEngine {
    diagnostics: DiagnosticsSink,
    highlights: HighlightScheduler,
}

impl ReconciliationEngine {
    pub fn new(diagnostics: DiagnosticsSink, highlights: HighlightScheduler) -> Self {
        Self {
            diagnostics,
            highlights,
        }
    }

    pub fn highlights_mut(&mut self) -> &mut HighlightScheduler {
        &mut self.highlights
    }

    /// Apply one event.
    ///
    /// Updates replace the first row whose id matches, highlight it and log
    /// to the feed; an update for a record not on screen is logged only.
    /// Creates never touch rows directly: they request a refresh so the
    /// server decides placement.
    pub fn apply<T, F>(
        &mut self,
        table: &mut T,
        feed: &mut F,
        event: ChangeEvent,
        observed_at: DateTime<Utc>,
    ) -> Outcome
    where
        T: TableView + ?Sized,
        F: FeedView + ?Sized,
    {
        match event.emitted_at_secs {
            Some(emitted) => self
                .diagnostics
                .record_latency(latency_ms(observed_at, emitted)),
            None => debug!(kind = event.kind(), "event has no timestamp, latency skipped"),
        }

        match event.change {
            Change::Updated { record_id, payload } => {
                let row = find_row(table, &record_id);
                if let Some(index) = row {
                    table.replace_row(index, payload.clone());
                    table.set_highlight(index, Marking::Success);
                    self.highlights.schedule(record_id);
                } else {
                    debug!(record_id = %record_id, "updated record not on screen");
                }
                let feed_seq = feed.append(payload, Marking::Success, observed_at);
                Outcome::Updated { row, feed_seq }
            }
            Change::Created { payload } => {
                table.request_refresh();
                let feed_seq = feed.append(payload, Marking::Warning, observed_at);
                Outcome::Created { feed_seq }
            }
            Change::Unrecognized { raw_type } => {
                self.diagnostics.unrecognized(&raw_type);
                Outcome::Ignored { raw_type }
            }
        }
    }
}

/// Index of the first displayed row carrying `record_id`.
fn find_row<T: TableView + ?Sized>(table: &T, record_id: &RecordId) -> Option<usize> {
    (0..table.row_count())
        .find(|&i| table.row(i).and_then(Record::id).as_ref() == Some(record_id))
}
