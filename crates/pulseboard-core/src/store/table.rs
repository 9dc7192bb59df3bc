// ── Displayed record page ──

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::watch;

use crate::model::{Marking, Record, RecordId};
use crate::stream::ViewStream;
use crate::view::TableView;

/// One row on screen.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayedRow {
    pub record: Record,
    pub highlight: Option<Marking>,
}

/// What renderers see.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableSnapshot {
    pub rows: Vec<DisplayedRow>,
    /// A page reload has been requested or is in flight.
    pub refreshing: bool,
    pub loaded_at: Option<DateTime<Utc>>,
    /// Last page load failure, cleared by the next successful load.
    pub load_error: Option<String>,
}

/// The current page of records, in server order (newest first).
pub struct RecordTable {
    rows: Vec<DisplayedRow>,
    page_size: usize,
    refresh_requested: bool,
    refreshing: bool,
    loaded_at: Option<DateTime<Utc>>,
    load_error: Option<String>,
    snapshot: watch::Sender<Arc<TableSnapshot>>,
}

impl RecordTable {
    pub fn new(page_size: usize) -> Self {
        let (snapshot, _) = watch::channel(Arc::new(TableSnapshot::default()));
        Self {
            rows: Vec::new(),
            page_size,
            refresh_requested: false,
            refreshing: false,
            loaded_at: None,
            load_error: None,
            snapshot,
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn subscribe(&self) -> ViewStream<TableSnapshot> {
        ViewStream::new(self.snapshot.subscribe())
    }

    /// Consume a pending refresh request.
    ///
    /// Returns `true` once per request; the caller is expected to start a
    /// page load and report back through [`load_page`](Self::load_page) or
    /// [`load_failed`](Self::load_failed).
    pub fn take_refresh_request(&mut self) -> bool {
        if !self.refresh_requested {
            return false;
        }
        self.refresh_requested = false;
        self.refreshing = true;
        self.publish();
        true
    }

    /// Replace the whole page. Any highlights are dropped with the old rows.
    pub fn load_page(&mut self, records: Vec<Record>, loaded_at: DateTime<Utc>) {
        self.rows = records
            .into_iter()
            .take(self.page_size)
            .map(|record| DisplayedRow {
                record,
                highlight: None,
            })
            .collect();
        self.refreshing = false;
        self.loaded_at = Some(loaded_at);
        self.load_error = None;
        self.publish();
    }

    /// Record a failed page load. The current rows stay on screen.
    pub fn load_failed(&mut self, message: String) {
        self.refreshing = false;
        self.load_error = Some(message);
        self.publish();
    }

    fn publish(&self) {
        let snapshot = TableSnapshot {
            rows: self.rows.clone(),
            refreshing: self.refreshing || self.refresh_requested,
            loaded_at: self.loaded_at,
            load_error: self.load_error.clone(),
        };
        self.snapshot.send_replace(Arc::new(snapshot));
    }
}

impl TableView for RecordTable {
    fn row_count(&self) -> usize {
        self.rows.len()
    }

    fn row(&self, index: usize) -> Option<&Record> {
        self.rows.get(index).map(|row| &row.record)
    }

    fn replace_row(&mut self, index: usize, record: Record) {
        if let Some(row) = self.rows.get_mut(index) {
            row.record = record;
            self.publish();
        }
    }

    fn set_highlight(&mut self, index: usize, marking: Marking) {
        if let Some(row) = self.rows.get_mut(index) {
            row.highlight = Some(marking);
            self.publish();
        }
    }

    fn clear_highlight(&mut self, record_id: &RecordId) -> bool {
        let found = self
            .rows
            .iter_mut()
            .find(|row| row.record.id().as_ref() == Some(record_id));
        let Some(row) = found else {
            return false;
        };
        if row.highlight.take().is_some() {
            self.publish();
        }
        true
    }

    fn request_refresh(&mut self) {
        if !self.refresh_requested {
            self.refresh_requested = true;
            self.publish();
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn rec(id: i64, value: &str) -> Record {
        Record::try_from(json!({ "id": id, "value": value })).unwrap()
    }

    #[test]
    fn load_page_truncates_to_page_size() {
        let mut table = RecordTable::new(2);
        table.load_page(vec![rec(3, "c"), rec(2, "b"), rec(1, "a")], Utc::now());
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.row(0).unwrap().cell("value"), "c");
    }

    #[test]
    fn refresh_request_is_taken_once() {
        let mut table = RecordTable::new(10);
        assert!(!table.take_refresh_request());
        table.request_refresh();
        table.request_refresh();
        assert!(table.subscribe().latest().refreshing);
        assert!(table.take_refresh_request());
        assert!(!table.take_refresh_request());
        table.load_page(Vec::new(), Utc::now());
        assert!(!table.subscribe().latest().refreshing);
    }

    #[test]
    fn highlight_set_and_cleared_by_id() {
        let mut table = RecordTable::new(10);
        table.load_page(vec![rec(2, "b"), rec(1, "a")], Utc::now());
        table.set_highlight(1, Marking::Success);

        let snap = table.subscribe().latest();
        assert_eq!(snap.rows[1].highlight, Some(Marking::Success));
        assert_eq!(snap.rows[0].highlight, None);

        assert!(table.clear_highlight(&RecordId::Int(1)));
        assert_eq!(table.subscribe().latest().rows[1].highlight, None);
        assert!(!table.clear_highlight(&RecordId::Int(99)));
    }

    #[test]
    fn reload_drops_highlights() {
        let mut table = RecordTable::new(10);
        table.load_page(vec![rec(1, "a")], Utc::now());
        table.set_highlight(0, Marking::Success);
        table.load_page(vec![rec(1, "a")], Utc::now());
        assert_eq!(table.subscribe().latest().rows[0].highlight, None);
    }

    #[test]
    fn out_of_range_mutations_are_ignored() {
        let mut table = RecordTable::new(10);
        table.replace_row(4, rec(4, "d"));
        table.set_highlight(4, Marking::Success);
        assert_eq!(table.row_count(), 0);
    }

    #[test]
    fn load_failure_keeps_rows() {
        let mut table = RecordTable::new(10);
        table.load_page(vec![rec(1, "a")], Utc::now());
        table.load_failed("HTTP 500".into());
        let snap = table.subscribe().latest();
        assert_eq!(snap.rows.len(), 1);
        assert_eq!(snap.load_error.as_deref(), Some("HTTP 500"));
    }
}
