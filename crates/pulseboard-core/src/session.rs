// ── Dashboard session ──
//
// Owns all view state and runs the single event loop that mutates it.
// Transport events, user commands, highlight expiries and page loads are
// serialized through one `select!`, so no two mutations ever interleave.

use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use pulseboard_api::wire::DecodeError;
use pulseboard_api::{RecordsClient, TransportEvent, WebSocketHandle, endpoint};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::SessionConfig;
use crate::decode::decode;
use crate::diagnostics::DiagnosticsSink;
use crate::error::CoreError;
use crate::highlight::{HighlightExpired, HighlightScheduler};
use crate::model::Record;
use crate::reconcile::ReconciliationEngine;
use crate::store::{ActivityFeed, FeedSnapshot, RecordTable, TableSnapshot};
use crate::stream::ViewStream;
use crate::subscription::{CommandSink, SubscriptionController, SubscriptionState};
use crate::view::TableView;

// ── Seams ────────────────────────────────────────────────────────────

/// Where the primary table's rows come from.
pub trait RecordSource: Send + Sync + 'static {
    fn fetch_page(&self, limit: usize)
    -> impl Future<Output = Result<Vec<Record>, CoreError>> + Send;
}

impl RecordSource for RecordsClient {
    fn fetch_page(&self, limit: usize) -> impl Future<Output = Result<Vec<Record>, CoreError>> + Send {
        async move {
            let rows = RecordsClient::fetch_page(self, limit).await?;
            Ok(rows.into_iter().map(Record::new).collect())
        }
    }
}

impl<K: CommandSink + ?Sized> CommandSink for Arc<K> {
    fn send_command(&self, command: pulseboard_api::Command) -> Result<(), pulseboard_api::Error> {
        (**self).send_command(command)
    }
}

// ── Commands and alerts ──────────────────────────────────────────────

/// User intents delivered to the session loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCommand {
    ToggleRealtime,
    Refresh,
}

/// A server-reported error, surfaced to the user as a blocking notice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub message: String,
    pub raised_at: DateTime<Utc>,
}

// ── SessionHandle ────────────────────────────────────────────────────

/// Cloneable sender for [`SessionCommand`]s.
#[derive(Debug, Clone)]
pub struct SessionCommands(mpsc::UnboundedSender<SessionCommand>);

impl SessionCommands {
    pub fn toggle_realtime(&self) {
        self.send(SessionCommand::ToggleRealtime);
    }

    pub fn refresh(&self) {
        self.send(SessionCommand::Refresh);
    }

    fn send(&self, command: SessionCommand) {
        if self.0.send(command).is_err() {
            debug!(?command, "session already stopped");
        }
    }
}

/// UI-side handle: observes view state and sends commands.
pub struct SessionHandle {
    commands: SessionCommands,
    alerts: mpsc::UnboundedReceiver<Alert>,
    table: ViewStream<TableSnapshot>,
    feed: ViewStream<FeedSnapshot>,
    subscription: watch::Receiver<SubscriptionState>,
    diagnostics: DiagnosticsSink,
}

impl SessionHandle {
    pub fn toggle_realtime(&self) {
        self.commands.toggle_realtime();
    }

    pub fn refresh(&self) {
        self.commands.refresh();
    }

    pub fn commands(&self) -> SessionCommands {
        self.commands.clone()
    }

    pub fn table(&self) -> ViewStream<TableSnapshot> {
        self.table.clone()
    }

    pub fn feed(&self) -> ViewStream<FeedSnapshot> {
        self.feed.clone()
    }

    pub fn subscription(&self) -> watch::Receiver<SubscriptionState> {
        self.subscription.clone()
    }

    pub fn diagnostics(&self) -> &DiagnosticsSink {
        &self.diagnostics
    }

    /// Wait for the next server alert. `None` once the session has stopped.
    pub async fn next_alert(&mut self) -> Option<Alert> {
        self.alerts.recv().await
    }
}

// ── Session ──────────────────────────────────────────────────────────

/// State the loop mutates. Split from the receivers so handlers can take
/// `&mut self` while the loop polls its channels.
struct Dashboard<K, S> {
    table: RecordTable,
    feed: ActivityFeed,
    engine: ReconciliationEngine,
    subscription: SubscriptionController,
    diagnostics: DiagnosticsSink,
    sink: K,
    source: Arc<S>,
    alert_tx: mpsc::UnboundedSender<Alert>,
    page_tx: mpsc::UnboundedSender<Result<Vec<Record>, CoreError>>,
    load_in_flight: bool,
}

pub struct Session<K, S> {
    dashboard: Dashboard<K, S>,
    transport_rx: mpsc::UnboundedReceiver<TransportEvent>,
    command_rx: mpsc::UnboundedReceiver<SessionCommand>,
    expired_rx: mpsc::UnboundedReceiver<HighlightExpired>,
    page_rx: mpsc::UnboundedReceiver<Result<Vec<Record>, CoreError>>,
}

impl Session<WebSocketHandle, RecordsClient> {
    /// Open the push feed and build the listing client for `config`.
    ///
    /// Returns immediately; the first connection attempt happens in the
    /// background. Must be called from within a Tokio runtime.
    pub fn connect(
        config: &SessionConfig,
        cancel: &CancellationToken,
    ) -> Result<(Self, SessionHandle), CoreError> {
        let transport = config.transport();
        let records_url = endpoint::records_url(&config.origin, &config.records_path)?;
        let stream_url = endpoint::stream_url(&config.origin, &config.stream_path)?;
        let records = RecordsClient::new(records_url, &transport)?;

        info!(stream = %stream_url, records = %records.url(), "connecting");
        let (ws, events) = WebSocketHandle::connect(
            stream_url,
            config.reconnect.clone(),
            cancel.clone(),
            config.session_cookie.clone(),
        );

        Ok(Self::new(config, ws, records, events))
    }
}

impl<K, S> Session<K, S>
where
    K: CommandSink,
    S: RecordSource,
{
    pub fn new(
        config: &SessionConfig,
        sink: K,
        source: S,
        transport_rx: mpsc::UnboundedReceiver<TransportEvent>,
    ) -> (Self, SessionHandle) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (alert_tx, alert_rx) = mpsc::unbounded_channel();
        let (page_tx, page_rx) = mpsc::unbounded_channel();
        let (scheduler, expired_rx) = HighlightScheduler::new(config.highlight_ttl);

        let diagnostics = DiagnosticsSink::new();
        let table = RecordTable::new(config.page_size);
        let feed = ActivityFeed::new(config.feed_capacity);
        let subscription = SubscriptionController::new(config.resubscribe_on_reconnect);

        let handle = SessionHandle {
            commands: SessionCommands(command_tx),
            alerts: alert_rx,
            table: table.subscribe(),
            feed: feed.subscribe(),
            subscription: subscription.watch(),
            diagnostics: diagnostics.clone(),
        };

        let dashboard = Dashboard {
            table,
            feed,
            engine: ReconciliationEngine::new(diagnostics.clone(), scheduler),
            subscription,
            diagnostics,
            sink,
            source: Arc::new(source),
            alert_tx,
            page_tx,
            load_in_flight: false,
        };

        let session = Self {
            dashboard,
            transport_rx,
            command_rx,
            expired_rx,
            page_rx,
        };
        (session, handle)
    }

    /// Run until `cancel` fires or every [`SessionHandle`] is dropped.
    ///
    /// The first page is requested immediately. A closed transport stops
    /// event processing but pending highlight expiries still settle.
    pub async fn run(self, cancel: CancellationToken) {
        let Self {
            mut dashboard,
            mut transport_rx,
            mut command_rx,
            mut expired_rx,
            mut page_rx,
        } = self;

        info!("session started");
        dashboard.table.request_refresh();
        let mut transport_open = true;

        loop {
            dashboard.start_pending_load();

            tokio::select! {
                biased;

                () = cancel.cancelled() => break,

                command = command_rx.recv() => match command {
                    Some(command) => dashboard.handle_command(command),
                    None => break,
                },

                Some(expired) = expired_rx.recv() => dashboard.handle_expiry(&expired),

                Some(result) = page_rx.recv() => dashboard.handle_page(result),

                event = transport_rx.recv(), if transport_open => match event {
                    Some(event) => dashboard.handle_transport(event, Utc::now()),
                    None => {
                        debug!("transport event channel closed");
                        transport_open = false;
                    }
                },
            }
        }

        info!("session stopped");
    }
}

impl<K, S> Dashboard<K, S>
where
    K: CommandSink,
    S: RecordSource,
{
    fn handle_command(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::ToggleRealtime => {
                self.subscription.toggle(&self.sink);
            }
            SessionCommand::Refresh => self.table.request_refresh(),
        }
    }

    fn handle_transport(&mut self, event: TransportEvent, observed_at: DateTime<Utc>) {
        match event {
            TransportEvent::Opened => {
                self.diagnostics.connection_opened();
                self.subscription.on_reconnected(&self.sink);
            }
            TransportEvent::Closed { reason } => self.diagnostics.connection_closed(&reason),
            TransportEvent::Frame(text) => self.handle_frame(&text, observed_at),
        }
    }

    fn handle_frame(&mut self, text: &str, observed_at: DateTime<Utc>) {
        self.diagnostics.frame_received(text);
        match decode(text) {
            Ok(event) => {
                let kind = event.kind().to_owned();
                let outcome = self
                    .engine
                    .apply(&mut self.table, &mut self.feed, event, observed_at);
                debug!(kind = %kind, ?outcome, "event applied");
            }
            Err(DecodeError::Server(message)) => {
                warn!(%message, "server reported an error");
                let alert = Alert {
                    message,
                    raised_at: observed_at,
                };
                if self.alert_tx.send(alert).is_err() {
                    debug!("no alert receiver");
                }
            }
            Err(DecodeError::Protocol { reason, frame }) => {
                self.diagnostics.protocol_error(&reason, &frame);
            }
        }
    }

    fn handle_expiry(&mut self, expired: &HighlightExpired) {
        if self.engine.highlights_mut().settle(expired) {
            self.table.clear_highlight(&expired.record_id);
        }
    }

    /// Start a page load if one was requested and none is running.
    fn start_pending_load(&mut self) {
        if self.load_in_flight || !self.table.take_refresh_request() {
            return;
        }
        self.load_in_flight = true;

        let source = Arc::clone(&self.source);
        let page_tx = self.page_tx.clone();
        let limit = self.table.page_size();
        tokio::spawn(async move {
            let result = source.fetch_page(limit).await;
            // Receiver gone means the session ended.
            let _ = page_tx.send(result);
        });
    }

    fn handle_page(&mut self, result: Result<Vec<Record>, CoreError>) {
        self.load_in_flight = false;
        match result {
            Ok(records) => {
                debug!(rows = records.len(), "page loaded");
                self.table.load_page(records, Utc::now());
            }
            Err(e) => {
                warn!(error = %e, "page load failed");
                self.table.load_failed(e.to_string());
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;
    use crate::model::Marking;
    use crate::subscription::tests::RecordingSink;
    use pulseboard_api::Command;
    use serde_json::{Value, json};
    use url::Url;

    // ── Fakes ───────────────────────────────────────────────────────

    struct FakeSource {
        rows: Vec<Record>,
        calls: Arc<AtomicUsize>,
    }

    impl RecordSource for FakeSource {
        fn fetch_page(
            &self,
            limit: usize,
        ) -> impl Future<Output = Result<Vec<Record>, CoreError>> + Send {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let rows: Vec<Record> = self.rows.iter().take(limit).cloned().collect();
            async move { Ok(rows) }
        }
    }

    struct Harness {
        handle: SessionHandle,
        transport_tx: mpsc::UnboundedSender<TransportEvent>,
        sink: Arc<RecordingSink>,
        calls: Arc<AtomicUsize>,
        cancel: CancellationToken,
    }

    fn rec(value: Value) -> Record {
        Record::try_from(value).unwrap()
    }

    fn content_frame(content: &Value) -> TransportEvent {
        TransportEvent::Frame(json!({ "content": content.to_string() }).to_string())
    }

    fn start() -> Harness {
        let config = SessionConfig::new(Url::parse("http://localhost:8000").unwrap());
        let calls = Arc::new(AtomicUsize::new(0));
        let source = FakeSource {
            rows: vec![
                rec(json!({"id": 3, "instrument": "BNP"})),
                rec(json!({"id": 2, "instrument": "EDF"})),
            ],
            calls: Arc::clone(&calls),
        };
        let sink = Arc::new(RecordingSink::default());
        let (transport_tx, transport_rx) = mpsc::unbounded_channel();

        let (session, handle) = Session::new(&config, Arc::clone(&sink), source, transport_rx);
        let cancel = CancellationToken::new();
        tokio::spawn(session.run(cancel.clone()));

        Harness {
            handle,
            transport_tx,
            sink,
            calls,
            cancel,
        }
    }

    async fn wait_for<T: Send + Sync + 'static>(
        stream: &mut ViewStream<T>,
        pred: impl Fn(&T) -> bool,
    ) -> Arc<T> {
        let mut snap = stream.latest();
        while !pred(&snap) {
            snap = stream.changed().await.unwrap();
        }
        snap
    }

    async fn loaded(h: &Harness) -> ViewStream<TableSnapshot> {
        let mut table = h.handle.table();
        wait_for(&mut table, |s| s.loaded_at.is_some()).await;
        table
    }

    // ── Tests ───────────────────────────────────────────────────────

    #[tokio::test(start_paused = true)]
    async fn loads_first_page_on_start() {
        let h = start();
        let table = loaded(&h).await;
        assert_eq!(table.latest().rows.len(), 2);
        assert_eq!(h.calls.load(Ordering::SeqCst), 1);
        h.cancel.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn update_highlights_row_until_ttl() {
        let h = start();
        let mut table = loaded(&h).await;

        h.transport_tx
            .send(content_frame(&json!({
                "id": 2, "time": 0.0, "type": "data.update", "instrument": "EDF2"
            })))
            .unwrap();

        let snap = wait_for(&mut table, |s| s.rows[1].highlight.is_some()).await;
        assert_eq!(snap.rows[1].record.cell("instrument"), "EDF2");
        assert_eq!(snap.rows[1].highlight, Some(Marking::Success));
        assert_eq!(snap.rows[0].highlight, None);
        let lit_at = tokio::time::Instant::now();

        wait_for(&mut table, |s| s.rows[1].highlight.is_none()).await;
        assert!(lit_at.elapsed() >= Duration::from_secs(5));

        let feed = h.handle.feed().latest();
        assert_eq!(feed.len(), 1);
        assert_eq!(feed[0].marking(), Marking::Success);
        h.cancel.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn create_reloads_page_and_logs_warning() {
        let h = start();
        let table = loaded(&h).await;

        h.transport_tx
            .send(content_frame(&json!({ "id": 4, "time": 0.0, "type": "data.new" })))
            .unwrap();

        let mut feed = h.handle.feed();
        let entries = wait_for(&mut feed, |f| !f.is_empty()).await;
        assert_eq!(entries[0].marking(), Marking::Warning);

        for _ in 0..100 {
            if h.calls.load(Ordering::SeqCst) == 2 && !table.latest().refreshing {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(h.calls.load(Ordering::SeqCst), 2);
        let snap = table.latest();
        assert!(!snap.refreshing);
        assert!(snap.loaded_at.is_some());
        assert_eq!(snap.rows.len(), 2);
        h.cancel.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn server_error_raises_alert() {
        let mut h = start();
        h.transport_tx
            .send(TransportEvent::Frame(r#"{"error":"Forbidden"}"#.into()))
            .unwrap();

        let alert = h.handle.next_alert().await.unwrap();
        assert_eq!(alert.message, "Forbidden");
        assert!(h.handle.feed().latest().is_empty());
        h.cancel.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_frames_are_dropped() {
        let h = start();
        let table = loaded(&h).await;
        let before = table.latest();
        let mut latency = h.handle.diagnostics().watch_latency();

        for bad in [
            "not json",
            r#"{"content":"{not json"}"#,
            r#"{"content":"[1,2]"}"#,
            r#"[null,"{}"]"#,
            "{}",
        ] {
            h.transport_tx.send(TransportEvent::Frame(bad.into())).unwrap();
        }
        // Unhandled type: publishes latency, mutates nothing.
        h.transport_tx
            .send(content_frame(&json!({ "id": 3, "time": 0.0, "type": "data.ping" })))
            .unwrap();
        latency.wait_for(Option::is_some).await.unwrap();

        let after = table.latest();
        assert_eq!(after.rows, before.rows);
        assert!(after.rows.iter().all(|row| row.highlight.is_none()));
        assert!(h.handle.feed().latest().is_empty());
        assert_eq!(h.calls.load(Ordering::SeqCst), 1);
        h.cancel.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn update_without_time_still_replaces_row() {
        let h = start();
        let mut table = loaded(&h).await;

        h.transport_tx
            .send(TransportEvent::Frame(
                r#"{"content":"{\"id\":3,\"type\":\"data.update\",\"instrument\":\"GLE\"}"}"#.into(),
            ))
            .unwrap();

        let snap = wait_for(&mut table, |s| s.rows[0].highlight.is_some()).await;
        assert_eq!(snap.rows[0].record.cell("instrument"), "GLE");
        assert_eq!(h.handle.feed().latest().len(), 1);
        assert_eq!(h.handle.diagnostics().latest_latency(), None);
        h.cancel.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn content_without_type_is_ignored() {
        let h = start();
        let table = loaded(&h).await;
        let before = table.latest();
        let mut latency = h.handle.diagnostics().watch_latency();

        h.transport_tx
            .send(TransportEvent::Frame(r#"{"content":"{\"id\":3,\"time\":1000}"}"#.into()))
            .unwrap();
        latency.wait_for(Option::is_some).await.unwrap();

        assert_eq!(table.latest().rows, before.rows);
        assert!(h.handle.feed().latest().is_empty());
        h.cancel.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn resubscribes_after_reconnect() {
        let h = start();
        let mut subscription = h.handle.subscription();

        h.handle.toggle_realtime();
        subscription.changed().await.unwrap();
        assert_eq!(*subscription.borrow(), SubscriptionState::Active);

        h.transport_tx.send(TransportEvent::Opened).unwrap();
        let mut status = h.handle.diagnostics().watch_status();
        status.wait_for(|s| *s == crate::diagnostics::ConnectionStatus::Connected)
            .await
            .unwrap();

        assert_eq!(h.sink.sent(), vec![Command::Subscribe, Command::Subscribe]);
        h.cancel.cancel();
    }
}
