//! Application core: event loop, key mapping, action dispatch, layout.

use std::collections::VecDeque;

use color_eyre::eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Paragraph},
};
use throbber_widgets_tui::{Throbber, ThrobberState};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use pulseboard_core::{
    Alert, ConnectionStatus, SessionCommands, SessionHandle, SubscriptionState, format_latency,
};

use crate::action::Action;
use crate::component::Component;
use crate::data_bridge::spawn_data_bridge;
use crate::event::{Event, EventReader};
use crate::screens::feed::FeedScreen;
use crate::screens::records::RecordsScreen;
use crate::theme;
use crate::tui::Tui;
use crate::widgets::{alert_popup, status_indicator};

/// Top-level application state and event loop.
pub struct App {
    origin: String,
    records: RecordsScreen,
    feed: FeedScreen,
    running: bool,
    help_visible: bool,
    connection: ConnectionStatus,
    subscription: SubscriptionState,
    latency_ms: Option<f64>,
    /// Server alerts waiting to be acknowledged, oldest first.
    alerts: VecDeque<Alert>,
    throbber: ThrobberState,
    commands: SessionCommands,
    action_tx: mpsc::UnboundedSender<Action>,
    action_rx: mpsc::UnboundedReceiver<Action>,
}

impl App {
    pub fn new(origin: String, columns: &[String], commands: SessionCommands) -> Self {
        let (action_tx, action_rx) = mpsc::unbounded_channel();
        Self {
            origin,
            records: RecordsScreen::new(columns.to_vec()),
            feed: FeedScreen::new(columns.to_vec()),
            running: true,
            help_visible: false,
            connection: ConnectionStatus::Connecting,
            subscription: SubscriptionState::Inactive,
            latency_ms: None,
            alerts: VecDeque::new(),
            throbber: ThrobberState::default(),
            commands,
            action_tx,
            action_rx,
        }
    }

    /// Run the main event loop until the user quits.
    pub async fn run(&mut self, handle: SessionHandle, cancel: CancellationToken) -> Result<()> {
        let mut tui = Tui::enter()?;

        let bridge_cancel = cancel.child_token();
        tokio::spawn(spawn_data_bridge(
            handle,
            self.action_tx.clone(),
            bridge_cancel.clone(),
        ));

        let mut events = EventReader::spawn(&cancel);

        info!("TUI event loop started");

        while self.running {
            let Some(event) = events.next().await else {
                break;
            };

            match event {
                Event::Key(key) => {
                    if let Some(action) = self.handle_key_event(key)? {
                        self.action_tx.send(action)?;
                    }
                }
                Event::Resize(w, h) => self.action_tx.send(Action::Resize(w, h))?,
                Event::Tick => self.action_tx.send(Action::Tick)?,
                Event::Render => self.action_tx.send(Action::Render)?,
            }

            while let Ok(action) = self.action_rx.try_recv() {
                self.process_action(&action)?;

                if let Action::Render = action {
                    tui.draw(|frame| self.render(frame))?;
                }
            }
        }

        drop(events);
        bridge_cancel.cancel();
        info!("TUI event loop ended");
        Ok(())
    }

    /// Map a key event to an action.
    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        if (key.modifiers, key.code) == (KeyModifiers::CONTROL, KeyCode::Char('c')) {
            return Ok(Some(Action::Quit));
        }

        // A pending alert blocks everything until acknowledged.
        if !self.alerts.is_empty() {
            return match key.code {
                KeyCode::Enter | KeyCode::Esc => Ok(Some(Action::DismissAlert)),
                _ => Ok(None),
            };
        }

        if self.help_visible {
            return match key.code {
                KeyCode::Esc | KeyCode::Char('?') => Ok(Some(Action::ToggleHelp)),
                _ => Ok(None),
            };
        }

        match (key.modifiers, key.code) {
            (KeyModifiers::NONE, KeyCode::Char('q')) => return Ok(Some(Action::Quit)),
            (KeyModifiers::NONE, KeyCode::Char('?')) => return Ok(Some(Action::ToggleHelp)),
            (KeyModifiers::NONE, KeyCode::Char('r')) => return Ok(Some(Action::ToggleRealtime)),
            (KeyModifiers::SHIFT | KeyModifiers::NONE, KeyCode::Char('R'))
            | (_, KeyCode::F(5)) => return Ok(Some(Action::Refresh)),
            _ => {}
        }

        self.records.handle_key_event(key)
    }

    /// Process a single action: update app state and propagate to panels.
    fn process_action(&mut self, action: &Action) -> Result<()> {
        match action {
            Action::Quit => self.running = false,
            Action::Tick => self.throbber.calc_next(),
            Action::ToggleHelp => self.help_visible = !self.help_visible,
            Action::ToggleRealtime => self.commands.toggle_realtime(),
            Action::Refresh => self.commands.refresh(),
            Action::DismissAlert => {
                self.alerts.pop_front();
            }
            Action::AlertRaised(alert) => {
                debug!(message = %alert.message, "alert raised");
                self.alerts.push_back(alert.clone());
            }
            Action::SubscriptionChanged(state) => self.subscription = *state,
            Action::ConnectionChanged(status) => self.connection = status.clone(),
            Action::LatencyUpdated(ms) => self.latency_ms = *ms,
            Action::Render | Action::Resize(..) => {}
            other => {
                for follow_up in [self.records.update(other)?, self.feed.update(other)?]
                    .into_iter()
                    .flatten()
                {
                    self.action_tx.send(follow_up)?;
                }
            }
        }
        Ok(())
    }

    /// Render the full application frame.
    fn render(&self, frame: &mut Frame) {
        let area = frame.area();

        // Layout: [header] [records] [activity] [status bar]
        let layout = Layout::vertical([
            Constraint::Length(1),
            Constraint::Percentage(60),
            Constraint::Min(5),
            Constraint::Length(1),
        ])
        .split(area);

        self.render_header(frame, layout[0]);
        self.records.render(frame, layout[1]);
        self.feed.render(frame, layout[2]);
        Self::render_status_bar(frame, layout[3]);

        if self.help_visible {
            Self::render_help_overlay(frame, area);
        }
        if let Some(alert) = self.alerts.front() {
            alert_popup::render(frame, area, alert, self.alerts.len() - 1);
        }
    }

    fn render_header(&self, frame: &mut Frame, area: Rect) {
        let latency = self
            .latency_ms
            .map_or_else(|| "--".to_owned(), format_latency);

        let mut spans = vec![
            Span::styled(" pulseboard ", theme::title_style()),
            Span::styled(self.origin.clone(), Style::default().fg(theme::DIM_WHITE)),
            Span::styled("  │  ", theme::key_hint()),
            status_indicator::connection_span(&self.connection),
            Span::styled("  │  ", theme::key_hint()),
            status_indicator::realtime_span(self.subscription),
            Span::styled("  │  latency ", theme::key_hint()),
            Span::styled(latency, Style::default().fg(theme::NEON_CYAN)),
        ];

        if self.connection == ConnectionStatus::Connecting {
            let [text_area, spin_area] =
                Layout::horizontal([Constraint::Min(1), Constraint::Length(16)]).areas(area);
            frame.render_widget(Paragraph::new(Line::from(spans)), text_area);
            let throbber = Throbber::default()
                .label("connecting")
                .style(Style::default().fg(theme::NEON_CYAN))
                .throbber_style(Style::default().fg(theme::ELECTRIC_PURPLE));
            frame.render_stateful_widget(throbber, spin_area, &mut self.throbber.clone());
            return;
        }

        spans.push(Span::raw(" "));
        frame.render_widget(Paragraph::new(Line::from(spans)), area);
    }

    fn render_status_bar(frame: &mut Frame, area: Rect) {
        let line = Line::from(vec![
            Span::styled(" r ", theme::key_hint_key()),
            Span::styled("realtime  ", theme::key_hint()),
            Span::styled("R ", theme::key_hint_key()),
            Span::styled("refresh  ", theme::key_hint()),
            Span::styled("j/k ", theme::key_hint_key()),
            Span::styled("move  ", theme::key_hint()),
            Span::styled("? ", theme::key_hint_key()),
            Span::styled("help  ", theme::key_hint()),
            Span::styled("q ", theme::key_hint_key()),
            Span::styled("quit", theme::key_hint()),
        ]);
        frame.render_widget(Paragraph::new(line), area);
    }

    fn render_help_overlay(frame: &mut Frame, area: Rect) {
        let help_area = alert_popup::centered(area, 46, 12);
        frame.render_widget(Clear, help_area);

        let block = Block::default()
            .title(" Keyboard Shortcuts ")
            .title_style(theme::title_style())
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(theme::border_focused())
            .style(Style::default().bg(theme::BG_DARK));

        let row = |key: &'static str, label: &'static str| {
            Line::from(vec![
                Span::styled(format!("  {key:<10}"), theme::key_hint_key()),
                Span::styled(label, theme::key_hint()),
            ])
        };

        let help_text = vec![
            Line::from(""),
            row("r", "Toggle realtime updates"),
            row("R / F5", "Reload the current page"),
            row("j/k ↑/↓", "Move selection"),
            row("g/G", "Top / bottom"),
            row("Enter", "Dismiss server error"),
            row("q", "Quit"),
            Line::from(""),
            Line::from(Span::styled("  Esc or ? to close", theme::key_hint())),
        ];

        frame.render_widget(Paragraph::new(help_text).block(block), help_area);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pulseboard_core::{
        ApiError, Command, CommandSink, CoreError, Record, RecordSource, Session, SessionConfig,
    };

    struct NullSink;

    impl CommandSink for NullSink {
        fn send_command(&self, _command: Command) -> std::result::Result<(), ApiError> {
            Ok(())
        }
    }

    struct NullSource;

    impl RecordSource for NullSource {
        async fn fetch_page(&self, _limit: usize) -> std::result::Result<Vec<Record>, CoreError> {
            Ok(Vec::new())
        }
    }

    /// An app whose session is never run; commands are dropped.
    fn app() -> App {
        let config = SessionConfig::new(url::Url::parse("http://localhost:8000").unwrap());
        let (_events_tx, events_rx) = mpsc::unbounded_channel();
        let (_session, handle) = Session::new(&config, NullSink, NullSource, events_rx);
        App::new("http://localhost:8000".into(), &["id".into()], handle.commands())
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn alert(message: &str) -> Alert {
        Alert {
            message: message.into(),
            raised_at: Utc::now(),
        }
    }

    #[test]
    fn global_keys_map_to_actions() {
        let mut app = app();
        assert!(matches!(
            app.handle_key_event(key(KeyCode::Char('r'))).unwrap(),
            Some(Action::ToggleRealtime)
        ));
        assert!(matches!(
            app.handle_key_event(key(KeyCode::Char('q'))).unwrap(),
            Some(Action::Quit)
        ));
        assert!(matches!(
            app.handle_key_event(key(KeyCode::F(5))).unwrap(),
            Some(Action::Refresh)
        ));
    }

    #[test]
    fn alert_blocks_until_dismissed() {
        let mut app = app();
        app.process_action(&Action::AlertRaised(alert("Forbidden")))
            .unwrap();
        app.process_action(&Action::AlertRaised(alert("Again")))
            .unwrap();

        assert!(app.handle_key_event(key(KeyCode::Char('r'))).unwrap().is_none());
        let dismiss = app.handle_key_event(key(KeyCode::Enter)).unwrap().unwrap();
        app.process_action(&dismiss).unwrap();
        assert_eq!(app.alerts.front().unwrap().message, "Again");

        app.process_action(&Action::DismissAlert).unwrap();
        assert!(app.alerts.is_empty());
    }

    #[test]
    fn ctrl_c_quits_even_with_alert() {
        let mut app = app();
        app.process_action(&Action::AlertRaised(alert("x"))).unwrap();
        let quit = app
            .handle_key_event(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL))
            .unwrap();
        assert!(matches!(quit, Some(Action::Quit)));
    }
}
