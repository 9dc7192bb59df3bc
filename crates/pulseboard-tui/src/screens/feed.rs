//! Activity feed panel: every change seen this session, newest on top.

use std::sync::Arc;

use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Paragraph};

use color_eyre::eyre::Result;
use pulseboard_core::{FeedEntry, FeedSnapshot};

use crate::action::Action;
use crate::component::Component;
use crate::theme;

pub struct FeedScreen {
    columns: Vec<String>,
    entries: Arc<FeedSnapshot>,
}

impl FeedScreen {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            entries: Arc::new(Vec::new()),
        }
    }

    fn entry_line(&self, entry: &FeedEntry) -> Line<'static> {
        let time = entry.received_at().format("%H:%M:%S%.3f").to_string();
        let summary = self
            .columns
            .iter()
            .map(|c| format!("{c}={}", entry.payload().cell(c)))
            .collect::<Vec<_>>()
            .join("  ");

        Line::from(vec![
            Span::styled(format!("  {time:<14}"), theme::key_hint()),
            Span::styled(
                format!("{:<9}", entry.marking().as_ref()),
                theme::marking_fg(entry.marking()),
            ),
            Span::styled(summary, theme::marking_fg(entry.marking())),
        ])
    }
}

impl Component for FeedScreen {
    fn update(&mut self, action: &Action) -> Result<Option<Action>> {
        if let Action::FeedUpdated(entries) = action {
            self.entries = Arc::clone(entries);
        }
        Ok(None)
    }

    fn render(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .title(format!(" Activity ({}) ", self.entries.len()))
            .title_style(theme::title_style())
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(theme::border_default());

        let visible = usize::from(area.height.saturating_sub(2));
        let mut lines: Vec<Line> = self
            .entries
            .iter()
            .rev()
            .take(visible)
            .map(|e| self.entry_line(e))
            .collect();

        if lines.is_empty() {
            lines.push(Line::from(Span::styled(
                "  Waiting for activity... (r toggles realtime)",
                Style::default().fg(theme::BORDER_GRAY),
            )));
        }

        frame.render_widget(Paragraph::new(lines).block(block), area);
    }
}
