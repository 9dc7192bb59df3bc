//! Records panel: the current page of records with change highlights.

use std::sync::Arc;

use color_eyre::eyre::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::Frame;
use ratatui::layout::{Constraint, Rect};
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Cell, Row, Table, TableState};

use pulseboard_core::{DisplayedRow, TableSnapshot};

use crate::action::Action;
use crate::component::Component;
use crate::theme;

pub struct RecordsScreen {
    columns: Vec<String>,
    snapshot: Arc<TableSnapshot>,
    selected: usize,
}

impl RecordsScreen {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            snapshot: Arc::new(TableSnapshot::default()),
            selected: 0,
        }
    }

    fn clamp_selection(&mut self) {
        self.selected = self
            .selected
            .min(self.snapshot.rows.len().saturating_sub(1));
    }

    fn row_style(row: &DisplayedRow) -> Style {
        row.highlight
            .map_or_else(theme::table_row, theme::marked_row)
    }

    fn title(&self) -> Line<'static> {
        let mut spans = vec![Span::styled(
            format!(" Records ({}) ", self.snapshot.rows.len()),
            theme::title_style(),
        )];
        if self.snapshot.refreshing {
            spans.push(Span::styled(
                "refreshing… ",
                Style::default().fg(theme::ELECTRIC_YELLOW),
            ));
        }
        if let Some(ref err) = self.snapshot.load_error {
            spans.push(Span::styled(
                format!("load failed: {err} "),
                Style::default().fg(theme::ERROR_RED),
            ));
        }
        Line::from(spans)
    }
}

impl Component for RecordsScreen {
    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        let action = match key.code {
            KeyCode::Char('j') | KeyCode::Down => Some(Action::ScrollDown),
            KeyCode::Char('k') | KeyCode::Up => Some(Action::ScrollUp),
            KeyCode::Char('g') | KeyCode::Home => Some(Action::ScrollToTop),
            KeyCode::Char('G') | KeyCode::End => Some(Action::ScrollToBottom),
            _ => None,
        };
        Ok(action)
    }

    fn update(&mut self, action: &Action) -> Result<Option<Action>> {
        match action {
            Action::TableUpdated(snapshot) => {
                self.snapshot = Arc::clone(snapshot);
                self.clamp_selection();
            }
            Action::ScrollDown => {
                self.selected += 1;
                self.clamp_selection();
            }
            Action::ScrollUp => self.selected = self.selected.saturating_sub(1),
            Action::ScrollToTop => self.selected = 0,
            Action::ScrollToBottom => {
                self.selected = self.snapshot.rows.len().saturating_sub(1);
            }
            _ => {}
        }
        Ok(None)
    }

    fn render(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .title(self.title())
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(theme::border_focused());

        let header = Row::new(
            self.columns
                .iter()
                .map(|c| Cell::from(c.clone()))
                .collect::<Vec<_>>(),
        )
        .style(theme::table_header());

        let rows: Vec<Row> = self
            .snapshot
            .rows
            .iter()
            .map(|row| {
                let cells: Vec<Cell> = self
                    .columns
                    .iter()
                    .map(|c| Cell::from(row.record.cell(c)))
                    .collect();
                Row::new(cells).style(Self::row_style(row))
            })
            .collect();

        let widths = vec![Constraint::Fill(1); self.columns.len().max(1)];
        let table = Table::new(rows, widths)
            .header(header)
            .block(block)
            .row_highlight_style(theme::table_selected());

        let mut state = TableState::default();
        if !self.snapshot.rows.is_empty() {
            state.select(Some(self.selected));
        }
        frame.render_stateful_widget(table, area, &mut state);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use pulseboard_core::Record;
    use serde_json::json;

    fn snapshot(n: i64) -> Arc<TableSnapshot> {
        let rows = (0..n)
            .map(|id| DisplayedRow {
                record: Record::try_from(json!({ "id": id })).unwrap(),
                highlight: None,
            })
            .collect();
        Arc::new(TableSnapshot {
            rows,
            ..TableSnapshot::default()
        })
    }

    #[test]
    fn selection_stays_in_bounds() {
        let mut screen = RecordsScreen::new(vec!["id".into()]);
        screen.update(&Action::TableUpdated(snapshot(3))).unwrap();

        for _ in 0..10 {
            screen.update(&Action::ScrollDown).unwrap();
        }
        assert_eq!(screen.selected, 2);

        screen.update(&Action::TableUpdated(snapshot(1))).unwrap();
        assert_eq!(screen.selected, 0);

        screen.update(&Action::ScrollUp).unwrap();
        assert_eq!(screen.selected, 0);
    }

    #[test]
    fn jump_to_ends() {
        let mut screen = RecordsScreen::new(vec!["id".into()]);
        screen.update(&Action::TableUpdated(snapshot(5))).unwrap();
        screen.update(&Action::ScrollToBottom).unwrap();
        assert_eq!(screen.selected, 4);
        screen.update(&Action::ScrollToTop).unwrap();
        assert_eq!(screen.selected, 0);
    }
}
