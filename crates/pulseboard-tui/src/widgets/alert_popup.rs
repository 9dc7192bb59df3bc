//! Centered modal for server-reported errors.

use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Clear, Paragraph, Wrap};

use pulseboard_core::Alert;

use crate::theme;

/// A rectangle of at most `width` x `height`, centered in `area`.
pub fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let w = width.min(area.width.saturating_sub(4));
    let h = height.min(area.height.saturating_sub(2));
    Rect::new(
        area.x + area.width.saturating_sub(w) / 2,
        area.y + area.height.saturating_sub(h) / 2,
        w,
        h,
    )
}

/// Render `alert`; `queued` more are waiting behind it.
pub fn render(frame: &mut Frame, area: Rect, alert: &Alert, queued: usize) {
    let popup = centered(area, 60, 9);
    frame.render_widget(Clear, popup);

    let title = if queued > 0 {
        format!(" Server error (+{queued} more) ")
    } else {
        " Server error ".to_owned()
    };
    let block = Block::default()
        .title(title)
        .title_style(Style::default().fg(theme::ERROR_RED))
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(theme::ERROR_RED))
        .style(Style::default().bg(theme::BG_DARK));

    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            alert.message.clone(),
            Style::default().fg(theme::DIM_WHITE),
        )),
        Line::from(""),
        Line::from(Span::styled(
            alert.raised_at.format("%H:%M:%S").to_string(),
            theme::key_hint(),
        )),
        Line::from(vec![
            Span::styled("Enter", theme::key_hint_key()),
            Span::styled(" dismiss", theme::key_hint()),
        ]),
    ];

    frame.render_widget(
        Paragraph::new(lines)
            .block(block)
            .wrap(Wrap { trim: true })
            .centered(),
        popup,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centered_fits_inside_area() {
        let area = Rect::new(0, 0, 100, 40);
        let r = centered(area, 60, 9);
        assert_eq!(r, Rect::new(20, 15, 60, 9));
    }

    #[test]
    fn centered_shrinks_for_small_terminals() {
        let area = Rect::new(0, 0, 30, 6);
        let r = centered(area, 60, 9);
        assert_eq!(r.width, 26);
        assert_eq!(r.height, 4);
    }
}
