//! Connection and realtime indicators: ●/○/◐ with color mapping.

use ratatui::style::Style;
use ratatui::text::Span;

use pulseboard_core::{ConnectionStatus, SubscriptionState};

use crate::theme;

/// Styled dot + label for the push-feed connection.
pub fn connection_span(status: &ConnectionStatus) -> Span<'static> {
    let (symbol, color) = match status {
        ConnectionStatus::Connected => ("●", theme::SUCCESS_GREEN),
        ConnectionStatus::Connecting => ("◐", theme::ELECTRIC_YELLOW),
        ConnectionStatus::Disconnected { .. } => ("○", theme::ERROR_RED),
    };
    Span::styled(format!("{symbol} {status}"), Style::default().fg(color))
}

/// Styled label for the realtime subscription toggle.
pub fn realtime_span(state: SubscriptionState) -> Span<'static> {
    match state {
        SubscriptionState::Active => {
            Span::styled("realtime ON", Style::default().fg(theme::SUCCESS_GREEN))
        }
        SubscriptionState::Inactive => {
            Span::styled("realtime OFF", Style::default().fg(theme::DIM_WHITE))
        }
    }
}
