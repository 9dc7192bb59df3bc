//! All possible UI actions. Actions are the sole mechanism for state mutation.

use std::sync::Arc;

use pulseboard_core::{Alert, ConnectionStatus, FeedSnapshot, SubscriptionState, TableSnapshot};

#[derive(Debug, Clone)]
pub enum Action {
    // ── Lifecycle ──
    Quit,
    Tick,
    Render,
    Resize(u16, u16),

    // ── User intents ──
    ToggleRealtime,
    Refresh,
    ToggleHelp,
    DismissAlert,
    ScrollUp,
    ScrollDown,
    ScrollToTop,
    ScrollToBottom,

    // ── Session state ──
    TableUpdated(Arc<TableSnapshot>),
    FeedUpdated(Arc<FeedSnapshot>),
    SubscriptionChanged(SubscriptionState),
    ConnectionChanged(ConnectionStatus),
    LatencyUpdated(Option<f64>),
    AlertRaised(Alert),
}
