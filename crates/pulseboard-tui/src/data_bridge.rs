//! Data bridge: connects [`SessionHandle`] streams to TUI actions.
//!
//! Runs as a background task, forwarding every view snapshot, subscription
//! change, connection transition, latency reading and server alert as an
//! [`Action`] through the TUI's action channel.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use pulseboard_core::SessionHandle;

use crate::action::Action;

pub async fn spawn_data_bridge(
    mut handle: SessionHandle,
    action_tx: mpsc::UnboundedSender<Action>,
    cancel: CancellationToken,
) {
    let mut table = handle.table();
    let mut feed = handle.feed();
    let mut subscription = handle.subscription();
    let mut status = handle.diagnostics().watch_status();
    let mut latency = handle.diagnostics().watch_latency();

    // Push initial snapshots so panels have data immediately
    let _ = action_tx.send(Action::TableUpdated(table.latest()));
    let _ = action_tx.send(Action::FeedUpdated(feed.latest()));
    let _ = action_tx.send(Action::SubscriptionChanged(*subscription.borrow_and_update()));
    let _ = action_tx.send(Action::ConnectionChanged(status.borrow_and_update().clone()));

    loop {
        tokio::select! {
            biased;

            () = cancel.cancelled() => break,

            Some(alert) = handle.next_alert() => {
                let _ = action_tx.send(Action::AlertRaised(alert));
            }
            Some(t) = table.changed() => {
                let _ = action_tx.send(Action::TableUpdated(t));
            }
            Some(f) = feed.changed() => {
                let _ = action_tx.send(Action::FeedUpdated(f));
            }
            Ok(()) = subscription.changed() => {
                let state = *subscription.borrow_and_update();
                let _ = action_tx.send(Action::SubscriptionChanged(state));
            }
            Ok(()) = status.changed() => {
                let s = status.borrow_and_update().clone();
                let _ = action_tx.send(Action::ConnectionChanged(s));
            }
            Ok(()) = latency.changed() => {
                let ms = *latency.borrow_and_update();
                let _ = action_tx.send(Action::LatencyUpdated(ms));
            }
            else => break,
        }
    }

    debug!("data bridge shut down");
}
