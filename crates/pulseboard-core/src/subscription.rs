// ── Subscription controller ──
//
// Tracks whether the user wants live pushes and tells the server when that
// changes. The local state flips on every toggle, even when the command
// cannot be delivered: the toggle reflects intent, not server state.

use pulseboard_api::{Command, WebSocketHandle};
use strum::Display;
use tokio::sync::watch;
use tracing::{info, warn};

/// Outbound command channel to the server.
pub trait CommandSink {
    fn send_command(&self, command: Command) -> Result<(), pulseboard_api::Error>;
}

impl CommandSink for WebSocketHandle {
    fn send_command(&self, command: Command) -> Result<(), pulseboard_api::Error> {
        self.send(command.to_frame())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum SubscriptionState {
    /// Not receiving pushes. The initial state.
    Inactive,
    Active,
}

impl SubscriptionState {
    pub fn is_active(self) -> bool {
        matches!(self, Self::Active)
    }
}

pub struct SubscriptionController {
    state: watch::Sender<SubscriptionState>,
    resubscribe_on_reconnect: bool,
}

impl SubscriptionController {
    pub fn new(resubscribe_on_reconnect: bool) -> Self {
        let (state, _) = watch::channel(SubscriptionState::Inactive);
        Self {
            state,
            resubscribe_on_reconnect,
        }
    }

    pub fn state(&self) -> SubscriptionState {
        *self.state.borrow()
    }

    pub fn watch(&self) -> watch::Receiver<SubscriptionState> {
        self.state.subscribe()
    }

    /// Flip the subscription and send the matching command.
    ///
    /// Exactly one command is attempted per call. A send failure is logged
    /// and does not prevent the state change.
    pub fn toggle<K: CommandSink + ?Sized>(&self, sink: &K) -> SubscriptionState {
        let (command, next) = match self.state() {
            SubscriptionState::Inactive => (Command::Subscribe, SubscriptionState::Active),
            SubscriptionState::Active => (Command::Unsubscribe, SubscriptionState::Inactive),
        };

        match sink.send_command(command) {
            Ok(()) => info!(?command, "realtime {next}"),
            Err(e) => warn!(?command, error = %e, "command not delivered"),
        }

        self.state.send_replace(next);
        next
    }

    /// Called when the transport reopens after a drop.
    ///
    /// The server forgets subscriptions with the connection, so an active
    /// subscription is re-sent when configured to. The local state never
    /// changes here. Returns whether a command was attempted.
    pub fn on_reconnected<K: CommandSink + ?Sized>(&self, sink: &K) -> bool {
        if !self.resubscribe_on_reconnect || !self.state().is_active() {
            return false;
        }
        if let Err(e) = sink.send_command(Command::Subscribe) {
            warn!(error = %e, "resubscribe not delivered");
        } else {
            info!("resubscribed after reconnect");
        }
        true
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Mutex;

    use super::*;
    use pretty_assertions::assert_eq;

    /// Records every command; optionally fails delivery.
    #[derive(Default)]
    pub(crate) struct RecordingSink {
        pub(crate) sent: Mutex<Vec<Command>>,
        pub(crate) fail: bool,
    }

    impl RecordingSink {
        pub(crate) fn failing() -> Self {
            Self {
                sent: Mutex::default(),
                fail: true,
            }
        }

        pub(crate) fn sent(&self) -> Vec<Command> {
            self.sent.lock().map(|v| v.clone()).unwrap_or_default()
        }
    }

    impl CommandSink for RecordingSink {
        fn send_command(&self, command: Command) -> Result<(), pulseboard_api::Error> {
            if let Ok(mut sent) = self.sent.lock() {
                sent.push(command);
            }
            if self.fail {
                Err(pulseboard_api::Error::NotConnected)
            } else {
                Ok(())
            }
        }
    }

    #[test]
    fn starts_inactive() {
        assert_eq!(
            SubscriptionController::new(true).state(),
            SubscriptionState::Inactive
        );
    }

    #[test]
    fn toggle_alternates_commands() {
        let controller = SubscriptionController::new(true);
        let sink = RecordingSink::default();

        assert_eq!(controller.toggle(&sink), SubscriptionState::Active);
        assert_eq!(controller.toggle(&sink), SubscriptionState::Inactive);
        assert_eq!(controller.toggle(&sink), SubscriptionState::Active);

        assert_eq!(
            sink.sent(),
            vec![Command::Subscribe, Command::Unsubscribe, Command::Subscribe]
        );
    }

    #[test]
    fn toggle_flips_even_when_send_fails() {
        let controller = SubscriptionController::new(true);
        let sink = RecordingSink::failing();

        assert_eq!(controller.toggle(&sink), SubscriptionState::Active);
        assert_eq!(sink.sent(), vec![Command::Subscribe]);
    }

    #[test]
    fn resubscribes_only_when_active() {
        let controller = SubscriptionController::new(true);
        let sink = RecordingSink::default();

        assert!(!controller.on_reconnected(&sink));
        controller.toggle(&sink);
        assert!(controller.on_reconnected(&sink));
        assert_eq!(controller.state(), SubscriptionState::Active);
        assert_eq!(sink.sent(), vec![Command::Subscribe, Command::Subscribe]);
    }

    #[test]
    fn resubscribe_can_be_disabled() {
        let controller = SubscriptionController::new(false);
        let sink = RecordingSink::default();
        controller.toggle(&sink);
        assert!(!controller.on_reconnected(&sink));
        assert_eq!(sink.sent().len(), 1);
    }

    #[test]
    fn state_is_observable() {
        let controller = SubscriptionController::new(true);
        let rx = controller.watch();
        controller.toggle(&RecordingSink::default());
        assert!(rx.borrow().is_active());
    }
}
