//! Terminal input and UI clocks.
//!
//! One background task merges key presses and resizes with two clocks: a
//! slow tick for the connecting throbber and a fast render tick. The task
//! lives as long as the [`EventReader`] and never outlives the app's
//! cancellation token.

use std::time::Duration;

use crossterm::event::{Event as CrosstermEvent, EventStream, KeyEvent, KeyEventKind};
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::time::{Interval, MissedTickBehavior};
use tokio_util::sync::{CancellationToken, DropGuard};

/// Throbber animation rate.
const TICK_RATE: Duration = Duration::from_millis(250);

/// Redraw rate (~30 FPS).
const RENDER_RATE: Duration = Duration::from_millis(33);

#[derive(Debug)]
pub enum Event {
    Key(KeyEvent),
    /// Terminal resized to (cols, rows).
    Resize(u16, u16),
    Tick,
    Render,
}

pub struct EventReader {
    rx: mpsc::UnboundedReceiver<Event>,
    _stop: DropGuard,
}

impl EventReader {
    /// Start reading. The task stops when `cancel` fires or the reader drops.
    pub fn spawn(cancel: &CancellationToken) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let stop = cancel.child_token();
        tokio::spawn(read_loop(tx, stop.clone()));
        Self {
            rx,
            _stop: stop.drop_guard(),
        }
    }

    /// Next event, or `None` once the reader has stopped.
    pub async fn next(&mut self) -> Option<Event> {
        self.rx.recv().await
    }
}

fn clock(period: Duration) -> Interval {
    let mut interval = tokio::time::interval(period);
    // Slow frames must not be followed by a burst of catch-up redraws.
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval
}

async fn read_loop(tx: mpsc::UnboundedSender<Event>, stop: CancellationToken) {
    let mut input = EventStream::new();
    let mut tick = clock(TICK_RATE);
    let mut render = clock(RENDER_RATE);

    loop {
        let event = tokio::select! {
            () = stop.cancelled() => break,
            _ = tick.tick() => Event::Tick,
            _ = render.tick() => Event::Render,
            Some(Ok(raw)) = input.next() => match raw {
                CrosstermEvent::Key(key) if key.kind == KeyEventKind::Press => Event::Key(key),
                CrosstermEvent::Resize(cols, rows) => Event::Resize(cols, rows),
                _ => continue,
            },
        };

        if tx.send(event).is_err() {
            break;
        }
    }
}
