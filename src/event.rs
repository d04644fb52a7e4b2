//! Event plumbing for the main loop: a render tick, terminal input, and
//! app-level events multiplexed over one channel.

use std::time::Duration;

use color_eyre::eyre::{OptionExt, Result};
use crossterm::event::Event as CrosstermEvent;
use futures::{FutureExt, StreamExt};
use tokio::sync::mpsc;

/// Render ticks per second. Sampling runs on its own, slower cadence
/// ([`AppEvent::SampleRefresh`]).
pub const TICK_FPS: f64 = 30.0;

#[derive(Clone, Debug)]
pub enum Event {
    /// Render heartbeat.
    Tick,
    /// Raw terminal input (keys, resize).
    Crossterm(CrosstermEvent),
    App(AppEvent),
}

#[derive(Clone, Debug)]
pub enum AppEvent {
    Quit,
    /// Re-read the configuration file.
    Reload,
    /// Run one full sampling tick.
    SampleRefresh,
}

/// Terminal event handler: owns the channel and the reader task feeding it.
#[derive(Debug)]
pub struct EventHandler {
    sender: mpsc::UnboundedSender<Event>,
    receiver: mpsc::UnboundedReceiver<Event>,
}

impl EventHandler {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let task = EventTask::new(sender.clone());
        tokio::spawn(async { task.run().await });
        Self { sender, receiver }
    }

    /// Next event, in arrival order.
    pub async fn next(&mut self) -> Result<Event> {
        self.receiver.recv().await.ok_or_eyre("event channel closed")
    }

    /// Queue an app event behind whatever is already pending.
    pub fn send(&mut self, app_event: AppEvent) {
        let _ = self.sender.send(Event::App(app_event));
    }

    pub fn clone_sender(&self) -> mpsc::UnboundedSender<Event> {
        self.sender.clone()
    }
}

struct EventTask {
    sender: mpsc::UnboundedSender<Event>,
}

impl EventTask {
    fn new(sender: mpsc::UnboundedSender<Event>) -> Self {
        Self { sender }
    }

    /// Pump render ticks and crossterm input until every sender handle is
    /// gone, which is how the app signals shutdown.
    async fn run(self) -> Result<()> {
        let mut reader = crossterm::event::EventStream::new();
        let mut tick = tokio::time::interval(Duration::from_secs_f64(1.0 / TICK_FPS));
        loop {
            let tick_delay = tick.tick();
            let crossterm_event = reader.next().fuse();
            tokio::select! {
                _ = self.sender.closed() => {
                    break;
                }
                _ = tick_delay => {
                    self.send(Event::Tick);
                }
                Some(Ok(event)) = crossterm_event => {
                    self.send(Event::Crossterm(event));
                }
            }
        }
        Ok(())
    }

    fn send(&self, event: Event) {
        // Ignore failures: a closed channel means the app is shutting down.
        let _ = self.sender.send(event);
    }
}
