//! Graceful shutdown fan-out.

use tokio::sync::broadcast;

/// One trigger, many listeners: the server loop and any test harness
/// driving it each hold a receiver.
#[derive(Clone)]
pub struct Shutdown {
    notify: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (notify, _) = broadcast::channel(1);
        Self { notify }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.notify.subscribe()
    }

    /// Wake every subscriber. Triggering with nobody listening is harmless.
    pub fn trigger(&self) {
        let listeners = self.notify.send(()).unwrap_or(0);
        tracing::debug!(listeners, "Shutdown triggered");
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
