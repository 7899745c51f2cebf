//! Event sinks: outbound change notification
//!
//! The dispatcher hands each committed [`ChangeEvent`] to every registered
//! sink, exactly once per successful request. A sink is an explicit
//! caller-supplied object, not an ambient emitter; [`ChannelSink`] is the
//! stock implementation for subscribers that want a stream.

use tokio::sync::broadcast;
use tracing::debug;
use weft_core::ChangeEvent;

/// Receiver of per-commit change summaries
///
/// `publish` is called after commit, on the request's task; it must not
/// block. Delivery failures are the sink's problem, never the caller's.
pub trait EventSink: Send + Sync {
    /// Deliver one committed change summary
    fn publish(&self, event: &ChangeEvent);
}

/// Broadcast-channel sink
///
/// Fans events out to any number of subscribers. Delivery is
/// at-most-once: a subscriber that lags past the channel capacity misses
/// events rather than blocking the dispatcher.
#[derive(Debug)]
pub struct ChannelSink {
    tx: broadcast::Sender<ChangeEvent>,
}

impl ChannelSink {
    /// Create a sink buffering up to `capacity` undelivered events
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to future events
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.tx.subscribe()
    }
}

impl EventSink for ChannelSink {
    fn publish(&self, event: &ChangeEvent) {
        // send only errors when no receiver exists; an event nobody
        // listens for is simply dropped.
        if self.tx.send(event.clone()).is_err() {
            debug!(target: "weft::events", "change event dropped: no subscribers");
        }
    }
}
