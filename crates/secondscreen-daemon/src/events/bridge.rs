//! Event bridge: platform hotplug callbacks → a stream of 1 (added) / 0 (removed).
//!
//! At most one platform registration is live at a time. Subscribing again
//! replaces the previous registration; the old stream ends once its sender
//! is dropped.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, warn};

use crate::platform::{DisplayChange, DisplayListener, DisplayService, ListenerId};

/// Emitted when a display is connected.
pub const DISPLAY_ADDED: i32 = 1;

/// Emitted when a display is disconnected.
pub const DISPLAY_REMOVED: i32 = 0;

/// Stream of hotplug integers handed to the subscriber.
pub type DisplayEventStream = ReceiverStream<i32>;

pub struct EventBridge {
    service: Arc<dyn DisplayService>,
    slot: Mutex<Option<ListenerId>>,
    buffer: usize,
}

impl EventBridge {
    pub fn new(service: Arc<dyn DisplayService>, buffer: usize) -> Self {
        Self {
            service,
            slot: Mutex::new(None),
            buffer: buffer.max(1),
        }
    }

    /// Register with the platform and return the event stream.
    ///
    /// Changed-in-place displays produce nothing. A slow subscriber loses
    /// events rather than blocking the platform callback.
    pub fn subscribe(&self) -> DisplayEventStream {
        let (tx, rx) = mpsc::channel(self.buffer);
        let listener: DisplayListener = Arc::new(move |change| {
            let value = match change {
                DisplayChange::Added(_) => DISPLAY_ADDED,
                DisplayChange::Removed(_) => DISPLAY_REMOVED,
                DisplayChange::Changed(_) => return,
            };
            if let Err(e) = tx.try_send(value) {
                warn!(?change, error = %e, "Dropping display event");
            }
        });

        let mut slot = self.slot.lock();
        if let Some(previous) = slot.take() {
            debug!(listener = previous.0, "Replacing display listener");
            self.service.unregister_listener(previous);
        }
        let id = self.service.register_listener(listener);
        *slot = Some(id);
        info!(listener = id.0, "Subscribed to display events");
        ReceiverStream::new(rx)
    }

    /// Drop the platform registration. Returns false when none was live.
    pub fn unsubscribe(&self) -> bool {
        let Some(id) = self.slot.lock().take() else {
            return false;
        };
        self.service.unregister_listener(id);
        info!(listener = id.0, "Unsubscribed from display events");
        true
    }

    pub fn is_subscribed(&self) -> bool {
        self.slot.lock().is_some()
    }
}

impl Drop for EventBridge {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::platform::DisplayState;
    use crate::platform::sim::SimulatedPlatform;
    use tokio_stream::StreamExt;

    fn bridge(sim: &SimulatedPlatform) -> EventBridge {
        EventBridge::new(Arc::new(sim.clone()), 8)
    }

    #[tokio::test]
    async fn connect_then_disconnect_yields_one_then_zero() {
        let sim = SimulatedPlatform::new();
        let bridge = bridge(&sim);
        let events = bridge.subscribe();

        let id = sim.connect_display("Projector");
        assert!(sim.set_display_state(id, DisplayState::Off));
        assert!(sim.disconnect_display(id));
        bridge.unsubscribe();

        let values: Vec<i32> = events.collect().await;
        assert_eq!(values, vec![DISPLAY_ADDED, DISPLAY_REMOVED]);
    }

    #[tokio::test]
    async fn resubscribe_keeps_a_single_registration() {
        let sim = SimulatedPlatform::new();
        let bridge = bridge(&sim);
        let old = bridge.subscribe();
        let mut new = bridge.subscribe();
        assert_eq!(sim.listener_count(), 1);

        // The first stream's sender went with its listener.
        let stale: Vec<i32> = old.collect().await;
        assert!(stale.is_empty());

        sim.connect_display("Projector");
        assert_eq!(new.next().await, Some(DISPLAY_ADDED));
    }

    #[test]
    fn unsubscribe_is_idempotent() {
        let sim = SimulatedPlatform::new();
        let bridge = bridge(&sim);
        assert!(!bridge.unsubscribe());
        let _events = bridge.subscribe();
        assert!(bridge.is_subscribed());
        assert!(bridge.unsubscribe());
        assert!(!bridge.unsubscribe());
        assert_eq!(sim.listener_count(), 0);
    }

    #[test]
    fn drop_releases_registration() {
        let sim = SimulatedPlatform::new();
        let bridge = bridge(&sim);
        let _events = bridge.subscribe();
        drop(bridge);
        assert_eq!(sim.listener_count(), 0);
    }
}
