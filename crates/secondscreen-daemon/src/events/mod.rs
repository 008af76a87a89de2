//! Display hotplug events.

mod bridge;

pub use bridge::{DISPLAY_ADDED, DISPLAY_REMOVED, DisplayEventStream, EventBridge};
