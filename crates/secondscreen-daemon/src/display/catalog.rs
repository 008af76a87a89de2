//! Display catalog: platform displays → immutable descriptors.
//!
//! Every call re-queries the platform. Geometry and power state change
//! underneath us, so nothing is cached.

use std::sync::Arc;

use tracing::debug;

use secondscreen_proto::{DisplayDescriptor, PowerState};

use crate::platform::{DisplayService, DisplayState, PlatformDisplay};

/// Read-only view over the platform display service.
#[derive(Clone)]
pub struct DisplayCatalog {
    service: Arc<dyn DisplayService>,
}

impl DisplayCatalog {
    pub fn new(service: Arc<dyn DisplayService>) -> Self {
        Self { service }
    }

    /// Snapshot of the enumerable displays, optionally filtered by category.
    /// Empty when the platform reports none.
    pub fn list_displays(&self, category: Option<&str>) -> Vec<DisplayDescriptor> {
        let primary = self.service.primary_display_id();
        let displays: Vec<DisplayDescriptor> = self
            .service
            .displays(category)
            .iter()
            .map(|d| describe(d, primary))
            .collect();
        debug!(?category, count = displays.len(), "Listed displays");
        displays
    }

    /// Resolve one display id against the current platform state.
    pub fn find(&self, display_id: i32) -> Option<DisplayDescriptor> {
        let primary = self.service.primary_display_id();
        self.service
            .display(display_id)
            .map(|d| describe(&d, primary))
    }
}

fn describe(display: &PlatformDisplay, primary_id: i32) -> DisplayDescriptor {
    DisplayDescriptor {
        display_id: display.id,
        name: display.name.clone(),
        width: display.width,
        height: display.height,
        density: display.density,
        refresh_rate: display.refresh_rate,
        is_presentation: display.supports_presentation(),
        is_external: display.id != primary_id,
        power: match display.state {
            DisplayState::On => PowerState::On,
            DisplayState::Off | DisplayState::Doze | DisplayState::Unknown => PowerState::Off,
        },
    }
}
