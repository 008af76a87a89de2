//! Presentation manager types.

use std::time::Duration;

use serde_json::json;

use secondscreen_core::config::PresentationConfig;
use secondscreen_proto::NotificationFrame;
use secondscreen_proto::methods::NOTIFICATION_PRESENTATION_READY;

use crate::context::ContextError;

/// Configuration for the presentation manager.
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// Tag used when a caller omits the router name.
    pub default_router_name: String,
    /// Entrypoint started in every new context.
    pub entrypoint: String,
    /// Bound on runtime construction plus entrypoint start.
    pub context_start_timeout: Duration,
    /// Capacity of the readiness channel.
    pub ready_channel_capacity: usize,
    /// Capacity of the outbound notification channel.
    pub notification_capacity: usize,
    /// Buffered display events before new ones are dropped.
    pub event_buffer: usize,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self::from(&PresentationConfig::default())
    }
}

impl From<&PresentationConfig> for ManagerConfig {
    fn from(config: &PresentationConfig) -> Self {
        Self {
            default_router_name: config.default_router_name.clone(),
            entrypoint: config.entrypoint.clone(),
            context_start_timeout: config.context_start_timeout(),
            ready_channel_capacity: config.ready_channel_capacity.max(1),
            notification_capacity: config.notification_capacity.max(1),
            event_buffer: config.event_buffer.max(1),
        }
    }
}

/// Out-of-band message from the manager to its caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// Hosted content attached to its surface.
    PresentationReady { router_name: String },
}

impl Notification {
    pub fn into_frame(self) -> NotificationFrame {
        match self {
            Self::PresentationReady { router_name } => NotificationFrame {
                notification: NOTIFICATION_PRESENTATION_READY.to_string(),
                args: json!({ "routerName": router_name }),
            },
        }
    }
}

/// Manager statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagerStats {
    /// Live sessions in the registry.
    pub active_sessions: usize,
    /// Contexts held by the cache, shown or not.
    pub cached_contexts: usize,
    pub host_attached: bool,
    pub events_subscribed: bool,
}

/// Manager errors.
#[derive(Debug, thiserror::Error)]
pub enum ManagerError {
    #[error("Invalid arguments: {reason}")]
    InvalidArguments { reason: String },

    #[error("Display not found: {display_id}")]
    DisplayNotFound { display_id: i32 },

    #[error("Failed to create execution context: {0}")]
    ContextCreateFailed(#[from] ContextError),

    #[error("Failed to show presentation {tag}: {reason}")]
    ShowFailed { tag: String, reason: String },
}
