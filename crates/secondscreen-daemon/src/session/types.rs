//! Session types.

use std::sync::Arc;
use std::time::Instant;

use crate::platform::{IsolatedRuntime, PresentationSurface};

/// Lifecycle of one presentation session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Surface instructed to display; content not yet attached.
    Showing,
    /// Hosted content reported that it is attached to the surface.
    Ready,
    /// Torn down. Never observable in the registry.
    Dismissed,
}

impl SessionState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Showing => "showing",
            Self::Ready => "ready",
            Self::Dismissed => "dismissed",
        }
    }
}

/// Snapshot of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    pub session_id: u64,
    pub tag: String,
    pub display_id: i32,
    pub state: SessionState,
    pub created_at: Instant,
}

/// Live session owned by the registry.
pub(crate) struct Session {
    pub session_id: u64,
    pub tag: String,
    pub display_id: i32,
    pub state: SessionState,
    pub created_at: Instant,
    pub runtime: Arc<dyn IsolatedRuntime>,
    pub surface: Box<dyn PresentationSurface>,
}

impl Session {
    pub fn info(&self) -> SessionInfo {
        SessionInfo {
            session_id: self.session_id,
            tag: self.tag.clone(),
            display_id: self.display_id,
            state: self.state,
            created_at: self.created_at,
        }
    }
}
