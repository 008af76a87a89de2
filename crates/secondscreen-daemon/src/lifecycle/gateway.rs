//! Tracks the host application context.
//!
//! New contexts can only be created while a host is attached. Detaching
//! clears the handle; teardown of sessions and subscriptions is driven by
//! the manager.

use tracing::{info, warn};

use crate::platform::HostContext;

#[derive(Debug, Default)]
pub struct LifecycleGateway {
    host: Option<HostContext>,
}

impl LifecycleGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach `host`, replacing any previous one.
    pub fn attach(&mut self, host: HostContext) {
        info!(host = host.id(), "Host attached");
        if let Some(previous) = self.host.replace(host) {
            warn!(previous = previous.id(), "Host re-attached without detach");
        }
    }

    /// Clear the host handle. Returns the detached host, if any.
    pub fn detach(&mut self) -> Option<HostContext> {
        let host = self.host.take();
        if let Some(host) = &host {
            info!(host = host.id(), "Host detached");
        }
        host
    }

    pub const fn host(&self) -> Option<&HostContext> {
        self.host.as_ref()
    }

    pub const fn is_attached(&self) -> bool {
        self.host.is_some()
    }
}
