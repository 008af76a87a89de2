//! Data router.
//!
//! Delivers an opaque payload to one context's channel. With an explicit tag
//! the cached context for that tag is addressed (shown or not). Without one,
//! the destination is whichever context was shown most recently.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use secondscreen_proto::methods::CHANNEL_METHOD_TRANSFER;

use crate::context::{ContextCache, ExecutionContext};
use crate::platform::RpcChannel;

#[derive(Default)]
pub struct DataRouter {
    last_destination: Option<(String, Arc<dyn RpcChannel>)>,
}

impl DataRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember `context` as the default destination.
    pub fn record_show(&mut self, context: &ExecutionContext) {
        self.last_destination = Some((context.tag().to_string(), Arc::clone(context.channel())));
    }

    /// Send `payload` to the resolved destination.
    ///
    /// Returns false when there is no destination or the channel rejects the
    /// call. Never errors: delivery is fire-and-forget.
    pub fn send(&self, cache: &ContextCache, tag: Option<&str>, payload: Value) -> bool {
        let (target, channel) = match tag {
            Some(tag) => {
                let Some(context) = cache.get(tag) else {
                    debug!(tag, "No context for transfer target");
                    return false;
                };
                (tag, Arc::clone(context.channel()))
            }
            None => {
                let Some((tag, channel)) = &self.last_destination else {
                    debug!("No presentation shown yet, transfer dropped");
                    return false;
                };
                (tag.as_str(), Arc::clone(channel))
            }
        };

        match channel.invoke(CHANNEL_METHOD_TRANSFER, payload) {
            Ok(()) => {
                debug!(tag = target, "Payload delivered");
                true
            }
            Err(e) => {
                warn!(tag = target, error = %e, "Payload delivery failed");
                false
            }
        }
    }

    /// Forget the default destination.
    pub fn clear(&mut self) {
        self.last_destination = None;
    }

    pub fn last_tag(&self) -> Option<&str> {
        self.last_destination.as_ref().map(|(tag, _)| tag.as_str())
    }
}
