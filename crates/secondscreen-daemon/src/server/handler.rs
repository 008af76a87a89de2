//! Method dispatch: wire calls → presentation manager operations.
//!
//! Arguments are normalized into typed requests before they reach the
//! manager; manager errors are mapped onto the per-method wire codes.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::StreamExt as _;
use tracing::{debug, info, warn};

use secondscreen_proto::methods::{
    ERR_DISPLAY_NOT_FOUND, ERR_ENGINE, ERR_HIDE_PRESENTATION, ERR_INVALID_ARGUMENTS,
    ERR_MALFORMED_CALL, ERR_NOT_IMPLEMENTED, ERR_PREWARM, ERR_SHOW_PRESENTATION,
    EVENT_DISPLAY_CHANGED, METHOD_GET_ACTIVE_PRESENTATIONS, METHOD_HIDE_ALL_PRESENTATIONS,
    METHOD_HIDE_PRESENTATION, METHOD_LIST_DISPLAY, METHOD_PREWARM_ENGINE,
    METHOD_SHOW_PRESENTATION, METHOD_SUBSCRIBE_DISPLAY_EVENTS, METHOD_TRANSFER_DATA,
    METHOD_UNSUBSCRIBE_DISPLAY_EVENTS,
};
use secondscreen_proto::{
    DisplayEventFrame, HideRequest, ListDisplayRequest, MethodCall, MethodError, MethodResponse,
    NotificationFrame, PrewarmRequest, ShowRequest, TransferRequest,
};

use crate::manager::{ManagerError, Notification, PresentationManager};

/// Unsolicited frame written alongside responses.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Outbound {
    Notification(NotificationFrame),
    DisplayEvent(DisplayEventFrame),
}

/// Routes method calls to a [`PresentationManager`].
pub struct MethodHandler {
    manager: Arc<PresentationManager>,
    outbound: mpsc::Sender<Outbound>,
    event_forwarder: Mutex<Option<JoinHandle<()>>>,
}

impl MethodHandler {
    pub fn new(manager: Arc<PresentationManager>, outbound: mpsc::Sender<Outbound>) -> Self {
        Self {
            manager,
            outbound,
            event_forwarder: Mutex::new(None),
        }
    }

    /// Manager this handler dispatches to.
    pub(super) const fn manager(&self) -> &Arc<PresentationManager> {
        &self.manager
    }

    /// Forward manager notifications to the outbound channel until either
    /// side closes.
    pub fn forward_notifications(&self, mut notifications: mpsc::Receiver<Notification>) -> JoinHandle<()> {
        let outbound = self.outbound.clone();
        tokio::spawn(async move {
            while let Some(notification) = notifications.recv().await {
                let frame = Outbound::Notification(notification.into_frame());
                if outbound.send(frame).await.is_err() {
                    debug!("Outbound channel closed, stopping notification forwarder");
                    break;
                }
            }
        })
    }

    /// Parse and handle one raw input line.
    pub async fn handle_line(&self, line: &str) -> MethodResponse {
        match serde_json::from_str::<MethodCall>(line) {
            Ok(call) => self.handle(call).await,
            Err(e) => {
                warn!(error = %e, "Malformed method call");
                MethodResponse::err(
                    Value::Null,
                    MethodError::new(ERR_MALFORMED_CALL, format!("Malformed call: {e}")),
                )
            }
        }
    }

    pub async fn handle(&self, call: MethodCall) -> MethodResponse {
        debug!(method = %call.method, id = %call.id, "Handling call");
        match self.dispatch(&call.method, &call.args).await {
            Ok(result) => MethodResponse::ok(call.id, result),
            Err(error) => {
                warn!(method = %call.method, code = %error.code, message = %error.message, "Call failed");
                MethodResponse::err(call.id, error)
            }
        }
    }

    async fn dispatch(&self, method: &str, args: &Value) -> Result<Value, MethodError> {
        match method {
            METHOD_LIST_DISPLAY => Ok(self.list_display(args)),
            METHOD_PREWARM_ENGINE => self.prewarm(args).await,
            METHOD_SHOW_PRESENTATION => self.show(args).await,
            METHOD_HIDE_PRESENTATION => self.hide(args).await,
            METHOD_HIDE_ALL_PRESENTATIONS => Ok(json!(self.manager.hide_all().await)),
            METHOD_GET_ACTIVE_PRESENTATIONS => Ok(json!(self.manager.list_active().await)),
            METHOD_TRANSFER_DATA => {
                let req = TransferRequest::from_args(args);
                let sent = self
                    .manager
                    .transfer(req.router_name.as_deref(), req.payload)
                    .await;
                Ok(Value::Bool(sent))
            }
            METHOD_SUBSCRIBE_DISPLAY_EVENTS => Ok(Value::Bool(self.subscribe_display_events())),
            METHOD_UNSUBSCRIBE_DISPLAY_EVENTS => {
                Ok(Value::Bool(self.manager.unsubscribe_display_events()))
            }
            _ => Err(MethodError::new(
                ERR_NOT_IMPLEMENTED,
                format!("Method not implemented: {method}"),
            )),
        }
    }

    fn list_display(&self, args: &Value) -> Value {
        let category = match ListDisplayRequest::from_args(args) {
            Ok(req) => req.category,
            Err(e) => {
                warn!(error = %e, "Ignoring unusable listDisplay arguments");
                None
            }
        };
        json!(self.manager.list_displays(category.as_deref()))
    }

    async fn prewarm(&self, args: &Value) -> Result<Value, MethodError> {
        let req = PrewarmRequest::from_args(args)
            .map_err(|e| MethodError::new(ERR_PREWARM, e.to_string()))?;
        self.manager
            .prewarm(req.router_name.as_deref())
            .await
            .map(Value::Bool)
            .map_err(|e| MethodError::new(ERR_PREWARM, e.to_string()))
    }

    async fn show(&self, args: &Value) -> Result<Value, MethodError> {
        let req = ShowRequest::from_args(args)
            .map_err(|e| MethodError::new(ERR_INVALID_ARGUMENTS, e.to_string()))?;
        let session = self
            .manager
            .show(req.display_id, &req.router_name)
            .await
            .map_err(|e| MethodError::new(show_error_code(&e), e.to_string()))?;
        info!(
            tag = %session.tag,
            display_id = session.display_id,
            "showPresentation accepted"
        );
        Ok(Value::Bool(true))
    }

    async fn hide(&self, args: &Value) -> Result<Value, MethodError> {
        let req = HideRequest::from_args(args)
            .map_err(|e| MethodError::new(ERR_HIDE_PRESENTATION, e.to_string()))?;
        if req.is_hide_all() {
            debug!("hidePresentation without a target, dismissing all");
        }
        let hidden = self
            .manager
            .hide(req.display_id, req.router_name.as_deref())
            .await;
        Ok(Value::Bool(hidden))
    }

    /// (Re)subscribe and spawn a task forwarding hotplug values as
    /// `displayChanged` frames.
    fn subscribe_display_events(&self) -> bool {
        let mut events = self.manager.subscribe_display_events();
        let outbound = self.outbound.clone();
        let task = tokio::spawn(async move {
            while let Some(value) = events.next().await {
                let frame = Outbound::DisplayEvent(DisplayEventFrame {
                    event: EVENT_DISPLAY_CHANGED.to_string(),
                    value,
                });
                if outbound.send(frame).await.is_err() {
                    break;
                }
            }
            debug!("Display event stream ended");
        });
        // The old listener is gone; drop whatever its stream still buffered.
        if let Some(previous) = self.event_forwarder.lock().replace(task) {
            previous.abort();
        }
        true
    }
}

impl Drop for MethodHandler {
    fn drop(&mut self) {
        if let Some(task) = self.event_forwarder.lock().take() {
            task.abort();
        }
    }
}

const fn show_error_code(error: &ManagerError) -> &'static str {
    match error {
        ManagerError::InvalidArguments { .. } => ERR_INVALID_ARGUMENTS,
        ManagerError::DisplayNotFound { .. } => ERR_DISPLAY_NOT_FOUND,
        ManagerError::ContextCreateFailed(_) => ERR_ENGINE,
        ManagerError::ShowFailed { .. } => ERR_SHOW_PRESENTATION,
    }
}

#[cfg(test)]
#[path = "handler_tests.rs"]
mod tests;
