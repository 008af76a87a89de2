//! Presentation manager.
//!
//! Registry, cache, router and host handle live behind one async mutex, so
//! back-to-back calls (show then hide) observe each other's effects in order.
//! Display enumeration and the event bridge are read-only or self-locking and
//! stay outside it.

use std::sync::{Arc, Weak};

use serde_json::Value;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use secondscreen_proto::DisplayDescriptor;

use crate::context::{ContextCache, ContextError};
use crate::display::DisplayCatalog;
use crate::events::{DisplayEventStream, EventBridge};
use crate::lifecycle::LifecycleGateway;
use crate::platform::{HostContext, Platform, ReadySignal};
use crate::router::DataRouter;
use crate::session::{SessionInfo, SessionRegistry};

use super::types::{ManagerConfig, ManagerError, ManagerStats, Notification};

struct ManagerState {
    gateway: LifecycleGateway,
    cache: ContextCache,
    registry: SessionRegistry,
    router: DataRouter,
}

/// Owns every presentation session for one host process.
pub struct PresentationManager {
    state: Arc<Mutex<ManagerState>>,
    catalog: DisplayCatalog,
    events: EventBridge,
    notifications: mpsc::Sender<Notification>,
    config: ManagerConfig,
    ready_pump: JoinHandle<()>,
}

impl PresentationManager {
    /// Create a manager over `platform`.
    ///
    /// Returns the manager and the receiver for its notifications. Must be
    /// called from within a Tokio runtime: the readiness pump is spawned here.
    pub fn new(platform: Platform, config: ManagerConfig) -> (Self, mpsc::Receiver<Notification>) {
        let (ready_tx, ready_rx) = mpsc::channel(config.ready_channel_capacity);
        let (notify_tx, notify_rx) = mpsc::channel(config.notification_capacity);

        let state = Arc::new(Mutex::new(ManagerState {
            gateway: LifecycleGateway::new(),
            cache: ContextCache::new(
                platform.runtimes,
                config.entrypoint.clone(),
                config.context_start_timeout,
            ),
            registry: SessionRegistry::new(platform.surfaces, ready_tx),
            router: DataRouter::new(),
        }));
        let ready_pump = tokio::spawn(ready_pump(
            Arc::downgrade(&state),
            ready_rx,
            notify_tx.clone(),
        ));

        let manager = Self {
            state,
            catalog: DisplayCatalog::new(Arc::clone(&platform.displays)),
            events: EventBridge::new(platform.displays, config.event_buffer),
            notifications: notify_tx,
            config,
            ready_pump,
        };
        (manager, notify_rx)
    }

    /// Fresh display snapshot, optionally filtered by category.
    pub fn list_displays(&self, category: Option<&str>) -> Vec<DisplayDescriptor> {
        self.catalog.list_displays(category)
    }

    /// Create (or confirm) the context for `router_name` without showing it.
    ///
    /// A missing or empty name falls back to the default router name.
    pub async fn prewarm(&self, router_name: Option<&str>) -> Result<bool, ManagerError> {
        let tag = self.resolve_tag(router_name).to_string();
        let mut state = self.state.lock().await;
        let host = state.gateway.host().cloned();
        state.cache.get_or_create(&tag, host.as_ref()).await?;
        drop(state);
        debug!(tag, "Context prewarmed");
        Ok(true)
    }

    /// Show the content for `tag` on `display_id`.
    ///
    /// Replaces any session already open for the tag. Returns once the
    /// surface has been told to display; readiness is reported later as a
    /// [`Notification::PresentationReady`].
    #[allow(clippy::significant_drop_tightening)]
    pub async fn show(&self, display_id: i32, tag: &str) -> Result<SessionInfo, ManagerError> {
        if tag.trim().is_empty() {
            return Err(ManagerError::InvalidArguments {
                reason: "routerName must not be empty".to_string(),
            });
        }
        let display = self
            .catalog
            .find(display_id)
            .ok_or(ManagerError::DisplayNotFound { display_id })?;

        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        let host = state.gateway.host().cloned();
        let context = state.cache.get_or_create(tag, host.as_ref()).await?;
        let host = host.ok_or(ContextError::NoHostContext)?;

        let session = state
            .registry
            .open(&host, &display, &context)
            .map_err(|e| ManagerError::ShowFailed {
                tag: tag.to_string(),
                reason: e.to_string(),
            })?;
        state.router.record_show(&context);
        Ok(session)
    }

    /// Mark `tag` ready and publish the notification.
    ///
    /// Only the Showing → Ready transition notifies; repeats and unknown
    /// tags are ignored.
    pub async fn mark_ready(&self, tag: &str) -> bool {
        let transitioned = self.state.lock().await.registry.mark_ready(tag);
        if transitioned {
            publish(&self.notifications, tag);
        }
        transitioned
    }

    /// Dismiss by display and/or tag. See [`SessionRegistry::hide`].
    pub async fn hide(&self, display_id: Option<i32>, tag: Option<&str>) -> bool {
        let tag = tag.filter(|t| !t.is_empty());
        self.state.lock().await.registry.hide(display_id, tag)
    }

    /// Dismiss every session. Returns the number dismissed.
    pub async fn hide_all(&self) -> usize {
        self.state.lock().await.registry.hide_all()
    }

    /// Tags with a live session, in the order they were shown.
    pub async fn list_active(&self) -> Vec<String> {
        self.state.lock().await.registry.list_active()
    }

    /// Snapshot of the live session for `tag`, if any.
    pub async fn session(&self, tag: &str) -> Option<SessionInfo> {
        self.state.lock().await.registry.session(tag)
    }

    /// Forward `payload` to hosted content. Never errors.
    pub async fn transfer(&self, router_name: Option<&str>, payload: Value) -> bool {
        let tag = router_name.filter(|t| !t.is_empty());
        let state = self.state.lock().await;
        state.router.send(&state.cache, tag, payload)
    }

    /// Start (or restart) the display hotplug stream.
    pub fn subscribe_display_events(&self) -> DisplayEventStream {
        self.events.subscribe()
    }

    /// Stop the hotplug stream. Returns false when none was active.
    pub fn unsubscribe_display_events(&self) -> bool {
        self.events.unsubscribe()
    }

    /// Bind the host context that new surfaces and contexts are created against.
    pub async fn attach_host(&self, host: HostContext) {
        self.state.lock().await.gateway.attach(host);
    }

    /// Tear down everything tied to the host.
    ///
    /// Dismisses all sessions, cancels the event subscription and clears the
    /// default transfer destination before the host handle is released.
    /// Cached contexts survive. Returns the number of sessions dismissed.
    pub async fn detach_host(&self) -> usize {
        let mut state = self.state.lock().await;
        let dismissed = state.registry.hide_all();
        self.events.unsubscribe();
        state.router.clear();
        state.gateway.detach();
        drop(state);
        info!(dismissed, "Host detached, presentations released");
        dismissed
    }

    /// Counters for sessions, cached contexts and host state.
    pub async fn stats(&self) -> ManagerStats {
        let state = self.state.lock().await;
        ManagerStats {
            active_sessions: state.registry.len(),
            cached_contexts: state.cache.len(),
            host_attached: state.gateway.is_attached(),
            events_subscribed: self.events.is_subscribed(),
        }
    }

    /// Cached context tags, sorted.
    pub async fn cached_contexts(&self) -> Vec<String> {
        self.state.lock().await.cache.tags()
    }

    fn resolve_tag<'a>(&'a self, router_name: Option<&'a str>) -> &'a str {
        router_name
            .filter(|t| !t.is_empty())
            .unwrap_or(self.config.default_router_name.as_str())
    }
}

impl Drop for PresentationManager {
    fn drop(&mut self) {
        self.ready_pump.abort();
    }
}

/// Drain readiness signals into registry transitions and notifications.
async fn ready_pump(
    state: Weak<Mutex<ManagerState>>,
    mut ready_rx: mpsc::Receiver<ReadySignal>,
    notifications: mpsc::Sender<Notification>,
) {
    while let Some(signal) = ready_rx.recv().await {
        let Some(shared) = state.upgrade() else {
            break;
        };
        let transitioned = shared
            .lock()
            .await
            .registry
            .mark_ready_session(&signal.tag, signal.session_id);
        if transitioned {
            publish(&notifications, &signal.tag);
        }
    }
    debug!("Ready pump stopped");
}

fn publish(notifications: &mpsc::Sender<Notification>, tag: &str) {
    let notification = Notification::PresentationReady {
        router_name: tag.to_string(),
    };
    if let Err(e) = notifications.try_send(notification) {
        warn!(tag, error = %e, "Failed to deliver presentationReady");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::platform::sim::SimulatedPlatform;
    use crate::session::SessionState;
    use serde_json::json;

    async fn manager(sim: &SimulatedPlatform) -> (PresentationManager, mpsc::Receiver<Notification>) {
        let (manager, rx) = PresentationManager::new(sim.platform(), ManagerConfig::default());
        manager.attach_host(HostContext::new("app")).await;
        (manager, rx)
    }

    #[tokio::test]
    async fn show_reports_ready_once() {
        let sim = SimulatedPlatform::with_external_displays(1);
        let (manager, mut rx) = manager(&sim).await;

        let session = manager.show(1, "menu").await.unwrap();
        assert_eq!(session.display_id, 1);

        let notification = rx.recv().await.unwrap();
        assert_eq!(
            notification,
            Notification::PresentationReady {
                router_name: "menu".into()
            }
        );
        assert_eq!(manager.session("menu").await.unwrap().state, SessionState::Ready);
        assert!(!manager.mark_ready("menu").await);
    }

    #[tokio::test]
    async fn show_validates_before_touching_state() {
        let sim = SimulatedPlatform::with_external_displays(1);
        let (manager, _rx) = manager(&sim).await;

        assert!(matches!(
            manager.show(1, "").await,
            Err(ManagerError::InvalidArguments { .. })
        ));
        assert!(matches!(
            manager.show(42, "menu").await,
            Err(ManagerError::DisplayNotFound { display_id: 42 })
        ));
        assert_eq!(manager.stats().await.cached_contexts, 0);
    }

    #[tokio::test]
    async fn show_without_host_fails_context_creation() {
        let sim = SimulatedPlatform::with_external_displays(1);
        let (manager, _rx) = PresentationManager::new(sim.platform(), ManagerConfig::default());
        let err = manager.show(1, "menu").await.unwrap_err();
        assert!(matches!(
            err,
            ManagerError::ContextCreateFailed(ContextError::NoHostContext)
        ));
    }

    #[tokio::test]
    async fn prewarm_defaults_router_name() {
        let sim = SimulatedPlatform::new();
        let (manager, _rx) = manager(&sim).await;
        assert!(manager.prewarm(None).await.unwrap());
        assert!(manager.prewarm(Some("")).await.unwrap());
        assert_eq!(manager.cached_contexts().await, vec!["presentation"]);
        assert_eq!(sim.entrypoint_starts("presentation"), 1);
    }

    #[tokio::test]
    async fn detach_host_releases_sessions_but_keeps_contexts() {
        let sim = SimulatedPlatform::with_external_displays(2);
        let (manager, _rx) = manager(&sim).await;
        manager.show(1, "a").await.unwrap();
        manager.show(2, "b").await.unwrap();
        let _events = manager.subscribe_display_events();

        assert_eq!(manager.detach_host().await, 2);

        let stats = manager.stats().await;
        assert_eq!(stats.active_sessions, 0);
        assert_eq!(stats.cached_contexts, 2);
        assert!(!stats.host_attached);
        assert!(!stats.events_subscribed);
        assert_eq!(sim.listener_count(), 0);
        assert!(!manager.transfer(None, json!("late")).await);
    }

    #[tokio::test]
    async fn transfer_follows_last_show() {
        let sim = SimulatedPlatform::with_external_displays(2);
        let (manager, _rx) = manager(&sim).await;
        assert!(!manager.transfer(None, json!(1)).await);

        manager.show(1, "a").await.unwrap();
        manager.show(2, "b").await.unwrap();
        assert!(manager.transfer(None, json!({"n": 2})).await);
        assert!(manager.transfer(Some("a"), json!({"n": 3})).await);
        assert!(!manager.transfer(Some("zzz"), json!(null)).await);

        let tags: Vec<String> = sim.delivered().into_iter().map(|m| m.tag).collect();
        assert_eq!(tags, vec!["b", "a"]);
    }
}
