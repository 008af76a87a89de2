//! In-process simulated platform.
//!
//! Backs the daemon binary when no real display stack is present and every
//! test in this crate. Displays can be hot-plugged at runtime, runtimes record
//! entrypoint starts and channel traffic, and individual steps can be made to
//! fail.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, info};

use secondscreen_proto::DisplayDescriptor;

use super::{
    ChannelError, DisplayChange, DisplayListener, DisplayService, DisplayState, FLAG_PRESENTATION,
    HostContext, IsolatedRuntime, ListenerId, Platform, PlatformDisplay, PresentationSurface,
    ReadyNotifier, RpcChannel, RuntimeError, RuntimeFactory, SurfaceError, SurfaceFactory,
    is_presentation_category,
};

/// Id of the simulated built-in display.
pub const PRIMARY_DISPLAY_ID: i32 = 0;

/// A payload delivered over a simulated runtime channel.
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveredMessage {
    pub tag: String,
    pub method: String,
    pub payload: Value,
}

#[derive(Default)]
struct SimState {
    displays: BTreeMap<i32, PlatformDisplay>,
    next_display_id: i32,
    listeners: HashMap<u64, DisplayListener>,
    next_listener_id: u64,
    entrypoint_starts: HashMap<String, usize>,
    runtimes_created: usize,
    runtimes_destroyed: usize,
    delivered: Vec<DeliveredMessage>,
    failing_starts: HashSet<String>,
    fail_detach: bool,
    fail_surface_show: bool,
    fail_channel: bool,
    manual_ready: bool,
    visible_surfaces: HashMap<String, i32>,
    pending_ready: HashMap<String, ReadyNotifier>,
}

/// Simulated display service, runtime factory and surface factory.
#[derive(Clone)]
pub struct SimulatedPlatform {
    state: Arc<Mutex<SimState>>,
}

impl Default for SimulatedPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedPlatform {
    /// A platform with only the built-in display connected.
    pub fn new() -> Self {
        let mut state = SimState {
            next_display_id: PRIMARY_DISPLAY_ID + 1,
            ..SimState::default()
        };
        state.displays.insert(
            PRIMARY_DISPLAY_ID,
            PlatformDisplay {
                id: PRIMARY_DISPLAY_ID,
                name: "Built-in Screen".to_string(),
                width: 1080,
                height: 2400,
                density: 2.75,
                refresh_rate: 120.0,
                flags: 0,
                state: DisplayState::On,
            },
        );
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// A platform with the built-in display plus `count` external monitors.
    pub fn with_external_displays(count: u32) -> Self {
        let platform = Self::new();
        for n in 1..=count {
            platform.connect_display(&format!("External Monitor {n}"));
        }
        platform
    }

    /// Bundle this simulation as the manager's [`Platform`].
    pub fn platform(&self) -> Platform {
        Platform {
            displays: Arc::new(self.clone()),
            runtimes: Arc::new(self.clone()),
            surfaces: Arc::new(self.clone()),
        }
    }

    /// Plug in a 1080p presentation-capable monitor and notify listeners.
    pub fn connect_display(&self, name: &str) -> i32 {
        let id = {
            let mut state = self.state.lock();
            let id = state.next_display_id;
            state.next_display_id += 1;
            state.displays.insert(
                id,
                PlatformDisplay {
                    id,
                    name: name.to_string(),
                    width: 1920,
                    height: 1080,
                    density: 1.0,
                    refresh_rate: 60.0,
                    flags: FLAG_PRESENTATION,
                    state: DisplayState::On,
                },
            );
            id
        };
        info!(display_id = id, name, "Simulated display connected");
        self.fire(DisplayChange::Added(id));
        id
    }

    /// Unplug a display. Returns false if it was not connected.
    pub fn disconnect_display(&self, id: i32) -> bool {
        let removed = self.state.lock().displays.remove(&id).is_some();
        if removed {
            info!(display_id = id, "Simulated display disconnected");
            self.fire(DisplayChange::Removed(id));
        }
        removed
    }

    /// Change a display's power state.
    pub fn set_display_state(&self, id: i32, display_state: DisplayState) -> bool {
        let changed = match self.state.lock().displays.get_mut(&id) {
            Some(display) => {
                display.state = display_state;
                true
            }
            None => false,
        };
        if changed {
            self.fire(DisplayChange::Changed(id));
        }
        changed
    }

    /// Remove every display, including the built-in one.
    pub fn clear_displays(&self) {
        self.state.lock().displays.clear();
    }

    pub fn fail_start_for(&self, tag: &str) {
        self.state.lock().failing_starts.insert(tag.to_string());
    }

    pub fn set_fail_detach(&self, fail: bool) {
        self.state.lock().fail_detach = fail;
    }

    pub fn set_fail_surface_show(&self, fail: bool) {
        self.state.lock().fail_surface_show = fail;
    }

    pub fn set_fail_channel(&self, fail: bool) {
        self.state.lock().fail_channel = fail;
    }

    /// When set, surfaces do not report readiness on their own; the content
    /// must be attached with [`Self::attach_content`].
    pub fn set_manual_ready(&self, manual: bool) {
        self.state.lock().manual_ready = manual;
    }

    /// How many times the entrypoint was started for `tag`.
    pub fn entrypoint_starts(&self, tag: &str) -> usize {
        self.state
            .lock()
            .entrypoint_starts
            .get(tag)
            .copied()
            .unwrap_or(0)
    }

    pub fn runtimes_created(&self) -> usize {
        self.state.lock().runtimes_created
    }

    pub fn runtimes_destroyed(&self) -> usize {
        self.state.lock().runtimes_destroyed
    }

    pub fn listener_count(&self) -> usize {
        self.state.lock().listeners.len()
    }

    /// Display currently showing `tag`, if any.
    pub fn visible_on(&self, tag: &str) -> Option<i32> {
        self.state.lock().visible_surfaces.get(tag).copied()
    }

    /// Report readiness for the latest surface shown for `tag` while
    /// manual-ready mode was on. Returns false if nothing is pending.
    pub fn attach_content(&self, tag: &str) -> bool {
        let pending = self.state.lock().pending_ready.remove(tag);
        let Some(notifier) = pending else {
            return false;
        };
        notifier.notify();
        true
    }

    /// Everything delivered over runtime channels, in order.
    pub fn delivered(&self) -> Vec<DeliveredMessage> {
        self.state.lock().delivered.clone()
    }

    fn fire(&self, change: DisplayChange) {
        // Snapshot so listeners run without the state lock held.
        let listeners: Vec<DisplayListener> =
            self.state.lock().listeners.values().cloned().collect();
        for listener in listeners {
            listener(change);
        }
    }
}

impl DisplayService for SimulatedPlatform {
    fn primary_display_id(&self) -> i32 {
        PRIMARY_DISPLAY_ID
    }

    fn displays(&self, category: Option<&str>) -> Vec<PlatformDisplay> {
        let presentation_only = category.is_some_and(is_presentation_category);
        self.state
            .lock()
            .displays
            .values()
            .filter(|d| !presentation_only || d.supports_presentation())
            .cloned()
            .collect()
    }

    fn display(&self, id: i32) -> Option<PlatformDisplay> {
        self.state.lock().displays.get(&id).cloned()
    }

    fn register_listener(&self, listener: DisplayListener) -> ListenerId {
        let mut state = self.state.lock();
        state.next_listener_id += 1;
        let id = state.next_listener_id;
        state.listeners.insert(id, listener);
        debug!(listener_id = id, "Display listener registered");
        ListenerId(id)
    }

    fn unregister_listener(&self, id: ListenerId) {
        if self.state.lock().listeners.remove(&id.0).is_some() {
            debug!(listener_id = id.0, "Display listener unregistered");
        }
    }
}

#[async_trait]
impl RuntimeFactory for SimulatedPlatform {
    async fn create_runtime(
        &self,
        host: &HostContext,
        tag: &str,
    ) -> Result<Arc<dyn IsolatedRuntime>, RuntimeError> {
        self.state.lock().runtimes_created += 1;
        debug!(host = host.id(), tag, "Creating simulated runtime");
        Ok(Arc::new(SimRuntime {
            tag: tag.to_string(),
            state: Arc::clone(&self.state),
            route: Mutex::new(None),
            foreground: AtomicBool::new(false),
        }))
    }
}

impl SurfaceFactory for SimulatedPlatform {
    fn create_surface(
        &self,
        _host: &HostContext,
        display: &DisplayDescriptor,
        _runtime: Arc<dyn IsolatedRuntime>,
        ready: ReadyNotifier,
    ) -> Result<Box<dyn PresentationSurface>, SurfaceError> {
        if !self.state.lock().displays.contains_key(&display.display_id) {
            return Err(SurfaceError::Create {
                display_id: display.display_id,
                reason: "display vanished".to_string(),
            });
        }
        Ok(Box::new(SimSurface {
            display_id: display.display_id,
            ready,
            state: Arc::clone(&self.state),
            visible: false,
        }))
    }
}

struct SimRuntime {
    tag: String,
    state: Arc<Mutex<SimState>>,
    route: Mutex<Option<String>>,
    foreground: AtomicBool,
}

impl IsolatedRuntime for SimRuntime {
    fn set_initial_route(&self, route: &str) {
        *self.route.lock() = Some(route.to_string());
    }

    fn execute_entrypoint(&self, entrypoint: &str) -> Result<(), RuntimeError> {
        let mut state = self.state.lock();
        if state.failing_starts.contains(&self.tag) {
            return Err(RuntimeError::Entrypoint {
                entrypoint: entrypoint.to_string(),
                reason: format!("simulated start failure for {}", self.tag),
            });
        }
        *state.entrypoint_starts.entry(self.tag.clone()).or_default() += 1;
        debug!(tag = %self.tag, entrypoint, route = ?self.route.lock(), "Entrypoint started");
        Ok(())
    }

    fn notify_foreground(&self) {
        self.foreground.store(true, Ordering::Release);
    }

    fn channel(&self) -> Arc<dyn RpcChannel> {
        Arc::new(SimChannel {
            tag: self.tag.clone(),
            state: Arc::clone(&self.state),
        })
    }

    fn detach_from_surface(&self) -> Result<(), RuntimeError> {
        let mut state = self.state.lock();
        if state.fail_detach {
            return Err(RuntimeError::Detach(format!(
                "simulated detach failure for {}",
                self.tag
            )));
        }
        state.visible_surfaces.remove(&self.tag);
        Ok(())
    }

    fn destroy(&self) {
        self.state.lock().runtimes_destroyed += 1;
    }
}

struct SimChannel {
    tag: String,
    state: Arc<Mutex<SimState>>,
}

impl RpcChannel for SimChannel {
    fn invoke(&self, method: &str, payload: Value) -> Result<(), ChannelError> {
        let mut state = self.state.lock();
        if state.fail_channel {
            return Err(ChannelError::Invocation {
                method: method.to_string(),
                reason: "simulated channel failure".to_string(),
            });
        }
        state.delivered.push(DeliveredMessage {
            tag: self.tag.clone(),
            method: method.to_string(),
            payload,
        });
        Ok(())
    }
}

struct SimSurface {
    display_id: i32,
    ready: ReadyNotifier,
    state: Arc<Mutex<SimState>>,
    visible: bool,
}

impl PresentationSurface for SimSurface {
    fn show(&mut self) -> Result<(), SurfaceError> {
        let manual = {
            let mut state = self.state.lock();
            if state.fail_surface_show {
                return Err(SurfaceError::Show(format!(
                    "simulated show failure on display {}",
                    self.display_id
                )));
            }
            state
                .visible_surfaces
                .insert(self.ready.tag().to_string(), self.display_id);
            if state.manual_ready {
                state
                    .pending_ready
                    .insert(self.ready.tag().to_string(), self.ready.clone());
            }
            state.manual_ready
        };
        self.visible = true;
        if !manual {
            self.ready.notify();
        }
        Ok(())
    }

    fn dismiss(&mut self) -> Result<(), SurfaceError> {
        if self.visible {
            let mut state = self.state.lock();
            if state.visible_surfaces.get(self.ready.tag()) == Some(&self.display_id) {
                state.visible_surfaces.remove(self.ready.tag());
            }
            self.visible = false;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn starts_with_primary_only() {
        let sim = SimulatedPlatform::new();
        let displays = sim.displays(None);
        assert_eq!(displays.len(), 1);
        assert_eq!(displays[0].id, PRIMARY_DISPLAY_ID);
        assert!(sim.displays(Some("presentation")).is_empty());
    }

    #[test]
    fn hotplug_reaches_listeners_until_unregistered() {
        let sim = SimulatedPlatform::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let id = sim.register_listener(Arc::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        let display = sim.connect_display("Projector");
        assert!(sim.disconnect_display(display));
        assert!(!sim.disconnect_display(display));
        assert_eq!(hits.load(Ordering::SeqCst), 2);

        sim.unregister_listener(id);
        sim.connect_display("Projector");
        assert_eq!(hits.load(Ordering::SeqCst), 2);
        assert_eq!(sim.listener_count(), 0);
    }

    #[test]
    fn external_displays_get_fresh_ids() {
        let sim = SimulatedPlatform::with_external_displays(2);
        let ids: Vec<i32> = sim.displays(None).iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![0, 1, 2]);
    }
}
