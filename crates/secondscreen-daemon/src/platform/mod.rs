//! Platform seam: the collaborators the presentation manager drives but does
//! not implement.
//!
//! - [`DisplayService`] enumerates output surfaces and pushes hotplug changes.
//! - [`RuntimeFactory`] builds isolated runtimes that host secondary content.
//! - [`SurfaceFactory`] binds a runtime to a display as a presentation surface.
//!
//! [`sim`] provides an in-process implementation of all three.

pub mod sim;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use secondscreen_proto::DisplayDescriptor;

/// Category selecting only displays that advertise presentation support.
pub const DISPLAY_CATEGORY_PRESENTATION: &str = "android.hardware.display.category.PRESENTATION";

/// Short alias accepted for [`DISPLAY_CATEGORY_PRESENTATION`].
pub const DISPLAY_CATEGORY_PRESENTATION_ALIAS: &str = "presentation";

/// Display flag: the surface is suitable for presentations.
pub const FLAG_PRESENTATION: u32 = 1 << 3;

/// Returns true when `category` names the presentation category.
pub fn is_presentation_category(category: &str) -> bool {
    category == DISPLAY_CATEGORY_PRESENTATION
        || category.eq_ignore_ascii_case(DISPLAY_CATEGORY_PRESENTATION_ALIAS)
}

/// Opaque handle to the live host application context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostContext {
    id: String,
}

impl HostContext {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

/// Raw display power state as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayState {
    Unknown,
    Off,
    On,
    Doze,
}

/// Raw display record as reported by the platform.
#[derive(Debug, Clone, PartialEq)]
pub struct PlatformDisplay {
    pub id: i32,
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub density: f32,
    pub refresh_rate: f32,
    pub flags: u32,
    pub state: DisplayState,
}

impl PlatformDisplay {
    pub const fn supports_presentation(&self) -> bool {
        self.flags & FLAG_PRESENTATION != 0
    }
}

/// Hotplug change pushed by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayChange {
    Added(i32),
    Removed(i32),
    Changed(i32),
}

/// Callback registered with [`DisplayService::register_listener`].
pub type DisplayListener = Arc<dyn Fn(DisplayChange) + Send + Sync>;

/// Registration token returned by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// Read-only access to the platform display service.
pub trait DisplayService: Send + Sync {
    /// Id of the primary (built-in) surface.
    fn primary_display_id(&self) -> i32;

    /// Currently enumerable displays, optionally filtered by category.
    fn displays(&self, category: Option<&str>) -> Vec<PlatformDisplay>;

    /// Lookup of a single display by id.
    fn display(&self, id: i32) -> Option<PlatformDisplay>;

    /// Register a hotplug listener.
    fn register_listener(&self, listener: DisplayListener) -> ListenerId;

    /// Drop a listener registration. Unknown ids are ignored.
    fn unregister_listener(&self, id: ListenerId);
}

/// Errors reported by an isolated runtime.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("Runtime construction failed: {0}")]
    Construction(String),

    #[error("Entrypoint {entrypoint} failed to start: {reason}")]
    Entrypoint { entrypoint: String, reason: String },

    #[error("Surface detach failed: {0}")]
    Detach(String),
}

/// Errors reported by a context's RPC channel.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Channel closed")]
    Closed,

    #[error("Invocation of {method} failed: {reason}")]
    Invocation { method: String, reason: String },
}

/// Errors reported by a presentation surface.
#[derive(Debug, thiserror::Error)]
pub enum SurfaceError {
    #[error("Failed to create surface on display {display_id}: {reason}")]
    Create { display_id: i32, reason: String },

    #[error("Failed to show surface: {0}")]
    Show(String),

    #[error("Failed to dismiss surface: {0}")]
    Dismiss(String),
}

/// Opaque call channel into hosted content.
pub trait RpcChannel: Send + Sync {
    fn invoke(&self, method: &str, payload: Value) -> Result<(), ChannelError>;
}

/// A live isolated runtime hosting the content for one tag.
pub trait IsolatedRuntime: Send + Sync {
    /// Route the content should open on once started.
    fn set_initial_route(&self, route: &str);

    /// Begin executing content at `entrypoint`.
    fn execute_entrypoint(&self, entrypoint: &str) -> Result<(), RuntimeError>;

    /// Tell the runtime its host is in the foreground.
    fn notify_foreground(&self);

    /// Channel addressing the hosted content.
    fn channel(&self) -> Arc<dyn RpcChannel>;

    /// Detach hosted content from whatever surface it is rendering to.
    /// Must succeed (or fail harmlessly) when nothing is attached.
    fn detach_from_surface(&self) -> Result<(), RuntimeError>;

    /// Release the runtime. Called only for runtimes that never made it into the cache.
    fn destroy(&self);
}

/// Builds isolated runtimes.
#[async_trait]
pub trait RuntimeFactory: Send + Sync {
    async fn create_runtime(
        &self,
        host: &HostContext,
        tag: &str,
    ) -> Result<Arc<dyn IsolatedRuntime>, RuntimeError>;
}

/// A runtime bound to one display.
pub trait PresentationSurface: Send {
    /// Make the surface visible.
    fn show(&mut self) -> Result<(), SurfaceError>;

    /// Tear the surface down.
    fn dismiss(&mut self) -> Result<(), SurfaceError>;
}

/// Binds runtimes to displays.
pub trait SurfaceFactory: Send + Sync {
    fn create_surface(
        &self,
        host: &HostContext,
        display: &DisplayDescriptor,
        runtime: Arc<dyn IsolatedRuntime>,
        ready: ReadyNotifier,
    ) -> Result<Box<dyn PresentationSurface>, SurfaceError>;
}

/// The three platform collaborators bundled together.
#[derive(Clone)]
pub struct Platform {
    pub displays: Arc<dyn DisplayService>,
    pub runtimes: Arc<dyn RuntimeFactory>,
    pub surfaces: Arc<dyn SurfaceFactory>,
}

impl fmt::Debug for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Platform").finish_non_exhaustive()
    }
}

/// Readiness signal carried from a surface back to the manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadySignal {
    pub tag: String,
    pub session_id: u64,
}

/// Handed to each surface so its content can report that it has attached.
#[derive(Debug, Clone)]
pub struct ReadyNotifier {
    signal: ReadySignal,
    tx: mpsc::Sender<ReadySignal>,
}

impl ReadyNotifier {
    pub(crate) const fn new(signal: ReadySignal, tx: mpsc::Sender<ReadySignal>) -> Self {
        Self { signal, tx }
    }

    pub fn tag(&self) -> &str {
        &self.signal.tag
    }

    /// Best effort: a full or closed channel is logged, never retried.
    pub fn notify(&self) {
        match self.tx.try_send(self.signal.clone()) {
            Ok(()) => debug!(tag = %self.signal.tag, "Ready signal queued"),
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(tag = %self.signal.tag, "Ready channel full, dropping signal");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!(tag = %self.signal.tag, "Ready channel closed, manager gone");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presentation_category_aliases() {
        assert!(is_presentation_category(DISPLAY_CATEGORY_PRESENTATION));
        assert!(is_presentation_category("Presentation"));
        assert!(!is_presentation_category("vr"));
    }

    #[tokio::test]
    async fn notifier_delivers_and_tolerates_closed_channel() {
        let (tx, mut rx) = mpsc::channel(1);
        let notifier = ReadyNotifier::new(
            ReadySignal {
                tag: "menu".into(),
                session_id: 9,
            },
            tx,
        );
        notifier.notify();
        // Channel full: dropped with a warning, no panic.
        notifier.notify();
        let signal = rx.recv().await;
        assert_eq!(signal.map(|s| s.session_id), Some(9));

        drop(rx);
        notifier.notify();
    }
}
