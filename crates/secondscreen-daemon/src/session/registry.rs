//! Session registry.
//!
//! At most one live session per tag. Sessions are kept in insertion order so
//! "first session on display N" is deterministic. A dismissed session is
//! removed from the registry before its surface is torn down, so a failing
//! teardown can never leave an orphaned entry behind.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use secondscreen_proto::DisplayDescriptor;

use crate::context::ExecutionContext;
use crate::platform::{
    HostContext, ReadyNotifier, ReadySignal, SurfaceError, SurfaceFactory,
};

use super::types::{Session, SessionInfo, SessionState};

/// Tag → live presentation session.
pub struct SessionRegistry {
    sessions: Vec<Session>,
    surfaces: Arc<dyn SurfaceFactory>,
    ready_tx: mpsc::Sender<ReadySignal>,
    next_session_id: u64,
}

impl SessionRegistry {
    /// Create an empty registry whose surfaces report readiness on `ready_tx`.
    pub fn new(surfaces: Arc<dyn SurfaceFactory>, ready_tx: mpsc::Sender<ReadySignal>) -> Self {
        Self {
            sessions: Vec::new(),
            surfaces,
            ready_tx,
            next_session_id: 0,
        }
    }

    /// Project `context` onto `display`.
    ///
    /// Any existing session for the same tag is dismissed first; the newest
    /// show always wins. Returns once the surface has been told to display,
    /// without waiting for the content to attach. On failure no session for
    /// the tag remains.
    pub fn open(
        &mut self,
        host: &HostContext,
        display: &DisplayDescriptor,
        context: &ExecutionContext,
    ) -> Result<SessionInfo, SurfaceError> {
        let tag = context.tag();
        let display_id = display.display_id;
        if let Some(previous) = self.take_by_tag(tag) {
            info!(
                tag,
                previous_display = previous.display_id,
                display_id,
                "Replacing existing session"
            );
            dismiss(previous);
        }

        self.next_session_id += 1;
        let session_id = self.next_session_id;
        let notifier = ReadyNotifier::new(
            ReadySignal {
                tag: tag.to_string(),
                session_id,
            },
            self.ready_tx.clone(),
        );
        let surface =
            self.surfaces
                .create_surface(host, display, Arc::clone(context.runtime()), notifier)?;

        let mut session = Session {
            session_id,
            tag: tag.to_string(),
            display_id,
            state: SessionState::Showing,
            created_at: Instant::now(),
            runtime: Arc::clone(context.runtime()),
            surface,
        };
        if let Err(e) = session.surface.show() {
            warn!(tag, display_id, error = %e, "Surface failed to show");
            dismiss(session);
            return Err(e);
        }

        let snapshot = session.info();
        self.sessions.push(session);
        info!(tag, display_id, session_id, "Presentation showing");
        Ok(snapshot)
    }

    /// Mark the live session for `tag` as Ready.
    ///
    /// Returns true only on the Showing → Ready transition. Unknown tags are
    /// a no-op: the content may report after its session was dismissed.
    pub fn mark_ready(&mut self, tag: &str) -> bool {
        self.mark_ready_where(tag, None)
    }

    /// Like [`Self::mark_ready`], but ignores signals from an earlier session
    /// of the same tag.
    pub fn mark_ready_session(&mut self, tag: &str, session_id: u64) -> bool {
        self.mark_ready_where(tag, Some(session_id))
    }

    fn mark_ready_where(&mut self, tag: &str, session_id: Option<u64>) -> bool {
        let Some(session) = self.sessions.iter_mut().find(|s| s.tag == tag) else {
            debug!(tag, "Ready signal for unknown session ignored");
            return false;
        };
        if session_id.is_some_and(|id| id != session.session_id) {
            debug!(tag, stale = ?session_id, current = session.session_id, "Stale ready signal ignored");
            return false;
        }
        if session.state != SessionState::Showing {
            debug!(tag, state = session.state.as_str(), "Ready signal ignored");
            return false;
        }
        session.state = SessionState::Ready;
        info!(tag, display_id = session.display_id, "Presentation ready");
        true
    }

    /// Dismiss by tag and/or display id.
    ///
    /// 1. both given: only a session matching both is dismissed;
    /// 2. tag only: that tag's session;
    /// 3. display only: the first session (insertion order) on that display;
    /// 4. neither: every session.
    ///
    /// Returns true iff at least one session was dismissed.
    pub fn hide(&mut self, display_id: Option<i32>, tag: Option<&str>) -> bool {
        match (display_id, tag) {
            (Some(display_id), Some(tag)) => {
                let Some(bound) = self.sessions.iter().find(|s| s.tag == tag).map(|s| s.display_id)
                else {
                    debug!(tag, display_id, "No session to hide");
                    return false;
                };
                if bound != display_id {
                    warn!(
                        tag,
                        requested_display = display_id,
                        bound_display = bound,
                        "Hide target mismatch, nothing dismissed"
                    );
                    return false;
                }
                self.take_by_tag(tag).map(dismiss).is_some()
            }
            (None, Some(tag)) => {
                let found = self.take_by_tag(tag).map(dismiss).is_some();
                if !found {
                    debug!(tag, "No session to hide");
                }
                found
            }
            (Some(display_id), None) => {
                let Some(index) = self.sessions.iter().position(|s| s.display_id == display_id)
                else {
                    debug!(display_id, "No session on display");
                    return false;
                };
                dismiss(self.sessions.remove(index));
                true
            }
            (None, None) => self.hide_all() > 0,
        }
    }

    /// Dismiss every live session. Returns how many were dismissed.
    pub fn hide_all(&mut self) -> usize {
        let sessions = std::mem::take(&mut self.sessions);
        let count = sessions.len();
        for session in sessions {
            dismiss(session);
        }
        if count > 0 {
            info!(count, "Dismissed all presentations");
        }
        count
    }

    /// Tags with a live session, in insertion order.
    pub fn list_active(&self) -> Vec<String> {
        self.sessions.iter().map(|s| s.tag.clone()).collect()
    }

    /// Snapshot of the live session for `tag`.
    pub fn session(&self, tag: &str) -> Option<SessionInfo> {
        self.sessions.iter().find(|s| s.tag == tag).map(Session::info)
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// True when no session is live.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn take_by_tag(&mut self, tag: &str) -> Option<Session> {
        let index = self.sessions.iter().position(|s| s.tag == tag)?;
        Some(self.sessions.remove(index))
    }
}

/// Tear down a session that is already out of the registry.
///
/// Detach and surface failures are logged and swallowed.
fn dismiss(mut session: Session) -> SessionInfo {
    if let Err(e) = session.runtime.detach_from_surface() {
        warn!(tag = %session.tag, error = %e, "Detach from surface failed, continuing dismissal");
    }
    if let Err(e) = session.surface.dismiss() {
        warn!(tag = %session.tag, error = %e, "Surface dismiss failed, continuing dismissal");
    }
    session.state = SessionState::Dismissed;
    info!(
        tag = %session.tag,
        display_id = session.display_id,
        session_id = session.session_id,
        "Presentation dismissed"
    );
    session.info()
}
