//! Session registry: which tag is projected onto which display.

mod registry;
mod types;

pub use registry::SessionRegistry;
pub use types::{SessionInfo, SessionState};
