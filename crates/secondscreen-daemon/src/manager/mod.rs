//! Presentation manager: the single serialization point over the session
//! registry, context cache and data router.

mod presentation;
mod types;

pub use presentation::PresentationManager;
pub use types::{ManagerConfig, ManagerError, ManagerStats, Notification};
