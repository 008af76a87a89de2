//! `SecondScreen` Daemon Library
//!
//! Secondary display presentation sessions for a single host process:
//! - Display enumeration and hotplug events
//! - Per-tag execution context cache
//! - Session registry binding contexts to displays
//! - Data routing into hosted content
//! - NDJSON method channel server

pub mod context;
pub mod display;
pub mod events;
pub mod lifecycle;
pub mod manager;
pub mod platform;
pub mod router;
pub mod server;
pub mod session;
