//! Method channel server.
//!
//! Exposes the presentation manager over newline-delimited JSON: one
//! `MethodCall` per input line, one `MethodResponse` per call, with
//! notifications and display events interleaved on the same output.

mod handler;
mod stdio;

pub use handler::{MethodHandler, Outbound};
pub use stdio::{run, serve};
