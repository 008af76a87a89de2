//! Per-tag isolated execution contexts.

mod cache;

pub use cache::{ContextCache, ContextError, ExecutionContext};
