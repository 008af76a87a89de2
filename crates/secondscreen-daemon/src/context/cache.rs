//! Context cache: one isolated runtime per tag, created lazily.
//!
//! Contexts outlive their sessions. Hiding a presentation detaches the
//! surface but keeps the runtime here so the next show for the same tag does
//! not pay start-up again.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::platform::{HostContext, IsolatedRuntime, RpcChannel, RuntimeError, RuntimeFactory};

/// A started runtime addressed by tag.
#[derive(Clone)]
pub struct ExecutionContext {
    tag: String,
    runtime: Arc<dyn IsolatedRuntime>,
    channel: Arc<dyn RpcChannel>,
    started: bool,
    created_at: Instant,
}

impl ExecutionContext {
    /// Key this context is cached under.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// The isolated runtime hosting the content.
    pub fn runtime(&self) -> &Arc<dyn IsolatedRuntime> {
        &self.runtime
    }

    /// Call channel into the hosted content.
    pub fn channel(&self) -> &Arc<dyn RpcChannel> {
        &self.channel
    }

    /// True once the entrypoint has been executed.
    pub const fn is_started(&self) -> bool {
        self.started
    }

    /// When the context was first created.
    pub const fn created_at(&self) -> Instant {
        self.created_at
    }

    /// True when both handles point at the same runtime.
    pub fn same_runtime(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.runtime, &other.runtime)
    }
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("tag", &self.tag)
            .field("started", &self.started)
            .finish_non_exhaustive()
    }
}

/// Errors from context creation.
#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    #[error("No host application context is attached")]
    NoHostContext,

    #[error("Context tag must not be empty")]
    EmptyTag,

    #[error("Failed to start context {tag}: {source}")]
    StartFailed {
        tag: String,
        #[source]
        source: RuntimeError,
    },

    #[error("Context {tag} did not start within {timeout:?}")]
    StartTimeout { tag: String, timeout: Duration },
}

/// Memoizes one [`ExecutionContext`] per tag.
pub struct ContextCache {
    contexts: HashMap<String, ExecutionContext>,
    factory: Arc<dyn RuntimeFactory>,
    entrypoint: String,
    start_timeout: Duration,
}

impl ContextCache {
    /// Empty cache building contexts through `factory`.
    pub fn new(factory: Arc<dyn RuntimeFactory>, entrypoint: String, start_timeout: Duration) -> Self {
        Self {
            contexts: HashMap::new(),
            factory,
            entrypoint,
            start_timeout,
        }
    }

    /// Return the cached context for `tag`, creating and starting it first
    /// if needed.
    ///
    /// An existing context is returned untouched, with or without a host.
    /// A context whose start fails is destroyed and never cached.
    pub async fn get_or_create(
        &mut self,
        tag: &str,
        host: Option<&HostContext>,
    ) -> Result<ExecutionContext, ContextError> {
        if let Some(existing) = self.contexts.get(tag) {
            debug!(tag, "Reusing cached context");
            return Ok(existing.clone());
        }
        if tag.trim().is_empty() {
            return Err(ContextError::EmptyTag);
        }
        let host = host.ok_or(ContextError::NoHostContext)?;

        let context = match tokio::time::timeout(self.start_timeout, self.start(tag, host)).await {
            Ok(result) => result?,
            Err(_) => {
                warn!(tag, timeout = ?self.start_timeout, "Context start timed out");
                return Err(ContextError::StartTimeout {
                    tag: tag.to_string(),
                    timeout: self.start_timeout,
                });
            }
        };

        self.contexts.insert(tag.to_string(), context.clone());
        info!(tag, entrypoint = %self.entrypoint, "Created execution context");
        Ok(context)
    }

    async fn start(&self, tag: &str, host: &HostContext) -> Result<ExecutionContext, ContextError> {
        let start_failed = |source| ContextError::StartFailed {
            tag: tag.to_string(),
            source,
        };

        let runtime = self
            .factory
            .create_runtime(host, tag)
            .await
            .map_err(start_failed)?;
        runtime.set_initial_route(tag);
        if let Err(e) = runtime.execute_entrypoint(&self.entrypoint) {
            warn!(tag, error = %e, "Entrypoint failed, discarding runtime");
            runtime.destroy();
            return Err(start_failed(e));
        }
        runtime.notify_foreground();

        let channel = runtime.channel();
        Ok(ExecutionContext {
            tag: tag.to_string(),
            runtime,
            channel,
            started: true,
            created_at: Instant::now(),
        })
    }

    /// Read-only lookup.
    pub fn get(&self, tag: &str) -> Option<&ExecutionContext> {
        self.contexts.get(tag)
    }

    /// True when a context is cached for `tag`.
    pub fn contains(&self, tag: &str) -> bool {
        self.contexts.contains_key(tag)
    }

    /// Number of cached contexts.
    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    /// True when no context is cached.
    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }

    /// Cached tags, sorted.
    pub fn tags(&self) -> Vec<String> {
        let mut tags: Vec<String> = self.contexts.keys().cloned().collect();
        tags.sort();
        tags
    }
}
