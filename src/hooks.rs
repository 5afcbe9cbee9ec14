//! Lifecycle hooks fired by the orchestrator.
//!
//! Hooks are plain callbacks registered in order and invoked synchronously.
//! `BeforeRequest` fires once per HTTP invocation before routing.
//! `AfterRequest` fires once per HTTP or RPC invocation after dispatch,
//! whether it succeeded or failed. Hooks cannot cancel an invocation.

use std::fmt;
use std::sync::Arc;

use tracing::error;

use crate::context::RequestContext;
use crate::dispatcher::panic_message;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleEvent {
    BeforeRequest,
    AfterRequest,
}

impl LifecycleEvent {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BeforeRequest => "before_request",
            Self::AfterRequest => "after_request",
        }
    }
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Callback signature for lifecycle hooks.
pub type HookFn = dyn Fn(LifecycleEvent, &RequestContext) + Send + Sync;

/// Ordered list of lifecycle callbacks.
#[derive(Clone, Default)]
pub struct LifecycleHooks {
    hooks: Vec<Arc<HookFn>>,
}

impl LifecycleHooks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a hook; hooks run in registration order.
    pub fn register<F>(&mut self, hook: F)
    where
        F: Fn(LifecycleEvent, &RequestContext) + Send + Sync + 'static,
    {
        self.hooks.push(Arc::new(hook));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Invoke every hook for `event`.
    ///
    /// A panicking hook is logged and skipped so the remaining hooks, and the
    /// response write that follows, still run.
    pub fn trigger(&self, event: LifecycleEvent, ctx: &RequestContext) {
        for (idx, hook) in self.hooks.iter().enumerate() {
            if let Err(panic) =
                std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| hook(event, ctx)))
            {
                error!(
                    trace_id = %ctx.trace_id(),
                    event = %event,
                    hook_idx = idx,
                    panic_message = %panic_message(panic.as_ref()),
                    "Lifecycle hook panicked"
                );
            }
        }
    }
}

impl fmt::Debug for LifecycleHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleHooks")
            .field("hooks", &self.hooks.len())
            .finish()
    }
}
