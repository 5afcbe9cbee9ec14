use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use tracing::{error, info, warn};

use crate::context::RequestContext;
use crate::dispatcher::panic_message;
use crate::error::DispatchError;

/// A callable RPC function.
pub trait RpcService: Send + Sync {
    /// # Errors
    ///
    /// Returns any application error; its code and message become the
    /// error reply.
    fn call(&self, ctx: &RequestContext, args: Value) -> Result<Value, DispatchError>;
}

impl<F> RpcService for F
where
    F: Fn(&RequestContext, Value) -> Result<Value, DispatchError> + Send + Sync,
{
    fn call(&self, ctx: &RequestContext, args: Value) -> Result<Value, DispatchError> {
        self(ctx, args)
    }
}

/// Registry of RPC functions keyed by `func`.
#[derive(Clone, Default)]
pub struct RpcDispatcher {
    services: HashMap<String, Arc<dyn RpcService>>,
}

impl RpcDispatcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `service` under `func`, replacing any previous registration.
    pub fn register(&mut self, func: impl Into<String>, service: Arc<dyn RpcService>) {
        let func = func.into();
        if self.services.insert(func.clone(), service).is_some() {
            warn!(func = %func, "Replaced existing rpc service");
        } else {
            info!(
                func = %func,
                total_services = self.services.len(),
                "RPC service registered successfully"
            );
        }
    }

    /// Sorted list of registered function names.
    #[must_use]
    pub fn functions(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.services.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Run the service registered under `func`.
    ///
    /// # Errors
    ///
    /// `ServiceNotFound` for unknown functions; the service's own error; or a
    /// `ServiceInvocation` with code 500 if the service panicked.
    pub fn dispatch(
        &self,
        ctx: &RequestContext,
        func: &str,
        args: Value,
    ) -> Result<Value, DispatchError> {
        let service = self
            .services
            .get(func)
            .ok_or_else(|| DispatchError::service_not_found(func))?;

        let start = Instant::now();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            service.call(ctx, args)
        }));

        match result {
            Ok(outcome) => {
                info!(
                    trace_id = %ctx.trace_id(),
                    func = %func,
                    latency_ms = start.elapsed().as_millis() as u64,
                    ok = outcome.is_ok(),
                    "RPC service complete"
                );
                outcome
            }
            Err(panic) => {
                error!(
                    trace_id = %ctx.trace_id(),
                    func = %func,
                    panic_message = %panic_message(panic.as_ref()),
                    "RPC service panicked - CRITICAL"
                );
                Err(DispatchError::invocation(
                    500,
                    format!("rpc function '{func}' panicked"),
                ))
            }
        }
    }
}

impl fmt::Debug for RpcDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.functions()).finish()
    }
}
