//! Dispatcher core module - hot path for controller dispatch.
//!
//! # JSF Compliance (Rule 206)
//!
//! This module is part of the request hot path. Allocations are limited to
//! error construction, which is off the fast path.

#![deny(clippy::inefficient_to_string)]
#![deny(clippy::format_push_string)]
#![deny(clippy::unnecessary_to_owned)]

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, info, warn};

use crate::context::RequestContext;
use crate::error::DispatchError;
use crate::router::{ParamVec, RouteMatch};
use crate::server::{HttpRequest, HttpResponse};

/// Everything an action receives for one invocation.
#[derive(Clone, Copy)]
pub struct ActionCall<'a> {
    pub ctx: &'a RequestContext,
    pub request: &'a HttpRequest,
    pub params: &'a ParamVec,
}

impl<'a> ActionCall<'a> {
    /// Get a bound path parameter by name ("last write wins")
    #[inline]
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&'a str> {
        self.params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }
}

/// A handler that owns a set of named actions.
pub trait Controller: Send + Sync {
    /// Run `action` with the bound parameters.
    ///
    /// # Errors
    ///
    /// Returns `ActionNotFound` for unknown actions, or any error the action
    /// itself raises.
    fn run(&self, action: &str, call: ActionCall<'_>) -> Result<HttpResponse, DispatchError>;
}

/// Boxed action function stored in an [`ActionTable`].
pub type ActionFn =
    dyn Fn(ActionCall<'_>) -> Result<HttpResponse, DispatchError> + Send + Sync;

/// Controller assembled from closures keyed by action name.
#[derive(Clone)]
pub struct ActionTable {
    name: Arc<str>,
    actions: HashMap<String, Arc<ActionFn>>,
}

impl ActionTable {
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            actions: HashMap::new(),
        }
    }

    #[must_use]
    pub fn action<F>(mut self, action: &str, f: F) -> Self
    where
        F: Fn(ActionCall<'_>) -> Result<HttpResponse, DispatchError> + Send + Sync + 'static,
    {
        self.actions.insert(action.to_string(), Arc::new(f));
        self
    }
}

impl Controller for ActionTable {
    fn run(&self, action: &str, call: ActionCall<'_>) -> Result<HttpResponse, DispatchError> {
        match self.actions.get(action) {
            Some(f) => f(call),
            None => Err(DispatchError::action_not_found(self.name.as_ref(), action)),
        }
    }
}

/// A route resolved to a live controller instance.
pub struct ResolvedAction {
    pub handler: Arc<str>,
    pub controller: Arc<dyn Controller>,
    pub action: String,
    pub params: ParamVec,
}

impl fmt::Debug for ResolvedAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedAction")
            .field("handler", &self.handler)
            .field("action", &self.action)
            .field("params", &self.params)
            .finish()
    }
}

/// Resolves route handlers to controllers and invokes their actions.
///
/// Controllers are registered up front and shared read-only by every
/// invocation.
#[derive(Clone, Default)]
pub struct ControllerDispatcher {
    controllers: HashMap<Arc<str>, Arc<dyn Controller>>,
}

impl ControllerDispatcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a controller under a handler name.
    ///
    /// **IMPORTANT**: If a controller with the same name already exists, it
    /// is replaced.
    pub fn register(&mut self, handler: impl Into<Arc<str>>, controller: Arc<dyn Controller>) {
        let handler = handler.into();
        if self.controllers.insert(Arc::clone(&handler), controller).is_some() {
            warn!(handler_name = %handler, "Replaced existing controller");
        } else {
            info!(
                handler_name = %handler,
                total_handlers = self.controllers.len(),
                "Controller registered successfully"
            );
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.controllers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.controllers.is_empty()
    }

    /// Look up the controller for a route match.
    ///
    /// # Errors
    ///
    /// Returns `ControllerNotFound` if no controller is registered for the
    /// route's handler.
    pub fn create_controller(&self, route: RouteMatch) -> Result<ResolvedAction, DispatchError> {
        let RouteMatch {
            handler,
            action,
            params,
            ..
        } = route;

        debug!(
            handler_name = %handler,
            available_handlers = self.controllers.len(),
            "Controller lookup"
        );

        let controller = match self.controllers.get(&handler) {
            Some(c) => Arc::clone(c),
            None => {
                let available: Vec<&str> = self.controllers.keys().map(|k| k.as_ref()).collect();
                error!(
                    handler_name = %handler,
                    available_handlers = ?available,
                    "Controller not found"
                );
                return Err(DispatchError::controller_not_found(handler.as_ref()));
            }
        };

        Ok(ResolvedAction {
            handler,
            controller,
            action,
            params,
        })
    }

    /// Invoke the resolved action.
    ///
    /// A panicking action is caught and reported as a `ServiceInvocation`
    /// error with code 500 so it cannot take down the worker coroutine.
    ///
    /// # Errors
    ///
    /// Propagates the action's error, or the converted panic.
    pub fn invoke(
        &self,
        resolved: &ResolvedAction,
        ctx: &RequestContext,
        request: &HttpRequest,
    ) -> Result<HttpResponse, DispatchError> {
        let call = ActionCall {
            ctx,
            request,
            params: &resolved.params,
        };

        info!(
            trace_id = %ctx.trace_id(),
            handler_name = %resolved.handler,
            action = %resolved.action,
            path_params = ?resolved.params,
            "Handler execution start"
        );
        let execution_start = Instant::now();

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            resolved.controller.run(&resolved.action, call)
        }));

        match result {
            Ok(outcome) => {
                info!(
                    trace_id = %ctx.trace_id(),
                    handler_name = %resolved.handler,
                    execution_time_ms = execution_start.elapsed().as_millis() as u64,
                    ok = outcome.is_ok(),
                    "Handler execution complete"
                );
                outcome
            }
            Err(panic) => {
                let panic_message = panic_message(panic.as_ref());
                error!(
                    trace_id = %ctx.trace_id(),
                    handler_name = %resolved.handler,
                    panic_message = %panic_message,
                    "Handler panicked - CRITICAL"
                );
                Err(DispatchError::invocation(
                    500,
                    format!("handler '{}' panicked", resolved.handler),
                ))
            }
        }
    }
}

/// Best-effort text of a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

impl fmt::Debug for ControllerDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.controllers.keys()).finish()
    }
}
