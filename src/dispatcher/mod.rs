//! # Dispatcher Module
//!
//! Turns a resolved route into a controller invocation.
//!
//! ## Overview
//!
//! The controller dispatcher:
//! - Keeps a registry of controllers keyed by handler name (explicit
//!   replacement for a service locator; everything is wired at startup)
//! - Resolves a [`RouteMatch`](crate::router::RouteMatch) to a controller,
//!   action and bound parameters (`create_controller`)
//! - Invokes the action with panic recovery (`invoke`)
//!
//! ## Handler Registration
//!
//! ```rust
//! use brrtdispatch::dispatcher::{ActionTable, ControllerDispatcher};
//! use brrtdispatch::server::HttpResponse;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! let mut dispatcher = ControllerDispatcher::new();
//! dispatcher.register(
//!     "users",
//!     Arc::new(ActionTable::new("users").action("show", |call| {
//!         Ok(HttpResponse::json(200, json!({ "id": call.param("id") })))
//!     })),
//! );
//! ```
//!
//! ## Error Handling
//!
//! - Unknown handlers yield `ControllerNotFound`
//! - Unknown actions yield `ActionNotFound`
//! - Action panics are caught and become `ServiceInvocation` with code 500

mod core;

pub(crate) use core::panic_message;
pub use core::{
    ActionCall, ActionFn, ActionTable, Controller, ControllerDispatcher, ResolvedAction,
};
