//! # brrtdispatch
//!
//! Request-dispatch core for a server that accepts both HTTP requests and
//! length-prefixed binary RPC calls on the `may` coroutine runtime.
//!
//! ## Overview
//!
//! For every inbound invocation the [`Application`] orchestrator:
//!
//! 1. builds a per-invocation [`RequestContext`] (trace id, span id, target,
//!    start time, profiling spans)
//! 2. fires lifecycle hooks around the invocation
//! 3. resolves a handler: a router plus controller registry for HTTP, or a
//!    function name lookup for RPC
//! 4. runs an HTTP filter chain that may reject the request
//! 5. turns any error into a well-formed response or [`RpcResult`]
//!
//! There is no global state. The context is an explicit value passed down
//! the call chain, so concurrent invocations never observe each other.
//!
//! ## Architecture
//!
//! - **[`application`]** - the orchestrator and its builder
//! - **[`context`]** - per-invocation context and profiling spans
//! - **[`router`]** - HTTP route matching with path parameters
//! - **[`dispatcher`]** - controller registry and action invocation
//! - **[`filter`]** - pre-controller filter chain
//! - **[`rpc`]** - envelope, result, codec, framing and function registry
//! - **[`hooks`]** - `BEFORE_REQUEST` / `AFTER_REQUEST` observers
//! - **[`error`]** / **[`error_handler`]** - error taxonomy and HTTP error rendering
//! - **[`server`]** - transport types plus the `may_minihttp` and TCP listeners
//! - **[`config`]**, **[`logging`]**, **[`cli`]** - process plumbing
//!
//! ## Quick Start
//!
//! ```rust
//! use brrtdispatch::{Application, HttpRequest, HttpResponse, ResponseWriter};
//! use brrtdispatch::dispatcher::ActionTable;
//! use brrtdispatch::router::{PatternRouter, RouteDef};
//! use http::Method;
//! use serde_json::json;
//!
//! struct Collect(Vec<HttpResponse>);
//! impl ResponseWriter for Collect {
//!     fn write_response(&mut self, r: HttpResponse) -> std::io::Result<()> {
//!         self.0.push(r);
//!         Ok(())
//!     }
//! }
//!
//! let router = PatternRouter::new(vec![
//!     RouteDef::new(Method::GET, "/users/{id}", "users", "show"),
//! ]).unwrap();
//!
//! let users = ActionTable::new("users").action("show", |call| {
//!     Ok(HttpResponse::json(200, json!({ "id": call.param("id") })))
//! });
//!
//! let app = Application::builder()
//!     .router(router)
//!     .controller("users", users)
//!     .build();
//!
//! let mut out = Collect(Vec::new());
//! app.handle_http(&HttpRequest::new(Method::GET, "/users/42"), &mut out);
//! assert_eq!(out.0[0].body, json!({ "id": "42" }));
//! ```

pub mod application;
pub mod cli;
pub mod config;
pub mod context;
pub mod dispatcher;
pub mod echo;
pub mod error;
pub mod error_handler;
pub mod filter;
pub mod hooks;
pub mod ids;
pub mod logging;
pub mod router;
pub mod rpc;
pub mod server;

pub use application::{Application, ApplicationBuilder};
pub use context::{ContextSeed, RequestContext};
pub use error::DispatchError;
pub use hooks::LifecycleEvent;
pub use rpc::{RpcEnvelope, RpcResult, RpcStatus};
pub use server::{ConnectionId, HttpRequest, HttpResponse, ResponseWriter, RpcConnection};
