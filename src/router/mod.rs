//! # Router Module
//!
//! Resolves an inbound path and method to a [`RouteMatch`]: the route
//! pattern, the handler identifier, the action name and the bound path
//! parameters.
//!
//! The orchestrator only depends on the [`Router`] trait. [`PatternRouter`] is
//! the bundled implementation: each route pattern (e.g. `/users/{id}`) is
//! compiled to an anchored regex at startup and requests are tested against
//! the compiled table.
//!
//! ## Example
//!
//! ```rust
//! use brrtdispatch::router::{PatternRouter, RouteDef, Router};
//! use http::Method;
//!
//! let router = PatternRouter::new(vec![
//!     RouteDef::new(Method::GET, "/users/{id}", "users", "show"),
//! ])
//! .unwrap();
//!
//! let m = router.match_route(&Method::GET, "/users/42").unwrap();
//! assert_eq!(m.get_param("id"), Some("42"));
//! ```
//!
//! ## Performance
//!
//! - O(n) in the number of routes per lookup
//! - Parameter names are shared `Arc<str>` from the route table

mod core;
mod pattern;

pub use core::{ParamVec, RouteDef, RouteMatch, Router, MAX_INLINE_PARAMS};
pub use pattern::{PatternRouter, RouterError};
