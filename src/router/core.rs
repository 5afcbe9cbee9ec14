//! Router contract - hot path for request routing.
//!
//! # JSF Compliance (Rule 206)
//!
//! Matching is part of the request hot path; parameters are stored in
//! `SmallVec` so the common case does not allocate a map.

#![deny(clippy::inefficient_to_string)]
#![deny(clippy::format_push_string)]

use http::Method;
use smallvec::SmallVec;
use std::sync::Arc;

/// Maximum number of path/query parameters before heap allocation.
/// Most REST APIs have ≤4 path params (e.g., /users/{id}/posts/{postId}).
pub const MAX_INLINE_PARAMS: usize = 8;

/// Stack-allocated, ordered parameter storage.
///
/// Param names use `Arc<str>` because they come from the static route table;
/// values are per-request data from the URL.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// A route registered with a router: method + path pattern bound to a
/// handler and one of its actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteDef {
    pub method: Method,
    /// Path pattern, `{name}` segments capture parameters (e.g. `/users/{id}`)
    pub pattern: String,
    /// Opaque handler identifier, resolved by the controller registry
    pub handler: Arc<str>,
    /// Action invoked on the handler
    pub action: String,
}

impl RouteDef {
    pub fn new(
        method: Method,
        pattern: impl Into<String>,
        handler: impl Into<Arc<str>>,
        action: impl Into<String>,
    ) -> Self {
        Self {
            method,
            pattern: pattern.into(),
            handler: handler.into(),
            action: action.into(),
        }
    }
}

/// Result of successfully matching a request path to a route
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch {
    /// The matched route pattern
    pub path: String,
    /// Opaque handler identifier
    pub handler: Arc<str>,
    /// Action to invoke on the handler
    pub action: String,
    /// Path parameters in pattern order (e.g., `{id}` → `("id", "123")`)
    pub params: ParamVec,
}

impl RouteMatch {
    /// Get a path parameter by name
    ///
    /// Uses "last write wins" semantics: if duplicate parameter names exist
    /// at different path depths (e.g., `/org/{id}/team/{team_id}/user/{id}`),
    /// returns the last occurrence (the user id, not the org id).
    #[inline]
    #[must_use]
    pub fn get_param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Resolves a path and method to a route.
///
/// Implementations are shared by every concurrent invocation and must be safe
/// for concurrent reads without locking. Resolution must be deterministic:
/// the same `(method, uri)` always resolves the same way for a given table.
pub trait Router: Send + Sync {
    /// Match `uri` (path only, no query string) for `method`.
    fn match_route(&self, method: &Method, uri: &str) -> Option<RouteMatch>;

    /// Routes known to this router, for diagnostics.
    fn routes(&self) -> Vec<RouteDef> {
        Vec::new()
    }
}

impl<R: Router + ?Sized> Router for Arc<R> {
    fn match_route(&self, method: &Method, uri: &str) -> Option<RouteMatch> {
        (**self).match_route(method, uri)
    }

    fn routes(&self) -> Vec<RouteDef> {
        (**self).routes()
    }
}
