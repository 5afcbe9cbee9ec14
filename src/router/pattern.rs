use http::Method;
use regex::Regex;
use std::cmp::Reverse;
use std::sync::Arc;
use tracing::{debug, info};

use super::core::{ParamVec, RouteDef, RouteMatch, Router};

/// Why a route table was refused.
#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    #[error("invalid route pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// Two routes share a method and path shape, so the later one could never match.
    #[error("duplicate route: {method} {pattern} (shadowed by {existing})")]
    DuplicateRoute {
        method: Method,
        pattern: String,
        existing: String,
    },
}

/// Regex-backed route table.
///
/// Patterns are compiled once at construction and tried most specific first:
/// more segments before fewer, then, position by position, a literal segment
/// before a `{param}` one, so `/users/me` wins over `/users/{id}`. Ties keep
/// registration order, which keeps matching deterministic.
#[derive(Clone, Debug)]
pub struct PatternRouter {
    /// method, compiled regex, route, param names
    routes: Vec<(Method, Regex, RouteDef, Vec<Arc<str>>)>,
}

impl PatternRouter {
    /// Build a router from route definitions.
    ///
    /// # Errors
    ///
    /// `InvalidPattern` if a pattern compiles to an invalid regex;
    /// `DuplicateRoute` if two routes share a method and path shape
    /// (`/users/{id}` and `/users/{uid}` count as the same shape).
    pub fn new(routes: Vec<RouteDef>) -> Result<Self, RouterError> {
        let mut routes = routes;
        // Stable, so equally specific routes keep registration order
        routes.sort_by_cached_key(|r| specificity(&r.pattern));

        let mut table: Vec<(Method, Regex, RouteDef, Vec<Arc<str>>)> =
            Vec::with_capacity(routes.len());
        for route in routes {
            let (regex, param_names) =
                Self::path_to_regex(&route.pattern).map_err(|source| {
                    RouterError::InvalidPattern {
                        pattern: route.pattern.clone(),
                        source,
                    }
                })?;
            if let Some((_, _, existing, _)) = table
                .iter()
                .find(|(m, r, _, _)| *m == route.method && r.as_str() == regex.as_str())
            {
                return Err(RouterError::DuplicateRoute {
                    method: route.method.clone(),
                    pattern: route.pattern.clone(),
                    existing: existing.pattern.clone(),
                });
            }
            table.push((route.method.clone(), regex, route, param_names));
        }

        info!(routes_count = table.len(), "Routing table loaded");
        Ok(Self { routes: table })
    }

    /// An empty table; every lookup misses.
    #[must_use]
    pub fn empty() -> Self {
        Self { routes: Vec::new() }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub(crate) fn path_to_regex(path: &str) -> Result<(Regex, Vec<Arc<str>>), regex::Error> {
        if path == "/" {
            return Ok((Regex::new(r"^/$")?, Vec::new()));
        }

        let mut pattern = String::with_capacity(path.len() + 5);
        pattern.push('^');
        let mut param_names = Vec::with_capacity(path.matches('{').count());

        for segment in path.split('/') {
            if segment.starts_with('{') && segment.ends_with('}') {
                let param_name = segment.trim_start_matches('{').trim_end_matches('}');
                pattern.push_str("/([^/]+)");
                param_names.push(Arc::from(param_name));
            } else if !segment.is_empty() {
                pattern.push('/');
                pattern.push_str(&regex::escape(segment));
            }
        }

        pattern.push('$');
        Ok((Regex::new(&pattern)?, param_names))
    }
}

impl Router for PatternRouter {
    fn match_route(&self, method: &Method, uri: &str) -> Option<RouteMatch> {
        for (m, regex, route, param_names) in &self.routes {
            if m != method {
                continue;
            }
            if let Some(captures) = regex.captures(uri) {
                let mut params = ParamVec::new();
                for (i, name) in param_names.iter().enumerate() {
                    if let Some(val) = captures.get(i + 1) {
                        params.push((Arc::clone(name), val.as_str().to_string()));
                    }
                }
                debug!(
                    method = %method,
                    uri = %uri,
                    pattern = %route.pattern,
                    handler = %route.handler,
                    "Route matched"
                );
                return Some(RouteMatch {
                    path: route.pattern.clone(),
                    handler: Arc::clone(&route.handler),
                    action: route.action.clone(),
                    params,
                });
            }
        }
        None
    }

    fn routes(&self) -> Vec<RouteDef> {
        self.routes.iter().map(|(_, _, r, _)| r.clone()).collect()
    }
}

/// Sort key: more segments first, then literal segments before `{param}` ones.
fn specificity(pattern: &str) -> (Reverse<usize>, Vec<bool>) {
    let kinds: Vec<bool> = pattern
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| segment.starts_with('{') && segment.ends_with('}'))
        .collect();
    (Reverse(kinds.len()), kinds)
}
