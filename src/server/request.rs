use std::sync::Arc;

use http::Method;
use serde_json::Value;
use smallvec::SmallVec;

use crate::router::ParamVec;

/// Maximum inline headers before heap allocation
/// Most requests have ≤16 headers (JSF: no heap in hot path)
pub const MAX_INLINE_HEADERS: usize = 16;

/// Stack-allocated header storage for the hot path.
///
/// Header names are stored lowercase as `Arc<str>`; values stay `String` as
/// they are per-request data.
pub type HeaderVec = SmallVec<[(Arc<str>, String); MAX_INLINE_HEADERS]>;

/// Header carrying a caller-supplied trace id.
pub const TRACE_ID_HEADER: &str = "x-trace-id";
/// Header carrying a caller-supplied span id.
pub const SPAN_ID_HEADER: &str = "x-span-id";

/// Inbound HTTP request handed to the orchestrator by the transport.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// HTTP method (GET, POST, etc.)
    pub method: Method,
    /// Request target as received, including any query string
    pub uri: String,
    /// HTTP headers (lowercase names)
    pub headers: HeaderVec,
    /// Parsed query string parameters
    pub query_params: ParamVec,
    /// Parsed JSON body (if present and valid)
    pub body: Option<Value>,
}

impl HttpRequest {
    /// Create a request; query parameters are parsed from `uri`.
    #[must_use]
    pub fn new(method: Method, uri: impl Into<String>) -> Self {
        let uri = uri.into();
        let query_params = parse_query_params(&uri);
        Self {
            method,
            uri,
            headers: HeaderVec::new(),
            query_params,
            body: None,
        }
    }

    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers
            .push((Arc::from(name.to_ascii_lowercase()), value.into()));
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Path component of the request target (everything before `?`).
    #[must_use]
    pub fn path(&self) -> &str {
        match self.uri.split_once('?') {
            Some((path, _)) => path,
            None => &self.uri,
        }
    }

    /// Get a header by name (case-insensitive per RFC 7230)
    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Get a query parameter by name
    ///
    /// Uses "last write wins" semantics: `?limit=10&limit=20` yields `20`.
    #[inline]
    #[must_use]
    pub fn get_query_param(&self, name: &str) -> Option<&str> {
        self.query_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Parse query string parameters from a request target
///
/// Extracts everything after the `?` character and URL-decodes parameter names and values.
#[must_use]
pub fn parse_query_params(uri: &str) -> ParamVec {
    match uri.split_once('?') {
        Some((_, query)) => url::form_urlencoded::parse(query.as_bytes())
            .map(|(k, v)| (Arc::from(k.as_ref()), v.into_owned()))
            .collect(),
        None => ParamVec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_query_params() {
        let q = parse_query_params("/p?x=1&y=hello%20world");
        assert_eq!(q.len(), 2);
        assert_eq!(q[0].0.as_ref(), "x");
        assert_eq!(q[1].1, "hello world");
    }

    #[test]
    fn test_path_strips_query() {
        let req = HttpRequest::new(Method::GET, "/users/42?debug=true");
        assert_eq!(req.path(), "/users/42");
        assert_eq!(req.get_query_param("debug"), Some("true"));
    }

    #[test]
    fn test_headers_are_case_insensitive() {
        let req = HttpRequest::new(Method::GET, "/").with_header("X-Trace-Id", "abc");
        assert_eq!(req.get_header(TRACE_ID_HEADER), Some("abc"));
    }
}
