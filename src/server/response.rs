use std::io;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use super::request::{HeaderVec, HttpRequest};

/// Outbound HTTP response produced by a controller action, a filter or the
/// error handler.
///
/// String bodies are sent raw when the content type is `text/*`; every other
/// body, strings under a JSON or missing content type included, is serialized
/// as JSON.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    /// HTTP status code (200, 404, 500, etc.)
    pub status: u16,
    /// HTTP response headers
    pub headers: HeaderVec,
    /// Response body
    pub body: Value,
}

impl HttpResponse {
    #[must_use]
    pub fn new(status: u16, headers: HeaderVec, body: Value) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Create a JSON response with default headers
    #[must_use]
    pub fn json(status: u16, body: Value) -> Self {
        let mut headers = HeaderVec::new();
        headers.push((Arc::from("content-type"), "application/json".to_string()));
        Self::new(status, headers, body)
    }

    /// Create a plain-text response
    #[must_use]
    pub fn text(status: u16, body: impl Into<String>) -> Self {
        let mut headers = HeaderVec::new();
        headers.push((Arc::from("content-type"), "text/plain".to_string()));
        Self::new(status, headers, Value::String(body.into()))
    }

    /// Create an error response
    #[must_use]
    pub fn error(status: u16, message: &str) -> Self {
        Self::json(status, serde_json::json!({ "error": message }))
    }

    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Add or replace a header
    pub fn set_header(&mut self, name: &str, value: String) {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((Arc::from(name), value));
    }

    /// Body bytes as they go on the wire.
    ///
    /// # Errors
    ///
    /// Returns an error if a JSON body cannot be serialized.
    pub fn body_bytes(&self) -> serde_json::Result<Vec<u8>> {
        match &self.body {
            Value::String(s) if self.is_text() => Ok(s.clone().into_bytes()),
            other => serde_json::to_vec(other),
        }
    }

    /// Whether the content type is `text/*`.
    #[must_use]
    pub fn is_text(&self) -> bool {
        self.get_header("content-type")
            .is_some_and(|ct| ct.trim_start().to_ascii_lowercase().starts_with("text/"))
    }
}

#[must_use]
pub fn status_reason(status: u16) -> &'static str {
    http::StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("Unknown")
}

/// Writable response handle supplied by the transport.
pub trait ResponseWriter {
    /// Write one complete response.
    ///
    /// # Errors
    ///
    /// Returns the transport's IO error when the write fails.
    fn write_response(&mut self, response: HttpResponse) -> io::Result<()>;

    /// Whether the peer has already gone away.
    fn is_closed(&self) -> bool {
        false
    }
}

/// The request/response pair bound to one HTTP invocation.
///
/// Tracks whether a response was already written so that filters, the
/// controller and the error handler can never double-send.
pub struct HttpExchange<'a> {
    request: &'a HttpRequest,
    writer: &'a mut dyn ResponseWriter,
    sent: bool,
}

impl<'a> HttpExchange<'a> {
    pub fn new(request: &'a HttpRequest, writer: &'a mut dyn ResponseWriter) -> Self {
        Self {
            request,
            writer,
            sent: false,
        }
    }

    #[must_use]
    pub fn request(&self) -> &'a HttpRequest {
        self.request
    }

    /// Whether a response has been written (or abandoned on a closed connection).
    #[must_use]
    pub fn is_sent(&self) -> bool {
        self.sent
    }

    /// Send `response` unless one has already gone out.
    ///
    /// Returns `true` if the response reached the writer. Write failures are
    /// logged and swallowed; the invocation carries on to its lifecycle hooks.
    pub fn send(&mut self, response: HttpResponse) -> bool {
        if self.sent {
            warn!(
                path = %self.request.path(),
                status = response.status,
                "Response already sent - dropping duplicate"
            );
            return false;
        }
        self.sent = true;

        if self.writer.is_closed() {
            debug!(
                path = %self.request.path(),
                "Connection closed - skipping response write"
            );
            return false;
        }

        match self.writer.write_response(response) {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    path = %self.request.path(),
                    error = %e,
                    "Failed to write response"
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;

    #[derive(Default)]
    struct VecWriter {
        written: Vec<HttpResponse>,
        closed: bool,
    }

    impl ResponseWriter for VecWriter {
        fn write_response(&mut self, response: HttpResponse) -> io::Result<()> {
            self.written.push(response);
            Ok(())
        }

        fn is_closed(&self) -> bool {
            self.closed
        }
    }

    #[test]
    fn test_status_reason() {
        assert_eq!(status_reason(200), "OK");
        assert_eq!(status_reason(404), "Not Found");
        assert_eq!(status_reason(799), "Unknown");
    }

    #[test]
    fn test_exchange_sends_once() {
        let req = HttpRequest::new(Method::GET, "/");
        let mut writer = VecWriter::default();
        {
            let mut exchange = HttpExchange::new(&req, &mut writer);
            assert!(exchange.send(HttpResponse::text(200, "a")));
            assert!(!exchange.send(HttpResponse::text(500, "b")));
            assert!(exchange.is_sent());
        }
        assert_eq!(writer.written.len(), 1);
        assert_eq!(writer.written[0].status, 200);
    }

    #[test]
    fn test_exchange_skips_closed_connection() {
        let req = HttpRequest::new(Method::GET, "/");
        let mut writer = VecWriter {
            closed: true,
            ..Default::default()
        };
        {
            let mut exchange = HttpExchange::new(&req, &mut writer);
            assert!(!exchange.send(HttpResponse::text(200, "a")));
        }
        assert!(writer.written.is_empty());
    }

    #[test]
    fn test_body_bytes() {
        assert_eq!(HttpResponse::text(200, "hi").body_bytes().unwrap(), b"hi");
        assert_eq!(
            HttpResponse::json(200, serde_json::json!({"a": 1}))
                .body_bytes()
                .unwrap(),
            br#"{"a":1}"#
        );
    }

    #[test]
    fn test_json_string_body_is_quoted() {
        let res = HttpResponse::json(200, serde_json::json!("hello"));
        assert_eq!(res.body_bytes().unwrap(), br#""hello""#);
    }

    #[test]
    fn test_string_body_without_content_type_is_json() {
        let res = HttpResponse::new(200, HeaderVec::new(), Value::String("x".into()));
        assert!(!res.is_text());
        assert_eq!(res.body_bytes().unwrap(), br#""x""#);
    }

    #[test]
    fn test_html_body_is_raw() {
        let mut res = HttpResponse::text(200, "<p>hi</p>");
        res.set_header("content-type", "text/html".to_string());
        assert_eq!(res.body_bytes().unwrap(), b"<p>hi</p>");
    }
}
