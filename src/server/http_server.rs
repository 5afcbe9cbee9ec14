use std::io::{self, Read};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use http::Method;
use may::coroutine::JoinHandle;
use may_minihttp::{HttpService, Request, Response};
use serde_json::Value;
use tracing::{debug, trace, warn};

use super::request::HttpRequest;
use super::response::{status_reason, HttpResponse, ResponseWriter};
use crate::application::Application;
use crate::dispatcher::panic_message;

/// `may_minihttp` service that hands every request to [`Application::handle_http`].
#[derive(Clone)]
pub struct HttpEntry {
    app: Arc<Application>,
}

impl HttpEntry {
    #[must_use]
    pub fn new(app: Arc<Application>) -> Self {
        Self { app }
    }
}

impl HttpService for HttpEntry {
    fn call(&mut self, req: Request, res: &mut Response) -> io::Result<()> {
        let request = match to_http_request(req) {
            Some(r) => r,
            None => {
                res.status_code(400, "Bad Request");
                res.header("Content-Type: application/json");
                res.body_vec(br#"{"error":"Unsupported method"}"#.to_vec());
                return Ok(());
            }
        };

        let mut writer = MiniHttpWriter { res };
        self.app.handle_http(&request, &mut writer);
        Ok(())
    }
}

/// Convert a `may_minihttp` request into the transport-neutral [`HttpRequest`].
///
/// Returns `None` when the method token is not a valid HTTP method.
fn to_http_request(req: Request) -> Option<HttpRequest> {
    let method = Method::from_bytes(req.method().as_bytes()).ok()?;
    let mut request = HttpRequest::new(method, req.path());
    for h in req.headers().iter() {
        request = request.with_header(h.name, String::from_utf8_lossy(h.value).into_owned());
    }

    let mut raw = String::new();
    match req.body().read_to_string(&mut raw) {
        Ok(0) => {}
        Ok(size) => {
            let body = serde_json::from_str(&raw).unwrap_or(Value::String(raw));
            debug!(body_size_bytes = size, "Request body read");
            request = request.with_body(body);
        }
        Err(e) => debug!(error = %e, "Failed to read request body"),
    }
    Some(request)
}

/// [`ResponseWriter`] over a `may_minihttp` response buffer.
struct MiniHttpWriter<'r, 'a> {
    res: &'r mut Response<'a>,
}

impl ResponseWriter for MiniHttpWriter<'_, '_> {
    fn write_response(&mut self, response: HttpResponse) -> io::Result<()> {
        let body = response
            .body_bytes()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        self.res
            .status_code(response.status as usize, status_reason(response.status));
        for (name, value) in &response.headers {
            match wire_header(name, value) {
                Some(line) => {
                    self.res.header(line);
                }
                None => trace!(header = %name, "Header not forwarded by transport"),
            }
        }
        self.res.body_vec(body);
        Ok(())
    }
}

/// Map a response header onto one of the static header lines the transport
/// accepts.
fn wire_header(name: &str, value: &str) -> Option<&'static str> {
    match (name, value) {
        ("content-type", "application/json") => Some("Content-Type: application/json"),
        ("content-type", "text/plain") => Some("Content-Type: text/plain"),
        ("content-type", "text/html") => Some("Content-Type: text/html"),
        ("www-authenticate", "Bearer") => Some("WWW-Authenticate: Bearer"),
        ("cache-control", "no-store") => Some("Cache-Control: no-store"),
        _ => None,
    }
}

/// Panic text from a stopped server coroutine, if it died of a real panic.
///
/// Cancellation also unwinds the coroutine, but with a non-string payload;
/// that is the expected outcome of `stop` and yields `None`.
fn stop_panic_message(outcome: thread::Result<()>) -> Option<String> {
    let payload = outcome.err()?;
    if payload.is::<&str>() || payload.is::<String>() {
        Some(panic_message(payload.as_ref()))
    } else {
        None
    }
}

/// Wrapper around `may_minihttp`'s HTTP server.
pub struct HttpServer<T>(pub T);

/// Handle to a running server coroutine.
pub struct ServerHandle {
    addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl ServerHandle {
    pub(crate) fn new(addr: SocketAddr, handle: JoinHandle<()>) -> Self {
        Self { addr, handle }
    }

    #[must_use]
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Poll the bound address until it accepts TCP connections.
    ///
    /// # Errors
    ///
    /// `TimedOut` if the server is not reachable within ~250ms.
    pub fn wait_ready(&self) -> io::Result<()> {
        for _ in 0..50 {
            if TcpStream::connect(self.addr).is_ok() {
                return Ok(());
            }
            thread::sleep(Duration::from_millis(5));
        }
        Err(io::Error::new(io::ErrorKind::TimedOut, "server not ready"))
    }

    /// Cancel the server coroutine and wait for it to finish.
    pub fn stop(self) {
        // SAFETY: cancel() is unsafe in may; the handle is owned here and the
        // coroutine is not joined anywhere else.
        unsafe {
            self.handle.coroutine().cancel();
        }
        match stop_panic_message(self.handle.join()) {
            Some(message) => warn!(
                addr = %self.addr,
                panic_message = %message,
                "Server coroutine panicked before shutdown"
            ),
            None => debug!(addr = %self.addr, "Server coroutine stopped"),
        }
    }

    /// Block until the server coroutine exits.
    ///
    /// # Errors
    ///
    /// Returns the panic payload if the server coroutine panicked.
    pub fn join(self) -> thread::Result<()> {
        self.handle.join()
    }
}

impl<T: HttpService + Clone + Send + Sync + 'static> HttpServer<T> {
    /// Bind `addr` and start serving.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is invalid or cannot be bound.
    pub fn start<A: ToSocketAddrs>(self, addr: A) -> io::Result<ServerHandle> {
        let addr = addr
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "invalid address"))?;
        let handle = may_minihttp::HttpServer(self.0).start(addr)?;
        Ok(ServerHandle::new(addr, handle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_headers_map_to_static_lines() {
        assert_eq!(
            wire_header("content-type", "application/json"),
            Some("Content-Type: application/json")
        );
        assert_eq!(
            wire_header("www-authenticate", "Bearer"),
            Some("WWW-Authenticate: Bearer")
        );
    }

    #[test]
    fn dynamic_headers_are_not_forwarded() {
        assert_eq!(wire_header("x-trace-id", "01HZX"), None);
        assert_eq!(wire_header("content-type", "image/png"), None);
    }

    #[test]
    fn stop_reports_only_real_panics() {
        use std::any::Any;

        assert_eq!(stop_panic_message(Ok(())), None);

        let panicked: Box<dyn Any + Send> = Box::new("accept loop died");
        assert_eq!(
            stop_panic_message(Err(panicked)).as_deref(),
            Some("accept loop died")
        );

        let owned: Box<dyn Any + Send> = Box::new(String::from("bind lost"));
        assert_eq!(stop_panic_message(Err(owned)).as_deref(), Some("bind lost"));

        // Cancellation unwinds with a non-string payload.
        let cancelled: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(stop_panic_message(Err(cancelled)), None);
    }
}
