#![allow(dead_code)]

/// In-memory transports that record what the orchestrator writes.
pub mod recorders {
    use brrtdispatch::{ConnectionId, HttpResponse, ResponseWriter, RpcConnection, RpcResult};
    use std::io;

    /// Captures every HTTP response written.
    #[derive(Default)]
    pub struct RecordingWriter {
        pub responses: Vec<HttpResponse>,
        pub closed: bool,
    }

    impl RecordingWriter {
        pub fn closed() -> Self {
            Self {
                responses: Vec::new(),
                closed: true,
            }
        }

        pub fn single(&self) -> &HttpResponse {
            assert_eq!(self.responses.len(), 1, "expected exactly one response");
            &self.responses[0]
        }
    }

    impl ResponseWriter for RecordingWriter {
        fn write_response(&mut self, response: HttpResponse) -> io::Result<()> {
            self.responses.push(response);
            Ok(())
        }

        fn is_closed(&self) -> bool {
            self.closed
        }
    }

    /// Fails every write.
    #[derive(Default)]
    pub struct BrokenWriter {
        pub attempts: usize,
    }

    impl ResponseWriter for BrokenWriter {
        fn write_response(&mut self, _response: HttpResponse) -> io::Result<()> {
            self.attempts += 1;
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "peer went away"))
        }
    }

    /// Captures every RPC reply with the connection id it was addressed to.
    #[derive(Default)]
    pub struct RecordingConnection {
        pub replies: Vec<(ConnectionId, Vec<u8>)>,
    }

    impl RecordingConnection {
        /// Decode reply `idx` as an `RpcResult`.
        pub fn result(&self, idx: usize) -> RpcResult {
            serde_json::from_slice(&self.replies[idx].1).expect("reply is an RpcResult")
        }

        /// Decode reply `idx` as raw JSON.
        pub fn json(&self, idx: usize) -> serde_json::Value {
            serde_json::from_slice(&self.replies[idx].1).expect("reply is JSON")
        }
    }

    impl RpcConnection for RecordingConnection {
        fn send(&mut self, id: ConnectionId, payload: &[u8]) -> io::Result<()> {
            self.replies.push((id, payload.to_vec()));
            Ok(())
        }
    }
}

/// Collaborators that count or log how the orchestrator drives them.
pub mod doubles {
    use brrtdispatch::error_handler::ErrorHandler;
    use brrtdispatch::router::{PatternRouter, RouteDef, RouteMatch, Router};
    use brrtdispatch::server::HttpExchange;
    use brrtdispatch::{DispatchError, HttpResponse, LifecycleEvent, RequestContext};
    use http::Method;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// One observed hook call.
    #[derive(Debug, Clone, PartialEq)]
    pub struct HookCall {
        pub event: LifecycleEvent,
        pub trace_id: String,
        pub target: String,
    }

    /// Shared log a hook closure appends to.
    #[derive(Clone, Default)]
    pub struct HookLog(pub Arc<Mutex<Vec<HookCall>>>);

    impl HookLog {
        pub fn hook(&self) -> impl Fn(LifecycleEvent, &RequestContext) + Send + Sync + 'static {
            let log = Arc::clone(&self.0);
            move |event, ctx| {
                log.lock().unwrap().push(HookCall {
                    event,
                    trace_id: ctx.trace_id().to_string(),
                    target: ctx.target().to_string(),
                });
            }
        }

        pub fn calls(&self) -> Vec<HookCall> {
            self.0.lock().unwrap().clone()
        }

        pub fn count(&self, event: LifecycleEvent) -> usize {
            self.calls().iter().filter(|c| c.event == event).count()
        }
    }

    /// Delegates to a `PatternRouter` while counting `match_route` calls.
    pub struct CountingRouter {
        inner: PatternRouter,
        pub calls: Arc<AtomicUsize>,
    }

    impl CountingRouter {
        pub fn new(routes: Vec<RouteDef>) -> (Self, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            (
                Self {
                    inner: PatternRouter::new(routes).unwrap(),
                    calls: Arc::clone(&calls),
                },
                calls,
            )
        }
    }

    impl Router for CountingRouter {
        fn match_route(&self, method: &Method, uri: &str) -> Option<RouteMatch> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.match_route(method, uri)
        }
    }

    /// Records each error it is asked to render, then sends a JSON error.
    #[derive(Clone, Default)]
    pub struct CountingErrorHandler {
        pub seen: Arc<Mutex<Vec<(i32, String)>>>,
    }

    impl CountingErrorHandler {
        pub fn seen(&self) -> Vec<(i32, String)> {
            self.seen.lock().unwrap().clone()
        }
    }

    impl ErrorHandler for CountingErrorHandler {
        fn handle(&self, _ctx: &RequestContext, error: &DispatchError, exchange: &mut HttpExchange<'_>) {
            self.seen
                .lock()
                .unwrap()
                .push((error.code(), error.to_string()));
            exchange.send(HttpResponse::error(error.status(), &error.to_string()));
        }
    }

    /// Counts filter executions.
    pub fn counting_filter(
        counter: Arc<AtomicUsize>,
    ) -> impl Fn(&mut RequestContext, &brrtdispatch::HttpRequest) -> Option<HttpResponse> + Send + Sync + 'static
    {
        move |_ctx, _req| {
            counter.fetch_add(1, Ordering::SeqCst);
            None
        }
    }
}

/// Ready-made application wiring for the integration tests.
pub mod fixtures {
    use brrtdispatch::dispatcher::ActionTable;
    use brrtdispatch::router::RouteDef;
    use brrtdispatch::{DispatchError, HttpResponse, RequestContext};
    use http::Method;
    use serde_json::{json, Value};

    pub fn user_routes() -> Vec<RouteDef> {
        vec![
            RouteDef::new(Method::GET, "/users/{id}", "users", "show"),
            RouteDef::new(Method::GET, "/users/{id}/boom", "users", "boom"),
            RouteDef::new(Method::GET, "/ghosts/{id}", "ghosts", "show"),
            RouteDef::new(Method::GET, "/users/{id}/missing", "users", "missing"),
        ]
    }

    /// `users` controller: `show` echoes the id, `boom` fails with code 409.
    pub fn users_controller() -> ActionTable {
        ActionTable::new("users")
            .action("show", |call| {
                Ok(HttpResponse::json(
                    200,
                    json!({
                        "id": call.param("id"),
                        "trace_id": call.ctx.trace_id(),
                        "target": call.ctx.target(),
                    }),
                ))
            })
            .action("boom", |_call| Err(DispatchError::invocation(409, "conflict")))
    }

    pub fn user_get(_ctx: &RequestContext, _args: Value) -> Result<Value, DispatchError> {
        Ok(json!({ "name": "a" }))
    }

    pub fn user_fail(_ctx: &RequestContext, _args: Value) -> Result<Value, DispatchError> {
        Err(DispatchError::invocation(1001, "user missing"))
    }

    /// Echoes the context the service observed.
    pub fn whoami(ctx: &RequestContext, _args: Value) -> Result<Value, DispatchError> {
        Ok(json!({
            "trace_id": ctx.trace_id(),
            "span_id": ctx.span_id(),
            "target": ctx.target(),
        }))
    }
}
