//! # Application
//!
//! The orchestrator that owns both entry points:
//!
//! - [`Application::handle_http`] - one HTTP request: context, `BEFORE_REQUEST`,
//!   route match, controller resolution, filter chain, action, response,
//!   `AFTER_REQUEST`
//! - [`Application::handle_rpc`] - one RPC packet: decode, context, service
//!   call, encode, `AFTER_REQUEST`, reply
//!
//! Every error raised inside an invocation, panics from collaborators
//! included, is caught at its entry point and turned into a well-formed
//! response, so a failing invocation never affects
//! other invocations running concurrently against the same `Application`.
//!
//! ## Request Handling Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant T as Transport
//!     participant A as Application
//!     participant R as Router
//!     participant D as ControllerDispatcher
//!     participant F as FilterChain
//!     participant E as ErrorHandler
//!
//!     T->>A: handle_http(request, writer)
//!     A->>A: RequestContext::init + BEFORE_REQUEST
//!     A->>R: match_route(method, uri)  [router.match]
//!     alt no route
//!         A->>E: handle(RouteNotFound)
//!     else matched
//!         A->>D: create_controller(route)
//!         A->>F: do_filter  [filter]
//!         alt approved
//!             A->>D: invoke(action, params)
//!             A->>T: send response
//!         end
//!     end
//!     A->>A: AFTER_REQUEST
//! ```
//!
//! `BEFORE_REQUEST` is only fired on the HTTP path.

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::context::{ContextSeed, RequestContext, RPC_FALLBACK_TARGET};
use crate::dispatcher::{panic_message, Controller, ControllerDispatcher};
use crate::error::DispatchError;
use crate::error_handler::{ErrorHandler, JsonErrorHandler};
use crate::filter::{FilterChain, OrderedFilterChain};
use crate::hooks::{LifecycleEvent, LifecycleHooks};
use crate::router::{PatternRouter, Router};
use crate::rpc::{JsonCodec, RpcCodec, RpcDispatcher, RpcResult, RpcService};
use crate::server::{
    ConnectionId, HttpExchange, HttpRequest, HttpResponse, ResponseWriter, RpcConnection,
    SPAN_ID_HEADER, TRACE_ID_HEADER,
};

/// Path browsers request on their own; answered without routing.
pub const FAVICON_PATH: &str = "/favicon.ico";
/// Placeholder body written for [`FAVICON_PATH`].
pub const FAVICON_BODY: &str = "favicon.ico";

/// Profiling span around route resolution.
pub const ROUTER_MATCH_SPAN: &str = "router.match";
/// Profiling span around filter chain execution.
pub const FILTER_SPAN: &str = "filter";

/// Reply used if even the error result cannot be encoded.
const ENCODE_FAILURE_REPLY: &[u8] =
    br#"{"status":"error","code":500,"message":"failed to encode rpc result","data":null}"#;

/// Request-dispatch core shared by every concurrent invocation.
///
/// All collaborators are read-only after construction; the only mutable
/// state is the diagnostic request counter, which is atomic.
pub struct Application {
    router: Arc<dyn Router>,
    filters: Arc<dyn FilterChain>,
    controllers: ControllerDispatcher,
    services: RpcDispatcher,
    codec: Arc<dyn RpcCodec>,
    error_handler: Arc<dyn ErrorHandler>,
    hooks: LifecycleHooks,
    request_count: AtomicU64,
}

impl Application {
    #[must_use]
    pub fn builder() -> ApplicationBuilder {
        ApplicationBuilder::default()
    }

    /// Number of HTTP invocations handled so far (favicon requests excluded).
    #[must_use]
    pub fn request_count(&self) -> u64 {
        self.request_count.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn router(&self) -> &dyn Router {
        self.router.as_ref()
    }

    #[must_use]
    pub fn services(&self) -> &RpcDispatcher {
        &self.services
    }

    /// Handle one HTTP request, writing exactly one response to `writer`.
    ///
    /// A panic anywhere between routing and the error handler is caught and
    /// answered with a 500; `AFTER_REQUEST` fires either way.
    pub fn handle_http(&self, request: &HttpRequest, writer: &mut dyn ResponseWriter) {
        if request.path() == FAVICON_PATH {
            if writer.is_closed() {
                debug!("Connection closed - skipping favicon placeholder");
            } else if let Err(e) = writer.write_response(HttpResponse::text(200, FAVICON_BODY)) {
                debug!(error = %e, "Failed to write favicon placeholder");
            }
            return;
        }

        let mut ctx = RequestContext::init(http_seed(request));
        let mut exchange = HttpExchange::new(request, writer);

        self.request_count.fetch_add(1, Ordering::Relaxed);
        self.hooks.trigger(LifecycleEvent::BeforeRequest, &ctx);

        let outcome = catch_unwind(AssertUnwindSafe(|| {
            self.run_controller(&mut ctx, &mut exchange)
        }))
        .unwrap_or_else(|panic| {
            error!(
                trace_id = %ctx.trace_id(),
                uri = %request.path(),
                panic_message = %panic_message(panic.as_ref()),
                "HTTP pipeline panicked - CRITICAL"
            );
            Err(DispatchError::invocation(500, "request pipeline panicked"))
        });

        if let Err(err) = outcome {
            self.handle_http_error(&ctx, &err, &mut exchange);
        }

        info!(
            trace_id = %ctx.trace_id(),
            method = %request.method,
            uri = %request.path(),
            responded = exchange.is_sent(),
            latency_ms = ctx.elapsed().as_millis() as u64,
            "HTTP request complete"
        );

        self.hooks.trigger(LifecycleEvent::AfterRequest, &ctx);
    }

    /// Hand `err` to the error handler once, unless a response already went out.
    fn handle_http_error(
        &self,
        ctx: &RequestContext,
        err: &DispatchError,
        exchange: &mut HttpExchange<'_>,
    ) {
        if exchange.is_sent() {
            warn!(
                trace_id = %ctx.trace_id(),
                code = err.code(),
                error = %err,
                "Error raised after response was sent"
            );
            return;
        }

        let handled = catch_unwind(AssertUnwindSafe(|| {
            self.error_handler.handle(ctx, err, exchange);
        }));
        if let Err(panic) = handled {
            error!(
                trace_id = %ctx.trace_id(),
                panic_message = %panic_message(panic.as_ref()),
                "Error handler panicked - CRITICAL"
            );
            if !exchange.is_sent() {
                exchange.send(HttpResponse::error(500, "internal server error"));
            }
        }
    }

    /// Resolve the route and controller, then run it behind the filter chain.
    fn run_controller(
        &self,
        ctx: &mut RequestContext,
        exchange: &mut HttpExchange<'_>,
    ) -> Result<(), DispatchError> {
        let request = exchange.request();
        let uri = request.path();
        let method = &request.method;

        ctx.profile_start(ROUTER_MATCH_SPAN);
        let matched = self.router.match_route(method, uri);
        ctx.profile_end(ROUTER_MATCH_SPAN);

        let route = matched.ok_or_else(|| DispatchError::route_not_found(uri, method.as_str()))?;
        let resolved = self.controllers.create_controller(route)?;

        ctx.profile_start(FILTER_SPAN);
        let approved = self.filters.do_filter(ctx, exchange);
        ctx.profile_end(FILTER_SPAN);

        if !approved {
            debug!(
                trace_id = %ctx.trace_id(),
                uri = %uri,
                "Filter chain rejected request"
            );
            return Ok(());
        }

        let response = self.controllers.invoke(&resolved, ctx, request)?;
        exchange.send(response);
        Ok(())
    }

    /// Handle one RPC packet and write the encoded reply to `conn`.
    ///
    /// The reply is always a well-formed [`RpcResult`]; application errors
    /// never abort the connection.
    pub fn handle_rpc(&self, conn: &mut dyn RpcConnection, id: ConnectionId, payload: &[u8]) {
        let mut slot = None;
        let outcome = catch_unwind(AssertUnwindSafe(|| self.run_service(payload, &mut slot)))
            .unwrap_or_else(|panic| {
                error!(
                    connection = %id,
                    panic_message = %panic_message(panic.as_ref()),
                    "RPC pipeline panicked - CRITICAL"
                );
                Err(DispatchError::invocation(500, "rpc pipeline panicked"))
            });
        let ctx = slot.unwrap_or_else(fallback_rpc_context);

        let reply = match outcome {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(
                    trace_id = %ctx.trace_id(),
                    func = %ctx.target(),
                    connection = %id,
                    code = err.code(),
                    error = %err,
                    "RPC call failed"
                );
                self.encode_error(&err)
            }
        };

        self.hooks.trigger(LifecycleEvent::AfterRequest, &ctx);
        self.send_rpc(conn, id, &ctx, &reply);
    }

    /// Reply with an error result for a failure detected before a packet
    /// could be read, such as an oversize frame.
    pub fn reply_rpc_error(&self, conn: &mut dyn RpcConnection, id: ConnectionId, err: &DispatchError) {
        let ctx = fallback_rpc_context();
        warn!(
            trace_id = %ctx.trace_id(),
            connection = %id,
            code = err.code(),
            error = %err,
            "RPC frame rejected"
        );
        let reply = self.encode_error(err);
        self.hooks.trigger(LifecycleEvent::AfterRequest, &ctx);
        self.send_rpc(conn, id, &ctx, &reply);
    }

    /// Decode, seed the context, call the service and encode the success result.
    fn run_service(
        &self,
        payload: &[u8],
        slot: &mut Option<RequestContext>,
    ) -> Result<Vec<u8>, DispatchError> {
        let mut envelope = self.codec.decode(payload)?;
        let ctx = slot.insert(RequestContext::init(envelope.context_seed()));

        debug!(
            trace_id = %ctx.trace_id(),
            span_id = %ctx.span_id(),
            func = %ctx.target(),
            "RPC call received"
        );

        let args = std::mem::take(&mut envelope.args);
        let data = self.services.dispatch(ctx, envelope.target(), args)?;
        self.codec.encode(&RpcResult::success(data))
    }

    fn encode_error(&self, err: &DispatchError) -> Vec<u8> {
        let result = RpcResult::error(err.code(), err.to_string());
        match catch_unwind(AssertUnwindSafe(|| self.codec.encode(&result))) {
            Ok(Ok(bytes)) => bytes,
            Ok(Err(e)) => {
                warn!(error = %e, "Failed to encode rpc error result");
                ENCODE_FAILURE_REPLY.to_vec()
            }
            Err(panic) => {
                error!(
                    panic_message = %panic_message(panic.as_ref()),
                    "Codec panicked encoding rpc error result"
                );
                ENCODE_FAILURE_REPLY.to_vec()
            }
        }
    }

    fn send_rpc(&self, conn: &mut dyn RpcConnection, id: ConnectionId, ctx: &RequestContext, reply: &[u8]) {
        if let Err(e) = conn.send(id, reply) {
            warn!(
                trace_id = %ctx.trace_id(),
                connection = %id,
                error = %e,
                "Failed to write rpc reply"
            );
        }
    }
}

impl fmt::Debug for Application {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Application")
            .field("controllers", &self.controllers)
            .field("services", &self.services)
            .field("hooks", &self.hooks)
            .field("request_count", &self.request_count())
            .finish()
    }
}

fn http_seed(request: &HttpRequest) -> ContextSeed {
    ContextSeed {
        trace_id: request.get_header(TRACE_ID_HEADER).map(str::to_string),
        span_id: request
            .get_header(SPAN_ID_HEADER)
            .map(|s| serde_json::Value::String(s.to_string())),
        target: Some(request.path().to_string()),
    }
}

fn fallback_rpc_context() -> RequestContext {
    RequestContext::init(ContextSeed::new().target(RPC_FALLBACK_TARGET))
}

/// Wires an [`Application`] from explicit collaborators.
///
/// Anything not supplied falls back to the bundled default: an empty
/// [`PatternRouter`], an empty [`OrderedFilterChain`], [`JsonCodec`] and
/// [`JsonErrorHandler`].
#[derive(Default)]
pub struct ApplicationBuilder {
    router: Option<Arc<dyn Router>>,
    filters: Option<Arc<dyn FilterChain>>,
    controllers: ControllerDispatcher,
    services: RpcDispatcher,
    codec: Option<Arc<dyn RpcCodec>>,
    error_handler: Option<Arc<dyn ErrorHandler>>,
    hooks: LifecycleHooks,
}

impl ApplicationBuilder {
    #[must_use]
    pub fn router(mut self, router: impl Router + 'static) -> Self {
        self.router = Some(Arc::new(router));
        self
    }

    #[must_use]
    pub fn filters(mut self, filters: impl FilterChain + 'static) -> Self {
        self.filters = Some(Arc::new(filters));
        self
    }

    #[must_use]
    pub fn controller(mut self, handler: &str, controller: impl Controller + 'static) -> Self {
        self.controllers.register(handler, Arc::new(controller));
        self
    }

    #[must_use]
    pub fn service(mut self, func: &str, service: impl RpcService + 'static) -> Self {
        self.services.register(func, Arc::new(service));
        self
    }

    #[must_use]
    pub fn codec(mut self, codec: impl RpcCodec + 'static) -> Self {
        self.codec = Some(Arc::new(codec));
        self
    }

    #[must_use]
    pub fn error_handler(mut self, handler: impl ErrorHandler + 'static) -> Self {
        self.error_handler = Some(Arc::new(handler));
        self
    }

    /// Register a lifecycle hook; hooks fire in registration order.
    #[must_use]
    pub fn hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(LifecycleEvent, &RequestContext) + Send + Sync + 'static,
    {
        self.hooks.register(hook);
        self
    }

    #[must_use]
    pub fn build(self) -> Application {
        Application {
            router: self
                .router
                .unwrap_or_else(|| Arc::new(PatternRouter::empty())),
            filters: self
                .filters
                .unwrap_or_else(|| Arc::new(OrderedFilterChain::new())),
            controllers: self.controllers,
            services: self.services,
            codec: self.codec.unwrap_or_else(|| Arc::new(JsonCodec)),
            error_handler: self
                .error_handler
                .unwrap_or_else(|| Arc::new(JsonErrorHandler)),
            hooks: self.hooks,
            request_count: AtomicU64::new(0),
        }
    }
}
