//! Built-in echo controller and RPC functions.
//!
//! Registered by the binary so both listeners answer something out of the
//! box, and used by the tests as a realistic controller.

use http::Method;
use serde_json::{json, Map, Value};

use crate::application::ApplicationBuilder;
use crate::context::RequestContext;
use crate::dispatcher::{ActionCall, Controller};
use crate::error::DispatchError;
use crate::router::RouteDef;
use crate::server::HttpResponse;

pub const ECHO_HANDLER: &str = "echo";

/// Echoes the matched request back as JSON.
///
/// - `show` answers `GET /echo/{value}`
/// - `reflect` answers `POST /echo` with the request body
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoController;

impl Controller for EchoController {
    fn run(&self, action: &str, call: ActionCall<'_>) -> Result<HttpResponse, DispatchError> {
        match action {
            "show" => {
                let value = call.param("value").unwrap_or_default();
                Ok(HttpResponse::json(200, describe(call, json!(value))))
            }
            "reflect" => {
                let body = call.request.body.clone().unwrap_or(Value::Null);
                Ok(HttpResponse::json(200, describe(call, body)))
            }
            other => Err(DispatchError::action_not_found(ECHO_HANDLER, other)),
        }
    }
}

fn describe(call: ActionCall<'_>, echoed: Value) -> Value {
    let params: Map<String, Value> = call
        .params
        .iter()
        .map(|(k, v)| (k.to_string(), json!(v)))
        .collect();
    let query: Map<String, Value> = call
        .request
        .query_params
        .iter()
        .map(|(k, v)| (k.to_string(), json!(v)))
        .collect();
    json!({
        "handler": ECHO_HANDLER,
        "method": call.request.method.as_str(),
        "path": call.request.path(),
        "params": params,
        "query": query,
        "echo": echoed,
        "trace_id": call.ctx.trace_id(),
    })
}

/// Routes served by [`EchoController`].
#[must_use]
pub fn routes() -> Vec<RouteDef> {
    vec![
        RouteDef::new(Method::GET, "/echo/{value}", ECHO_HANDLER, "show"),
        RouteDef::new(Method::POST, "/echo", ECHO_HANDLER, "reflect"),
    ]
}

/// `echo.ping`: liveness probe.
///
/// # Errors
///
/// Never fails.
pub fn ping(_ctx: &RequestContext, _args: Value) -> Result<Value, DispatchError> {
    Ok(json!("pong"))
}

/// `echo.echo`: returns `args` unchanged. Passing `{"fail": {"code", "message"}}`
/// produces that error instead.
///
/// # Errors
///
/// Returns a `ServiceInvocation` error when asked to fail.
pub fn echo(_ctx: &RequestContext, args: Value) -> Result<Value, DispatchError> {
    if let Some(fail) = args.get("fail") {
        let code = fail
            .get("code")
            .and_then(Value::as_i64)
            .and_then(|c| i32::try_from(c).ok())
            .unwrap_or(500);
        let message = fail
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("echo failure");
        return Err(DispatchError::invocation(code, message));
    }
    Ok(args)
}

/// Register the echo controller and both echo functions.
#[must_use]
pub fn register(builder: ApplicationBuilder) -> ApplicationBuilder {
    builder
        .controller(ECHO_HANDLER, EchoController)
        .service("echo.ping", ping)
        .service("echo.echo", echo)
}
