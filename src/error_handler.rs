use serde_json::json;
use tracing::{error, warn};

use crate::context::RequestContext;
use crate::error::DispatchError;
use crate::server::{HttpExchange, HttpResponse};

/// Produces the final HTTP response for a failed invocation.
///
/// The orchestrator calls this at most once per failed HTTP invocation and
/// writes nothing else afterwards.
pub trait ErrorHandler: Send + Sync {
    fn handle(&self, ctx: &RequestContext, error: &DispatchError, exchange: &mut HttpExchange<'_>);
}

/// Default handler: a JSON body with the error text, code and trace id.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonErrorHandler;

impl ErrorHandler for JsonErrorHandler {
    fn handle(&self, ctx: &RequestContext, error: &DispatchError, exchange: &mut HttpExchange<'_>) {
        let request = exchange.request();
        let status = error.status();

        if status >= 500 {
            error!(
                trace_id = %ctx.trace_id(),
                method = %request.method,
                uri = %request.path(),
                code = error.code(),
                error = %error,
                "Request failed"
            );
        } else {
            warn!(
                trace_id = %ctx.trace_id(),
                method = %request.method,
                uri = %request.path(),
                code = error.code(),
                error = %error,
                "Request rejected"
            );
        }

        let mut response = HttpResponse::json(
            status,
            json!({
                "error": error.to_string(),
                "code": error.code(),
                "method": request.method.as_str(),
                "path": request.path(),
                "trace_id": ctx.trace_id(),
            }),
        );
        response.set_header("x-trace-id", ctx.trace_id().to_string());
        exchange.send(response);
    }
}
