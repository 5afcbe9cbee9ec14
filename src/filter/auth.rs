use super::Filter;
use crate::context::RequestContext;
use crate::server::{HttpRequest, HttpResponse};

/// Rejects requests whose `Authorization` header is not `Bearer <token>`.
pub struct BearerTokenFilter {
    expected: String,
}

impl BearerTokenFilter {
    pub fn new(token: impl AsRef<str>) -> Self {
        Self {
            expected: format!("Bearer {}", token.as_ref()),
        }
    }
}

impl Filter for BearerTokenFilter {
    fn before(&self, ctx: &mut RequestContext, req: &HttpRequest) -> Option<HttpResponse> {
        match req.get_header("authorization") {
            Some(h) if h == self.expected => None,
            _ => {
                let mut res = HttpResponse::error(401, "Unauthorized");
                res.set_header("www-authenticate", "Bearer".to_string());
                res.set_header("x-trace-id", ctx.trace_id().to_string());
                Some(res)
            }
        }
    }

    fn name(&self) -> &'static str {
        "bearer_token"
    }
}
