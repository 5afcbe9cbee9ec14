//! # Filter Module
//!
//! Cross-cutting checks that run between route resolution and the controller
//! action. The orchestrator only sees the [`FilterChain`] contract and its
//! boolean outcome; [`OrderedFilterChain`] is the bundled implementation built
//! from individual [`Filter`]s.
//!
//! A filter rejects a request by returning a response. The chain sends that
//! response through the invocation's exchange and reports `false`, so the
//! handler never runs and nothing is sent twice.

mod auth;
mod core;

pub use auth::BearerTokenFilter;
pub use core::{Filter, FilterChain, OrderedFilterChain};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{ContextSeed, RequestContext};
    use crate::server::{HttpExchange, HttpRequest, HttpResponse, ResponseWriter};
    use http::Method;
    use std::io;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Default)]
    struct Recorder(Vec<HttpResponse>);

    impl ResponseWriter for Recorder {
        fn write_response(&mut self, response: HttpResponse) -> io::Result<()> {
            self.0.push(response);
            Ok(())
        }
    }

    #[test]
    fn empty_chain_approves() {
        let chain = OrderedFilterChain::new();
        let req = HttpRequest::new(Method::GET, "/");
        let mut rec = Recorder::default();
        let mut ctx = RequestContext::init(ContextSeed::new());
        let mut exchange = HttpExchange::new(&req, &mut rec);
        assert!(chain.do_filter(&mut ctx, &mut exchange));
        assert!(!exchange.is_sent());
    }

    #[test]
    fn first_rejection_short_circuits() {
        let later = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&later);
        let chain = OrderedFilterChain::new()
            .with(|_: &mut RequestContext, _: &HttpRequest| {
                Some(HttpResponse::error(403, "Forbidden"))
            })
            .with(move |_: &mut RequestContext, _: &HttpRequest| {
                seen.fetch_add(1, Ordering::SeqCst);
                None
            });

        let req = HttpRequest::new(Method::GET, "/");
        let mut rec = Recorder::default();
        let mut ctx = RequestContext::init(ContextSeed::new());
        {
            let mut exchange = HttpExchange::new(&req, &mut rec);
            assert!(!chain.do_filter(&mut ctx, &mut exchange));
        }
        assert_eq!(later.load(Ordering::SeqCst), 0);
        assert_eq!(rec.0.len(), 1);
        assert_eq!(rec.0[0].status, 403);
    }

    #[test]
    fn filters_can_annotate_context() {
        let chain = OrderedFilterChain::new().with(|ctx: &mut RequestContext, _: &HttpRequest| {
            ctx.set("tenant", "acme");
            None
        });
        let req = HttpRequest::new(Method::GET, "/");
        let mut rec = Recorder::default();
        let mut ctx = RequestContext::init(ContextSeed::new());
        let mut exchange = HttpExchange::new(&req, &mut rec);
        assert!(chain.do_filter(&mut ctx, &mut exchange));
        assert_eq!(ctx.get("tenant"), Some(serde_json::json!("acme")));
    }
}
