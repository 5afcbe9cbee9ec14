use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::context::RequestContext;
use crate::server::{HttpExchange, HttpRequest, HttpResponse};

/// Ordered pre-dispatch checks run before a controller action.
///
/// `true` lets dispatch proceed. `false` means the chain short-circuited and
/// has already produced the terminal response through the exchange; the
/// caller must not invoke the handler or send anything else.
pub trait FilterChain: Send + Sync {
    fn do_filter(&self, ctx: &mut RequestContext, exchange: &mut HttpExchange<'_>) -> bool;
}

/// One check in an [`OrderedFilterChain`].
pub trait Filter: Send + Sync {
    /// Inspect the request; return a response to reject it.
    fn before(&self, ctx: &mut RequestContext, req: &HttpRequest) -> Option<HttpResponse>;

    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

impl<F> Filter for F
where
    F: Fn(&mut RequestContext, &HttpRequest) -> Option<HttpResponse> + Send + Sync,
{
    fn before(&self, ctx: &mut RequestContext, req: &HttpRequest) -> Option<HttpResponse> {
        self(ctx, req)
    }
}

/// Filters run in registration order; the first rejection wins and later
/// filters are not consulted.
#[derive(Clone, Default)]
pub struct OrderedFilterChain {
    filters: Vec<Arc<dyn Filter>>,
}

impl OrderedFilterChain {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a filter to the chain
    pub fn add_filter(&mut self, filter: Arc<dyn Filter>) {
        self.filters.push(filter);
    }

    #[must_use]
    pub fn with(mut self, filter: impl Filter + 'static) -> Self {
        self.add_filter(Arc::new(filter));
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

impl FilterChain for OrderedFilterChain {
    fn do_filter(&self, ctx: &mut RequestContext, exchange: &mut HttpExchange<'_>) -> bool {
        let request = exchange.request();
        for (idx, filter) in self.filters.iter().enumerate() {
            if let Some(response) = filter.before(ctx, request) {
                debug!(
                    trace_id = %ctx.trace_id(),
                    filter_idx = idx,
                    filter_name = filter.name(),
                    status = response.status,
                    "Filter returned early response"
                );
                exchange.send(response);
                return false;
            }
        }
        true
    }
}

impl fmt::Debug for OrderedFilterChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.filters.iter().map(|fl| fl.name()))
            .finish()
    }
}
