//! # Request Context
//!
//! A [`RequestContext`] holds the state of exactly one invocation: tracing ids,
//! the dispatch target, the start timestamp, profiling spans and any values
//! stored by filters or handlers.
//!
//! The context is an explicit value. The orchestrator creates it at the start
//! of an invocation and passes `&RequestContext` / `&mut RequestContext` down
//! the call chain; it is dropped when the invocation completes. There is no
//! "current request" global, so concurrent invocations on other coroutines
//! can never observe each other's trace ids or targets.
//!
//! ## Well-known keys
//!
//! | Key | Type | Default |
//! |-----|------|---------|
//! | `traceId` | string | freshly generated ULID |
//! | `spanId` | string or integer | `0` |
//! | `target` | string | `"unknown"` |
//! | `startTime` | float, unix seconds | time of `init` |

use std::collections::HashMap;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use serde_json::Value;
use smallvec::SmallVec;
use tracing::{debug, warn};

use crate::ids::generate_trace_id;

pub const TRACE_ID_KEY: &str = "traceId";
pub const SPAN_ID_KEY: &str = "spanId";
pub const TARGET_KEY: &str = "target";
pub const START_TIME_KEY: &str = "startTime";

/// Target recorded when nothing more specific is known.
pub const UNKNOWN_TARGET: &str = "unknown";

/// Target recorded for RPC envelopes that do not name a function.
pub const RPC_FALLBACK_TARGET: &str = "null";

/// Caller-supplied tracing fields merged over generated defaults by
/// [`RequestContext::init`].
#[derive(Debug, Clone, Default)]
pub struct ContextSeed {
    pub trace_id: Option<String>,
    pub span_id: Option<Value>,
    pub target: Option<String>,
}

impl ContextSeed {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn trace_id(mut self, trace_id: impl Into<String>) -> Self {
        self.trace_id = Some(trace_id.into());
        self
    }

    #[must_use]
    pub fn span_id(mut self, span_id: impl Into<Value>) -> Self {
        self.span_id = Some(span_id.into());
        self
    }

    #[must_use]
    pub fn target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }
}

/// One named profiling span recorded against an invocation.
#[derive(Debug, Clone)]
pub struct ProfileSpan {
    pub name: &'static str,
    pub start: Instant,
    pub end: Option<Instant>,
}

impl ProfileSpan {
    /// Elapsed time of a closed span; `None` while still open.
    #[must_use]
    pub fn duration(&self) -> Option<Duration> {
        self.end.map(|end| end.duration_since(self.start))
    }
}

/// Per-invocation state container.
#[derive(Debug, Clone)]
pub struct RequestContext {
    trace_id: String,
    span_id: Value,
    target: String,
    started: Instant,
    request_time: f64,
    values: HashMap<String, Value>,
    spans: SmallVec<[ProfileSpan; 4]>,
}

impl RequestContext {
    /// Create the context for a new invocation.
    ///
    /// Empty seed strings count as absent, so a blank trace id is replaced by
    /// a generated one.
    #[must_use]
    pub fn init(seed: ContextSeed) -> Self {
        let trace_id = seed
            .trace_id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(generate_trace_id);
        let span_id = seed.span_id.unwrap_or(Value::from(0));
        let target = seed
            .target
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| UNKNOWN_TARGET.to_string());
        let request_time = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or_default();

        Self {
            trace_id,
            span_id,
            target,
            started: Instant::now(),
            request_time,
            values: HashMap::new(),
            spans: SmallVec::new(),
        }
    }

    #[must_use]
    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    #[must_use]
    pub fn span_id(&self) -> &Value {
        &self.span_id
    }

    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Wall-clock start of the invocation in unix seconds.
    #[must_use]
    pub fn request_time(&self) -> f64 {
        self.request_time
    }

    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Read a value bound to this invocation.
    ///
    /// Well-known keys read the typed tracing fields; anything else reads the
    /// extension map.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        match key {
            TRACE_ID_KEY => Some(Value::String(self.trace_id.clone())),
            SPAN_ID_KEY => Some(self.span_id.clone()),
            TARGET_KEY => Some(Value::String(self.target.clone())),
            START_TIME_KEY => Some(Value::from(self.request_time)),
            _ => self.values.get(key).cloned(),
        }
    }

    /// Bind a value to this invocation.
    ///
    /// `startTime` is fixed at `init` and cannot be overwritten.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        match key.as_str() {
            TRACE_ID_KEY => self.trace_id = value_to_string(value),
            SPAN_ID_KEY => self.span_id = value,
            TARGET_KEY => self.target = value_to_string(value),
            START_TIME_KEY => {
                warn!(trace_id = %self.trace_id, "startTime is read-only; ignoring set");
            }
            _ => {
                self.values.insert(key, value);
            }
        }
    }

    /// Open a named profiling span.
    pub fn profile_start(&mut self, name: &'static str) {
        self.spans.push(ProfileSpan {
            name,
            start: Instant::now(),
            end: None,
        });
    }

    /// Close the most recent open span with this name.
    pub fn profile_end(&mut self, name: &'static str) {
        if let Some(span) = self
            .spans
            .iter_mut()
            .rev()
            .find(|s| s.name == name && s.end.is_none())
        {
            let end = Instant::now();
            span.end = Some(end);
            debug!(
                trace_id = %self.trace_id,
                span = name,
                elapsed_us = end.duration_since(span.start).as_micros() as u64,
                "Profile span closed"
            );
        }
    }

    /// Spans recorded so far, in the order they were opened.
    #[must_use]
    pub fn spans(&self) -> &[ProfileSpan] {
        &self.spans
    }

    /// First span recorded under `name`.
    #[must_use]
    pub fn span(&self, name: &str) -> Option<&ProfileSpan> {
        self.spans.iter().find(|s| s.name == name)
    }
}

fn value_to_string(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_fields() {
        let ctx = RequestContext::init(ContextSeed::new());
        assert!(!ctx.trace_id().is_empty());
        assert_eq!(ctx.span_id(), &Value::from(0));
        assert_eq!(ctx.target(), UNKNOWN_TARGET);
        assert!(ctx.request_time() > 0.0);
    }

    #[test]
    fn seed_overrides_defaults() {
        let ctx = RequestContext::init(
            ContextSeed::new()
                .trace_id("abc")
                .span_id("1.2")
                .target("user.get"),
        );
        assert_eq!(ctx.trace_id(), "abc");
        assert_eq!(ctx.span_id(), &Value::from("1.2"));
        assert_eq!(ctx.target(), "user.get");
    }

    #[test]
    fn blank_trace_id_is_regenerated() {
        let ctx = RequestContext::init(ContextSeed::new().trace_id(""));
        assert_eq!(ctx.trace_id().len(), 26);
    }

    #[test]
    fn get_and_set_well_known_keys() {
        let mut ctx = RequestContext::init(ContextSeed::new());
        ctx.set(TARGET_KEY, "/users/1");
        ctx.set(SPAN_ID_KEY, 3);
        ctx.set("tenant", "acme");

        assert_eq!(ctx.get(TARGET_KEY), Some(Value::from("/users/1")));
        assert_eq!(ctx.get(SPAN_ID_KEY), Some(Value::from(3)));
        assert_eq!(ctx.get("tenant"), Some(Value::from("acme")));
        assert_eq!(ctx.get("missing"), None);
        assert!(ctx.get(START_TIME_KEY).is_some_and(|v| v.is_f64()));
    }

    #[test]
    fn start_time_is_read_only() {
        let mut ctx = RequestContext::init(ContextSeed::new());
        let before = ctx.request_time();
        ctx.set(START_TIME_KEY, 1.0);
        assert_eq!(ctx.request_time(), before);
    }

    #[test]
    fn profile_spans_record_start_and_end() {
        let mut ctx = RequestContext::init(ContextSeed::new());
        ctx.profile_start("router.match");
        ctx.profile_end("router.match");
        ctx.profile_start("filter");

        let router = ctx.span("router.match").unwrap();
        assert!(router.duration().is_some());
        assert!(ctx.span("filter").unwrap().end.is_none());
        assert_eq!(ctx.spans().len(), 2);
    }
}
