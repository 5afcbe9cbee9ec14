use std::fmt::{Display, Formatter};

/// Trace identifier backed by ULID.
///
/// Generated ids are lexicographically sortable and unique per process without
/// coordination, so two invocations never receive the same generated id.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug)]
pub struct TraceId(pub ulid::Ulid);

impl TraceId {
    #[must_use]
    pub fn new() -> Self {
        Self(ulid::Ulid::new())
    }
}

impl Default for TraceId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for TraceId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Generate a fresh trace id string for an invocation that arrived without one.
///
/// Caller-supplied ids are taken verbatim and never pass through here.
#[must_use]
pub fn generate_trace_id() -> String {
    TraceId::new().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_distinct() {
        let a = generate_trace_id();
        let b = generate_trace_id();
        assert!(!a.is_empty());
        assert_ne!(a, b);
    }

    #[test]
    fn generated_ids_are_ulids() {
        let id = generate_trace_id();
        assert_eq!(id.len(), 26);
        assert!(ulid::Ulid::from_string(&id).is_ok());
    }
}
