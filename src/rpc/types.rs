use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::context::{ContextSeed, RPC_FALLBACK_TARGET};

/// Decoded form of one inbound RPC packet.
///
/// Wire field names follow the packet format: `logid`, `spanid`, `func`,
/// `args`. `traceId`/`spanId` are accepted as aliases.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RpcEnvelope {
    #[serde(
        rename = "logid",
        alias = "traceId",
        default,
        deserialize_with = "deserialize_trace_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub trace_id: Option<String>,
    #[serde(
        rename = "spanid",
        alias = "spanId",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub span_id: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub func: Option<String>,
    #[serde(default)]
    pub args: Value,
}

impl RpcEnvelope {
    pub fn new(func: impl Into<String>, args: Value) -> Self {
        Self {
            trace_id: None,
            span_id: None,
            func: Some(func.into()),
            args,
        }
    }

    /// Dispatch key, or the fallback literal when the packet names no function.
    #[must_use]
    pub fn target(&self) -> &str {
        self.func
            .as_deref()
            .filter(|f| !f.is_empty())
            .unwrap_or(RPC_FALLBACK_TARGET)
    }

    /// Context seed carrying this envelope's tracing fields.
    #[must_use]
    pub fn context_seed(&self) -> ContextSeed {
        ContextSeed {
            trace_id: self.trace_id.clone(),
            span_id: self.span_id.clone(),
            target: Some(self.target().to_string()),
        }
    }
}

/// Accept numeric log ids as well as strings.
fn deserialize_trace_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RpcStatus {
    Success,
    Error,
}

/// Canonical reply shape written back on the RPC wire, on success and failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcResult {
    pub status: RpcStatus,
    pub code: i32,
    pub message: String,
    pub data: Value,
}

impl RpcResult {
    #[must_use]
    pub fn success(data: Value) -> Self {
        Self {
            status: RpcStatus::Success,
            code: 0,
            message: String::new(),
            data,
        }
    }

    /// An error reply; `data` is always empty (`null`).
    pub fn error(code: i32, message: impl Into<String>) -> Self {
        Self {
            status: RpcStatus::Error,
            code,
            message: message.into(),
            data: Value::Null,
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == RpcStatus::Success
    }
}
