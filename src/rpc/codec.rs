use crate::error::DispatchError;

use super::types::{RpcEnvelope, RpcResult};

/// Serializes RPC payloads to and from bytes.
///
/// Decoding must be deterministic: the same malformed input always yields
/// the same error message.
pub trait RpcCodec: Send + Sync {
    /// # Errors
    ///
    /// Returns `DispatchError::Decode` when the payload is not a valid envelope.
    fn decode(&self, payload: &[u8]) -> Result<RpcEnvelope, DispatchError>;

    /// # Errors
    ///
    /// Returns `DispatchError::Encode` when the result cannot be serialized.
    fn encode(&self, result: &RpcResult) -> Result<Vec<u8>, DispatchError>;
}

/// JSON packet codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl RpcCodec for JsonCodec {
    fn decode(&self, payload: &[u8]) -> Result<RpcEnvelope, DispatchError> {
        serde_json::from_slice(payload).map_err(|e| DispatchError::decode(e.to_string()))
    }

    fn encode(&self, result: &RpcResult) -> Result<Vec<u8>, DispatchError> {
        serde_json::to_vec(result).map_err(|e| DispatchError::encode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[test]
    fn decodes_wire_field_names() {
        let env = JsonCodec
            .decode(br#"{"logid":"abc","spanid":3,"func":"user.get","args":{"id":42}}"#)
            .unwrap();
        assert_eq!(env.trace_id.as_deref(), Some("abc"));
        assert_eq!(env.span_id, Some(json!(3)));
        assert_eq!(env.func.as_deref(), Some("user.get"));
        assert_eq!(env.args, json!({"id": 42}));
    }

    #[test]
    fn numeric_logid_becomes_string() {
        let env = JsonCodec.decode(br#"{"logid":12345,"func":"a"}"#).unwrap();
        assert_eq!(env.trace_id.as_deref(), Some("12345"));
    }

    #[test]
    fn missing_fields_default() {
        let env = JsonCodec.decode(br#"{}"#).unwrap();
        assert_eq!(env.trace_id, None);
        assert_eq!(env.span_id, None);
        assert_eq!(env.target(), "null");
        assert_eq!(env.args, Value::Null);
    }

    #[test]
    fn malformed_payload_is_decode_error() {
        let first = JsonCodec.decode(b"{not json").unwrap_err();
        let second = JsonCodec.decode(b"{not json").unwrap_err();
        assert!(matches!(first, DispatchError::Decode { .. }));
        assert_eq!(first.to_string(), second.to_string());
    }

    #[test]
    fn encodes_result_shape() {
        let bytes = JsonCodec
            .encode(&RpcResult::success(json!({"name": "a"})))
            .unwrap();
        let value: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(
            value,
            json!({"status": "success", "code": 0, "message": "", "data": {"name": "a"}})
        );
    }
}
