use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::{Result, RpcHandlerError};

/// Id used for every request this crate builds. Probe responses must echo it.
pub const REQUEST_ID: u64 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub method: String,
    pub params: Value,
    pub id: u64,
}

impl JsonRpcRequest {
    pub fn new(method: impl Into<String>, params: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            method: method.into(),
            params,
            id: REQUEST_ID,
        }
    }

    /// `eth_getBlockByNumber("latest", false)`, the default probe call.
    pub fn latest_block() -> Self {
        Self::new("eth_getBlockByNumber", json!(["latest", false]))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse<T> {
    pub jsonrpc: String,
    pub result: Option<T>,
    pub error: Option<JsonRpcError>,
    pub id: u64,
}

impl JsonRpcResponse<Value> {
    /// Collapses the envelope into its result, turning a JSON-RPC error object
    /// into an `Err`. A `null` result is a valid answer for many methods.
    pub fn into_result(self, endpoint: &str) -> Result<Value> {
        match self.error {
            Some(err) => Err(RpcHandlerError::JsonRpc {
                endpoint: endpoint.to_string(),
                code: err.code,
                message: err.message,
            }),
            None => Ok(self.result.unwrap_or(Value::Null)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    pub data: Option<Value>,
}

/// Parses a `0x`-prefixed hex quantity. Only hex digits may follow the
/// prefix; `from_str_radix` alone would also take a leading sign.
pub fn parse_hex_u128(value: &str) -> Option<u128> {
    let digits = value.strip_prefix("0x").or_else(|| value.strip_prefix("0X"))?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    u128::from_str_radix(digits, 16).ok()
}

pub fn parse_hex_u64(value: &str) -> Option<u64> {
    parse_hex_u128(value).and_then(|v| u64::try_from(v).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex() {
        assert_eq!(parse_hex_u64("0x10"), Some(16));
        assert_eq!(parse_hex_u64("0X5f5"), Some(0x5f5));
        assert_eq!(parse_hex_u64("0x"), None);
        assert_eq!(parse_hex_u64("16"), None);
        assert_eq!(parse_hex_u64("0xzz"), None);
        assert_eq!(parse_hex_u64("0x+10"), None);
        assert_eq!(parse_hex_u128("0x-1"), None);
    }

    #[test]
    fn test_into_result_maps_error_object() {
        let resp: JsonRpcResponse<Value> = serde_json::from_value(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "error": { "code": -32000, "message": "header not found" }
        }))
        .unwrap();
        let err = resp.into_result("https://rpc.example").unwrap_err();
        assert!(matches!(err, RpcHandlerError::JsonRpc { code: -32000, .. }));
    }
}
