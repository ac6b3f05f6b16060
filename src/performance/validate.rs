use serde_json::Value;

use crate::jsonrpc::{parse_hex_u64, REQUEST_ID};

/// Checks that a probe response is a well-formed block before its latency is
/// trusted. Missing or malformed fields yield `false`.
pub fn is_valid_block_response(response: &Value) -> bool {
    if response.get("jsonrpc").and_then(Value::as_str) != Some("2.0") {
        return false;
    }

    if response.get("id").and_then(Value::as_u64) != Some(REQUEST_ID) {
        return false;
    }

    let Some(block) = response.get("result") else {
        return false;
    };

    let positive_hex = |field: &str| {
        block
            .get(field)
            .and_then(Value::as_str)
            .and_then(parse_hex_u64)
            .is_some_and(|n| n > 0)
    };

    if !positive_hex("number") || !positive_hex("timestamp") {
        return false;
    }

    block
        .get("hash")
        .and_then(Value::as_str)
        .is_some_and(is_block_hash)
}

/// `0x` followed by exactly 64 hex digits.
fn is_block_hash(hash: &str) -> bool {
    hash.len() == 66
        && hash.starts_with("0x")
        && hash[2..].bytes().all(|b| b.is_ascii_hexdigit())
}
