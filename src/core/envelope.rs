//! Response envelope decoding.
//!
//! The session endpoint answers with a plain JSON object. The batched RPC
//! endpoint wraps results as `[{"result":{"data":{"json": <payload>}}}]` and
//! failures as `[{"error":{"json":{"message": .., "code": ..}}}]`.

use serde_json::{Map, Value};

use crate::error::{FortumError, Result};

/// Message the RPC layer uses when a query was too expensive to answer.
pub const INTERNAL_SERVER_ERROR: &str = "INTERNAL_SERVER_ERROR";

/// Error payload of a failed RPC call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcError {
    pub message: String,
    pub code: String,
}

impl RpcError {
    /// Whether the backend asked for a smaller query.
    #[must_use]
    pub fn is_internal_server_error(&self) -> bool {
        self.message == INTERNAL_SERVER_ERROR
    }
}

/// Decode a response body into its logical payload.
///
/// # Errors
///
/// Returns [`FortumError::InvalidResponse`] when the body is not JSON, is a
/// bare scalar, or has `result.data` without `json`.
pub fn decode(body: &str) -> Result<Value> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| FortumError::invalid_response_from("Failed to parse RPC response", e))?;

    match value {
        Value::Array(items) => {
            let Some(first) = items.into_iter().next() else {
                return Ok(Value::Object(Map::new()));
            };
            if let Some(data) = first.get("result").and_then(|r| r.get("data")) {
                return data.get("json").cloned().ok_or_else(|| {
                    FortumError::invalid_response("RPC result is missing data.json")
                });
            }
            Ok(first)
        }
        object @ Value::Object(_) => Ok(object),
        other => Err(FortumError::invalid_response(format!(
            "Expected JSON object or array, got {}",
            type_name(&other)
        ))),
    }
}

/// Extract `[0].error.json.{message, code}` from a 500 body.
///
/// Returns `None` for anything else; the caller falls back to a generic
/// server error instead of reporting a malformed response.
#[must_use]
pub fn decode_error(body: &str) -> Option<RpcError> {
    let value: Value = serde_json::from_str(body).ok()?;
    let json = value.as_array()?.first()?.get("error")?.get("json")?;
    if !json.is_object() {
        return None;
    }

    let message = json
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("Unknown error")
        .to_string();
    let code = match json.get("code") {
        Some(Value::String(code)) => code.clone(),
        Some(Value::Null) | None => "Unknown".to_string(),
        Some(other) => other.to_string(),
    };

    Some(RpcError { message, code })
}

const fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
