//! Unverified JWT payload decoding.
//!
//! Only used to read claims from an ID token the client already trusts;
//! signatures are not checked.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde_json::Value;

use crate::error::{FortumError, Result};

/// Decode the payload segment of a JWT.
///
/// # Errors
///
/// Returns [`FortumError::CustomerId`] if the token is not three segments
/// or the payload is not base64url-encoded JSON.
pub fn decode_payload(token: &str) -> Result<Value> {
    let mut segments = token.split('.');
    let (Some(_header), Some(payload), Some(_signature), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return Err(FortumError::CustomerId(
            "Failed to extract customer ID: malformed token".to_string(),
        ));
    };

    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| FortumError::CustomerId(format!("Failed to extract customer ID: {e}")))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| FortumError::CustomerId(format!("Failed to extract customer ID: {e}")))
}

/// Read `customerid[0].crmid` from an ID token.
///
/// # Errors
///
/// Returns [`FortumError::CustomerId`] if the token cannot be decoded or
/// lacks the claim.
pub fn customer_id_from_token(token: &str) -> Result<String> {
    let payload = decode_payload(token)?;
    payload
        .get("customerid")
        .and_then(|ids| ids.get(0))
        .and_then(|id| id.get("crmid"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| {
            FortumError::CustomerId("Failed to extract customer ID: missing crmid claim".to_string())
        })
}

#[cfg(test)]
pub(crate) fn encode_unsigned(claims: &Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.sig")
}
