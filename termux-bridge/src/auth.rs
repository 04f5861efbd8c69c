//! Bearer token authentication
//!
//! The `Authorization` header carries the token, optionally prefixed with
//! `Bearer `. Comparison runs in constant time over the longer input.

use crate::error::{BridgeError, BridgeResult};
use crate::token::TokenError;

/// Check a request credential against the current token
///
/// An unavailable token fails before any comparison is attempted.
pub fn authorize(header: Option<&str>, token: Result<String, TokenError>) -> BridgeResult<()> {
    let expected = token?;

    let Some(header) = header else {
        tracing::warn!("Rejected request: missing Authorization header");
        return Err(BridgeError::Unauthorized(
            "missing Authorization header".to_string(),
        ));
    };

    let provided = strip_bearer(header);
    if constant_time_eq(provided, &expected) {
        Ok(())
    } else {
        tracing::warn!("Rejected request: invalid token");
        Err(BridgeError::Unauthorized("invalid token".to_string()))
    }
}

/// Remove an optional `Bearer ` prefix and surrounding whitespace
fn strip_bearer(header: &str) -> &str {
    let value = header.trim();
    value.strip_prefix("Bearer ").unwrap_or(value).trim()
}

/// Compare a credential with the token without stopping at the first mismatch
///
/// The shorter side is padded with zeros; a length difference alone still
/// fails the comparison.
fn constant_time_eq(provided: &str, expected: &str) -> bool {
    let provided = provided.as_bytes();
    let expected = expected.as_bytes();
    let len = provided.len().max(expected.len());

    let byte_at = |bytes: &[u8], i: usize| bytes.get(i).copied().unwrap_or(0);
    let mismatch = (0..len).fold(u8::from(provided.len() != expected.len()), |acc, i| {
        acc | (byte_at(provided, i) ^ byte_at(expected, i))
    });

    mismatch == 0
}
