//! API key middleware for the conversion routes.

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use tracing::trace;

use crate::error::ApiError;
use crate::state::AppState;

pub const API_KEY_HEADER: &str = "x-api-key";

/// Rejects the request unless `X-API-Key` matches the configured secret.
///
/// Runs before any body extraction, so a rejected request never reaches the
/// converter.
pub async fn require_api_key(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    verify_api_key(state.config().api_key.as_deref(), request.headers())?;
    trace!(path = %request.uri().path(), "API key accepted");
    Ok(next.run(request).await)
}

/// Checks `headers` against `expected`.
///
/// A server without a configured key refuses every request.
pub fn verify_api_key(expected: Option<&str>, headers: &HeaderMap) -> Result<(), ApiError> {
    let expected = expected.ok_or(ApiError::ServerMisconfigured)?;

    let provided = headers
        .get(API_KEY_HEADER)
        .ok_or(ApiError::MissingApiKey)?;

    if constant_time_eq(provided.as_bytes(), expected.as_bytes()) {
        Ok(())
    } else {
        Err(ApiError::InvalidApiKey)
    }
}

/// Constant-time byte comparison to prevent timing attacks.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}
