//! Bearer-token authorization for the ranking routes.
//!
//! Runs before any handler, so a rejected request never reaches extraction
//! or inference.

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, Request},
    middleware::Next,
    response::Response,
};

use crate::errors::AppError;
use crate::state::AppState;

pub async fn require_bearer(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_token(request.headers())?;
    if !tokens_match(token.as_bytes(), state.api_key.as_bytes()) {
        tracing::warn!("Rejected request with an invalid bearer token");
        return Err(AppError::Unauthorized("Invalid bearer token"));
    }
    Ok(next.run(request).await)
}

fn extract_token(headers: &HeaderMap) -> Result<&str, AppError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(AppError::Unauthorized("Missing Authorization header"))?
        .to_str()
        .map_err(|_| AppError::Unauthorized("Invalid Authorization header"))?;

    let (scheme, token) = value
        .split_once(' ')
        .ok_or(AppError::Unauthorized("Invalid Authorization header format"))?;
    if !scheme.eq_ignore_ascii_case("bearer") || token.trim().is_empty() {
        return Err(AppError::Unauthorized("Invalid Authorization header format"));
    }
    Ok(token.trim())
}

/// Comparison time does not depend on where the first mismatching byte is.
fn tokens_match(presented: &[u8], expected: &[u8]) -> bool {
    if presented.len() != expected.len() {
        return false;
    }
    presented
        .iter()
        .zip(expected)
        .fold(0u8, |diff, (a, b)| diff | (a ^ b))
        == 0
}
