//! Ingest authentication middleware.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{HeaderMap, Method},
    middleware::Next,
    response::{IntoResponse, Response},
};
use subtle::ConstantTimeEq;
use tracing::warn;

use crate::api::AppError;
use crate::state::AppState;

/// Header carrying the shared ingest secret.
pub const API_KEY_HEADER: &str = "X-API-Key";

/// API key check for writes.
///
/// Only `POST` requests are checked, and only when `security.api_key` is
/// configured. Reads are always open. A missing or mismatched key is
/// rejected with 403 before the handler runs, so nothing is stored.
pub async fn require_api_key(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Response {
    if request.method() != Method::POST {
        return next.run(request).await;
    }

    let Some(expected) = state.config.security.api_key.as_deref() else {
        return next.run(request).await;
    };

    let provided = headers.get(API_KEY_HEADER).and_then(|v| v.to_str().ok());

    if provided.is_some_and(|key| keys_match(expected, key)) {
        next.run(request).await
    } else {
        warn!("Rejected write to {}: bad API key", request.uri().path());
        AppError::Forbidden("Invalid or missing API key".to_string()).into_response()
    }
}

/// Constant-time key comparison.
fn keys_match(expected: &str, provided: &str) -> bool {
    expected.as_bytes().ct_eq(provided.as_bytes()).into()
}
