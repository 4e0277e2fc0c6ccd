//! API key authentication.

use crate::error::AppError;
use crate::state::AppState;
use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use std::collections::HashMap;

pub const API_KEY_HEADER: &str = "X-API-KEY";
pub const API_SECRET_HEADER: &str = "X-API-SECRET";

/// Whether the request carries a configured key with its matching secret.
pub fn is_authorized(keys: &HashMap<String, String>, headers: &HeaderMap) -> bool {
    let get = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());
    match (get(API_KEY_HEADER), get(API_SECRET_HEADER)) {
        (Some(key), Some(secret)) => keys.get(key).is_some_and(|s| s == secret),
        _ => false,
    }
}

/// Reject requests without a valid key pair. A server with no configured keys is open.
pub async fn require_api_key(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let api = &state.settings.api;
    if api.auth_enabled() && !is_authorized(&api.api_keys, req.headers()) {
        tracing::warn!(
            target: "app",
            method = %req.method(),
            path = %req.uri().path(),
            "unauthorized request"
        );
        return Err(AppError::Unauthorized);
    }
    Ok(next.run(req).await)
}
