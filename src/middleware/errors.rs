//! JSON bodies for routing errors.

use crate::error::AppError;
use axum::{
    http::{header, StatusCode, Uri},
    response::{IntoResponse, Response},
};

pub async fn not_found(uri: Uri) -> AppError {
    tracing::debug!(target: "app", path = %uri.path(), "no route");
    AppError::RouteNotFound(uri.path().to_string())
}

/// Replace the router's empty 405 with the standard error body.
pub async fn json_method_not_allowed(res: Response) -> Response {
    if res.status() == StatusCode::METHOD_NOT_ALLOWED && !res.headers().contains_key(header::CONTENT_TYPE) {
        let allow = res.headers().get(header::ALLOW).cloned();
        let mut json = AppError::MethodNotAllowed.into_response();
        if let Some(allow) = allow {
            json.headers_mut().insert(header::ALLOW, allow);
        }
        return json;
    }
    res
}

pub async fn favicon() -> StatusCode {
    StatusCode::NO_CONTENT
}
