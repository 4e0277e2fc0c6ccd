//! Router assembly.

mod common;
mod table;

pub use common::common_routes;
pub use table::table_routes;

use crate::config::ApiSettings;
use crate::middleware::errors::{json_method_not_allowed, not_found};
use crate::state::AppState;
use axum::{
    http::{header, HeaderName, HeaderValue, Method},
    middleware::map_response,
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};

fn cors_layer(api: &ApiSettings) -> CorsLayer {
    let origins: Vec<HeaderValue> = api
        .allowed_origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-api-key"),
            HeaderName::from_static("x-api-secret"),
        ]);
    if origins.is_empty() {
        layer
    } else {
        layer.allow_origin(AllowOrigin::list(origins)).allow_credentials(true)
    }
}

/// The complete application: health routes, the table API under the configured prefix and error fallbacks.
pub fn app(state: AppState) -> Router {
    let api = &state.settings.api;
    let cors = cors_layer(api);
    let body_limit = RequestBodyLimitLayer::new(api.max_body_bytes);
    let prefix = api.prefix.clone();
    Router::new()
        .merge(common_routes(state.clone()))
        .nest(&prefix, table_routes(state))
        .fallback(not_found)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(body_limit)
                .layer(cors)
                .layer(map_response(json_method_not_allowed)),
        )
}
