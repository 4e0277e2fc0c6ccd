//! Table CRUD routes. Handlers resolve the table by path segment at request time.

use crate::handlers::table::{create, delete, list, list_tables, read, replace, update};
use crate::middleware::{rate_limit, require_api_key};
use crate::state::AppState;
use axum::{middleware::from_fn_with_state, routing::get, Router};

pub fn table_routes(state: AppState) -> Router {
    Router::new()
        .route("/", get(list_tables))
        .route("/:table", get(list).post(create))
        .route(
            "/:table/:id",
            get(read).put(replace).patch(update).delete(delete),
        )
        .route_layer(from_fn_with_state(state.clone(), require_api_key))
        .route_layer(from_fn_with_state(state.clone(), rate_limit))
        .with_state(state)
}
