//! Table CRUD handlers: list tables, select, insert, read, replace, update, delete.

use crate::error::AppError;
use crate::extractors::Visibility;
use crate::handlers::args::{arguments_map, parse_select_args};
use crate::response::{success, success_created};
use crate::service::RequestValidator;
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    response::IntoResponse,
    Json,
};
use serde_json::{Map, Value};

type Params = Query<Vec<(String, String)>>;

/// Parse the JSON body, mapping malformed or missing JSON to `no_data_provided`.
fn json_body(table: &str, body: Result<Json<Value>, JsonRejection>) -> Result<Map<String, Value>, AppError> {
    match body {
        Ok(Json(value)) => RequestValidator::body_object(table, value),
        Err(rejection) => {
            tracing::debug!(target: "api", table = %table, error = %rejection, "rejected request body");
            Err(AppError::NoDataProvided(table.to_string()))
        }
    }
}

pub async fn list_tables(
    State(state): State<AppState>,
    visibility: Visibility,
) -> Result<impl IntoResponse, AppError> {
    let tables: Vec<String> = state
        .manager
        .tables()
        .await?
        .iter()
        .filter(|t| visibility.is_visible(t))
        .cloned()
        .collect();
    Ok(Json(serde_json::json!({
        "success": true,
        "data": tables,
        "meta": { "total_records": tables.len() },
    })))
}

pub async fn list(
    State(state): State<AppState>,
    Path(table): Path<String>,
    visibility: Visibility,
    Query(params): Params,
) -> Result<impl IntoResponse, AppError> {
    visibility.check(&table)?;
    let meta = state.manager.table(&table).await?;
    let args = parse_select_args(&meta, &params, state.settings.api.default_limit)?;
    let result = state
        .manager
        .select(&table, &args, arguments_map(&params))
        .await?;
    Ok(success(result))
}

pub async fn create(
    State(state): State<AppState>,
    Path(table): Path<String>,
    visibility: Visibility,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    visibility.check(&table)?;
    let meta = state.manager.table(&table).await?;
    let body = json_body(&table, body)?;
    RequestValidator::validate(&meta, &body)?;
    let result = state.manager.insert(&table, body).await?;
    Ok(success_created(result))
}

pub async fn read(
    State(state): State<AppState>,
    Path((table, id)): Path<(String, String)>,
    visibility: Visibility,
    Query(params): Params,
) -> Result<impl IntoResponse, AppError> {
    visibility.check(&table)?;
    let result = state
        .manager
        .select_one(&table, &id, arguments_map(&params))
        .await?;
    Ok(success(result))
}

/// PUT: the body replaces the record and must carry every required column.
pub async fn replace(
    State(state): State<AppState>,
    Path((table, id)): Path<(String, String)>,
    visibility: Visibility,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    visibility.check(&table)?;
    let meta = state.manager.table(&table).await?;
    let body = json_body(&table, body)?;
    RequestValidator::validate(&meta, &body)?;
    let result = state.manager.update(&table, &id, body).await?;
    Ok(success(result))
}

/// PATCH: any subset of columns.
pub async fn update(
    State(state): State<AppState>,
    Path((table, id)): Path<(String, String)>,
    visibility: Visibility,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    visibility.check(&table)?;
    let meta = state.manager.table(&table).await?;
    let body = json_body(&table, body)?;
    RequestValidator::validate_partial(&meta, &body)?;
    let result = state.manager.update(&table, &id, body).await?;
    Ok(success(result))
}

pub async fn delete(
    State(state): State<AppState>,
    Path((table, id)): Path<(String, String)>,
    visibility: Visibility,
) -> Result<impl IntoResponse, AppError> {
    visibility.check(&table)?;
    let result = state.manager.delete(&table, &id).await?;
    Ok(success(result))
}
