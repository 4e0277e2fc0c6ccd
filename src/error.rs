//! Typed errors and HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing setting: {0}")]
    Missing(&'static str),
    #[error("invalid setting {key}: {message}")]
    Invalid { key: &'static str, message: String },
    #[error("unsupported database type: {0}")]
    UnsupportedDatabase(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Table `{0}` was not found in the database. Please check the table name and try again.")]
    TableNotFound(String),
    #[error("Table permission denied.")]
    TableHidden(String),
    #[error("Requested record `{id}` was not found in `{table}`")]
    NotFound { table: String, id: String },
    #[error("Primary key not found for table `{0}`")]
    NoPrimaryKey(String),
    #[error("Invalid query argument: `{arg}`. {reason}")]
    InvalidQueryArg { arg: String, reason: String },
    #[error("Invalid fields `{fields}` in `{table}`: {reason}")]
    InvalidFields {
        table: String,
        fields: String,
        reason: &'static str,
    },
    #[error("Request must contain valid data: {0}")]
    NoDataProvided(String),
    #[error("Unique field `{field}` is already in use in `{table}`")]
    AlreadyUsed { field: String, table: String },
    #[error("Key `{key}` does not match the record `{id}` in `{table}`.")]
    KeyMismatch { key: String, id: String, table: String },
    #[error("No changes detected for record with primary key `{id}` in `{table}`.")]
    NothingToUpdate { table: String, id: String },
    #[error("Unauthorized. Please provide valid credentials.")]
    Unauthorized,
    #[error("Too many requests. Please try again later. The allowed rate is {0} requests per minute.")]
    TooManyRequests(u32),
    #[error("The requested URL `{0}` was not found on the server.")]
    RouteNotFound(String),
    #[error("The method is not allowed for the requested URL.")]
    MethodNotAllowed,
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl AppError {
    /// Status code, machine-readable code and severity for this error.
    pub fn classify(&self) -> (StatusCode, &'static str, &'static str) {
        match self {
            AppError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "software_error", "error"),
            AppError::TableNotFound(_) => (StatusCode::NOT_FOUND, "table_not_found", "error"),
            AppError::TableHidden(_) => (StatusCode::NOT_FOUND, "table_permission_denied", "error"),
            AppError::NotFound { .. } => (StatusCode::NOT_FOUND, "not_found", "error"),
            AppError::NoPrimaryKey(_) => (StatusCode::BAD_REQUEST, "primary_key_not_found", "error"),
            AppError::InvalidQueryArg { .. } => (StatusCode::BAD_REQUEST, "invalid_query_arg", "warning"),
            AppError::InvalidFields { .. } => (StatusCode::BAD_REQUEST, "invalid_fields", "error"),
            AppError::NoDataProvided(_) => (StatusCode::BAD_REQUEST, "no_data_provided", "error"),
            AppError::AlreadyUsed { .. } => (StatusCode::CONFLICT, "already_used", "error"),
            AppError::KeyMismatch { .. } => (StatusCode::BAD_REQUEST, "key_mismatch", "error"),
            AppError::NothingToUpdate { .. } => (StatusCode::BAD_REQUEST, "nothing_to_update", "warning"),
            AppError::Unauthorized => (StatusCode::FORBIDDEN, "unauthorized", "error"),
            AppError::TooManyRequests(_) => (StatusCode::TOO_MANY_REQUESTS, "too_many_requests", "error"),
            AppError::RouteNotFound(_) => (StatusCode::NOT_FOUND, "not_found", "error"),
            AppError::MethodNotAllowed => (StatusCode::METHOD_NOT_ALLOWED, "method_not_allowed", "error"),
            AppError::Db(e) => classify_db(e),
        }
    }
}

fn classify_db(e: &sqlx::Error) -> (StatusCode, &'static str, &'static str) {
    match e {
        sqlx::Error::RowNotFound => (StatusCode::NOT_FOUND, "not_found", "error"),
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            (StatusCode::CONFLICT, "already_used", "error")
        }
        sqlx::Error::Database(_) => (StatusCode::BAD_REQUEST, "query_fail", "error"),
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => (StatusCode::SERVICE_UNAVAILABLE, "connection_fail", "error"),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "software_error", "error"),
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, kind) = self.classify();
        let message = match &self {
            AppError::Db(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                "A unique field is already in use".to_string()
            }
            AppError::Db(sqlx::Error::Database(_)) => "Failed to execute query".to_string(),
            AppError::Db(_) if status == StatusCode::SERVICE_UNAVAILABLE => {
                "Failed to establish a connection to the database".to_string()
            }
            AppError::Db(_) | AppError::Config(_) => "An error occurred in our program".to_string(),
            other => other.to_string(),
        };
        let details = match &self {
            AppError::Db(sqlx::Error::Database(db)) => Some(serde_json::json!({ "error": db.message() })),
            _ => None,
        };
        let body = ErrorBody {
            success: false,
            error: ErrorDetail {
                code: code.to_string(),
                message,
                kind,
                status: status.as_u16(),
                details,
            },
        };
        (status, Json(body)).into_response()
    }
}
