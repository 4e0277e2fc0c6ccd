//! SQLite adapter.

use super::{bytes_value, float_value};
use crate::config::{DatabaseSettings, DatabaseTarget};
use crate::database::{Backend, Database, ExecOutcome, Row};
use crate::sql::BindValue;
use async_trait::async_trait;
use serde_json::Value;
use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Row as _, Sqlite, TypeInfo, ValueRef};
use std::str::FromStr;

pub struct SqliteDatabase {
    pool: SqlitePool,
}

/// Database file name; a bare name gets the `.db` extension.
fn database_file(name: &str) -> String {
    if name == ":memory:" || std::path::Path::new(name).extension().is_some() {
        name.to_string()
    } else {
        format!("{}.db", name)
    }
}

impl SqliteDatabase {
    pub async fn connect(settings: &DatabaseSettings) -> Result<Self, sqlx::Error> {
        let (options, in_memory) = match &settings.target {
            DatabaseTarget::Url(url) => {
                let opts = if url.starts_with("sqlite:") {
                    SqliteConnectOptions::from_str(url)?
                } else {
                    SqliteConnectOptions::new().filename(database_file(url))
                };
                (opts, url.contains(":memory:"))
            }
            DatabaseTarget::Parts { database, .. } => {
                let file = database_file(database);
                let in_memory = file == ":memory:";
                let opts = if in_memory {
                    SqliteConnectOptions::from_str("sqlite::memory:")?
                } else {
                    SqliteConnectOptions::new().filename(file)
                };
                (opts, in_memory)
            }
        };
        let options = options.create_if_missing(true).foreign_keys(true);
        // An in-memory database lives and dies with its connection.
        let pool = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await?
        } else {
            SqlitePoolOptions::new()
                .max_connections(settings.max_connections)
                .connect_with(options)
                .await?
        };
        Ok(Self { pool })
    }

    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn bind_params<'q>(
    mut query: Query<'q, Sqlite, SqliteArguments<'q>>,
    params: &[BindValue],
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    for p in params {
        query = match p {
            BindValue::Null => query.bind(None::<String>),
            BindValue::Bool(b) => query.bind(*b),
            BindValue::I64(n) => query.bind(*n),
            BindValue::F64(n) => query.bind(*n),
            BindValue::Text(s) => query.bind(s.clone()),
            BindValue::Json(v) => query.bind(v.to_string()),
        };
    }
    query
}

#[async_trait]
impl Database for SqliteDatabase {
    fn backend(&self) -> Backend {
        Backend::Sqlite
    }

    async fn fetch_all(&self, sql: &str, params: &[BindValue]) -> Result<Vec<Row>, sqlx::Error> {
        tracing::debug!(target: "db", sql = %sql, params = ?params, "query");
        let rows = bind_params(sqlx::query(sql), params)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(row_to_json).collect())
    }

    async fn execute(&self, sql: &str, params: &[BindValue]) -> Result<ExecOutcome, sqlx::Error> {
        tracing::debug!(target: "db", sql = %sql, params = ?params, "execute");
        let done = bind_params(sqlx::query(sql), params)
            .execute(&self.pool)
            .await?;
        let id = done.last_insert_rowid();
        Ok(ExecOutcome {
            rows_affected: done.rows_affected(),
            last_insert_id: (id > 0).then_some(id),
        })
    }
}

fn row_to_json(row: &SqliteRow) -> Row {
    let mut map = Row::new();
    for (idx, col) in row.columns().iter().enumerate() {
        let declared = col.type_info().name().to_uppercase();
        map.insert(col.name().to_string(), cell_to_value(row, idx, &declared));
    }
    map
}

/// SQLite is dynamically typed: decode by the storage class of the value itself.
fn cell_to_value(row: &SqliteRow, idx: usize, declared: &str) -> Value {
    let storage = match row.try_get_raw(idx) {
        Ok(raw) if raw.is_null() => return Value::Null,
        Ok(raw) => raw.type_info().name().to_string(),
        Err(_) => return Value::Null,
    };
    match storage.as_str() {
        "INTEGER" => match row.try_get::<i64, _>(idx) {
            Ok(n) if declared.starts_with("BOOL") => Value::Bool(n != 0),
            Ok(n) => Value::Number(n.into()),
            Err(_) => Value::Null,
        },
        "REAL" => row.try_get::<f64, _>(idx).map(float_value).unwrap_or(Value::Null),
        "BLOB" => row
            .try_get::<Vec<u8>, _>(idx)
            .map(bytes_value)
            .unwrap_or(Value::Null),
        _ => row
            .try_get::<String, _>(idx)
            .map(Value::String)
            .unwrap_or(Value::Null),
    }
}
