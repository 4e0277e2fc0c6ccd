//! PostgreSQL adapter.

use super::float_value;
use crate::config::{DatabaseSettings, DatabaseTarget};
use crate::database::{Backend, Database, ExecOutcome, Row};
use crate::sql::BindValue;
use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgArguments, PgConnectOptions, PgPool, PgPoolOptions, PgRow};
use sqlx::query::Query;
use sqlx::{Column, Postgres, Row as _, TypeInfo};
use std::str::FromStr;

pub struct PostgresDatabase {
    pool: PgPool,
}

impl PostgresDatabase {
    pub async fn connect(settings: &DatabaseSettings) -> Result<Self, sqlx::Error> {
        let options = match &settings.target {
            DatabaseTarget::Url(url) => PgConnectOptions::from_str(url)?,
            DatabaseTarget::Parts {
                host,
                port,
                user,
                password,
                database,
            } => PgConnectOptions::new()
                .host(host)
                .port(*port)
                .username(user)
                .password(password)
                .database(database),
        };
        let pool = PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .connect_with(options)
            .await?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Every parameter goes over the wire as text; the SQL carries the cast to the column type.
fn bind_params<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    params: &[BindValue],
) -> Query<'q, Postgres, PgArguments> {
    for p in params {
        query = query.bind(p.to_text());
    }
    query
}

#[async_trait]
impl Database for PostgresDatabase {
    fn backend(&self) -> Backend {
        Backend::Postgres
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
        Ok(ExecOutcome {
            rows_affected: done.rows_affected(),
            last_insert_id: None,
        })
    }
}

fn row_to_json(row: &PgRow) -> Row {
    let mut map = Row::new();
    for (idx, col) in row.columns().iter().enumerate() {
        let v = cell_to_value(row, idx, col.type_info().name());
        map.insert(col.name().to_string(), v);
    }
    map
}

fn cell_to_value(row: &PgRow, idx: usize, type_name: &str) -> Value {
    match type_name {
        "BOOL" => row
            .try_get::<Option<bool>, _>(idx)
            .ok()
            .flatten()
            .map(Value::Bool),
        "INT2" => row
            .try_get::<Option<i16>, _>(idx)
            .ok()
            .flatten()
            .map(|n| Value::Number(n.into())),
        "INT4" => row
            .try_get::<Option<i32>, _>(idx)
            .ok()
            .flatten()
            .map(|n| Value::Number(n.into())),
        "INT8" => row
            .try_get::<Option<i64>, _>(idx)
            .ok()
            .flatten()
            .map(|n| Value::Number(n.into())),
        "FLOAT4" => row
            .try_get::<Option<f32>, _>(idx)
            .ok()
            .flatten()
            .map(|n| float_value(n as f64)),
        "FLOAT8" => row
            .try_get::<Option<f64>, _>(idx)
            .ok()
            .flatten()
            .map(float_value),
        "UUID" => row
            .try_get::<Option<uuid::Uuid>, _>(idx)
            .ok()
            .flatten()
            .map(|u| Value::String(u.to_string())),
        "JSON" | "JSONB" => row.try_get::<Option<Value>, _>(idx).ok().flatten(),
        "TIMESTAMPTZ" => row
            .try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(idx)
            .ok()
            .flatten()
            .map(|d| Value::String(d.to_rfc3339())),
        "TIMESTAMP" => row
            .try_get::<Option<chrono::NaiveDateTime>, _>(idx)
            .ok()
            .flatten()
            .map(|d| Value::String(d.format("%Y-%m-%dT%H:%M:%S%.f").to_string())),
        "DATE" => row
            .try_get::<Option<chrono::NaiveDate>, _>(idx)
            .ok()
            .flatten()
            .map(|d| Value::String(d.format("%Y-%m-%d").to_string())),
        "TIME" => row
            .try_get::<Option<chrono::NaiveTime>, _>(idx)
            .ok()
            .flatten()
            .map(|t| Value::String(t.format("%H:%M:%S%.f").to_string())),
        _ => row.try_get::<Option<String>, _>(idx).ok().flatten().map(Value::String),
    }
    .unwrap_or(Value::Null)
}
