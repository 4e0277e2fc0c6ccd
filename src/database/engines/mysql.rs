//! MySQL / MariaDB adapter.

use super::{bytes_value, float_value};
use crate::config::{DatabaseSettings, DatabaseTarget};
use crate::database::{Backend, Database, ExecOutcome, Row};
use crate::sql::BindValue;
use async_trait::async_trait;
use serde_json::Value;
use sqlx::mysql::{MySqlArguments, MySqlConnectOptions, MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::query::Query;
use sqlx::{Column, MySql, Row as _, TypeInfo};
use std::str::FromStr;

pub struct MySqlDatabase {
    pool: MySqlPool,
}

impl MySqlDatabase {
    pub async fn connect(settings: &DatabaseSettings) -> Result<Self, sqlx::Error> {
        let options = match &settings.target {
            DatabaseTarget::Url(url) => {
                // mariadb:// is accepted in config but the driver only knows mysql://
                let url = match url.strip_prefix("mariadb://") {
                    Some(rest) => format!("mysql://{}", rest),
                    None => url.clone(),
                };
                MySqlConnectOptions::from_str(&url)?
            }
            DatabaseTarget::Parts {
                host,
                port,
                user,
                password,
                database,
            } => MySqlConnectOptions::new()
                .host(host)
                .port(*port)
                .username(user)
                .password(password)
                .database(database),
        }
        .charset("utf8mb4")
        .collation("utf8mb4_unicode_ci");
        let pool = MySqlPoolOptions::new()
            .max_connections(settings.max_connections)
            .connect_with(options)
            .await?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

fn bind_params<'q>(
    mut query: Query<'q, MySql, MySqlArguments>,
    params: &[BindValue],
) -> Query<'q, MySql, MySqlArguments> {
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
impl Database for MySqlDatabase {
    fn backend(&self) -> Backend {
        Backend::MySql
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
        let id = done.last_insert_id();
        Ok(ExecOutcome {
            rows_affected: done.rows_affected(),
            last_insert_id: (id > 0).then_some(id as i64),
        })
    }
}

fn row_to_json(row: &MySqlRow) -> Row {
    let mut map = Row::new();
    for (idx, col) in row.columns().iter().enumerate() {
        let v = cell_to_value(row, idx, col.type_info().name());
        map.insert(col.name().to_string(), v);
    }
    map
}

fn cell_to_value(row: &MySqlRow, idx: usize, type_name: &str) -> Value {
    let decoded = match type_name {
        "BOOLEAN" => row
            .try_get::<Option<bool>, _>(idx)
            .ok()
            .flatten()
            .map(Value::Bool),
        t if t.ends_with("UNSIGNED") => row
            .try_get::<Option<u64>, _>(idx)
            .ok()
            .flatten()
            .map(|n| Value::Number(n.into())),
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" => row
            .try_get::<Option<i64>, _>(idx)
            .ok()
            .flatten()
            .map(|n| Value::Number(n.into())),
        "FLOAT" => row
            .try_get::<Option<f32>, _>(idx)
            .ok()
            .flatten()
            .map(|n| float_value(n as f64)),
        "DOUBLE" => row
            .try_get::<Option<f64>, _>(idx)
            .ok()
            .flatten()
            .map(float_value),
        "JSON" => row.try_get::<Option<Value>, _>(idx).ok().flatten(),
        "TIMESTAMP" => row
            .try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(idx)
            .ok()
            .flatten()
            .map(|d| Value::String(d.to_rfc3339())),
        "DATETIME" => row
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
        _ => None,
    };
    if let Some(v) = decoded {
        return v;
    }
    if let Ok(Some(s)) = row.try_get::<Option<String>, _>(idx) {
        return Value::String(s);
    }
    // information_schema and BINARY columns can come back as raw bytes
    if let Ok(Some(b)) = row.try_get::<Option<Vec<u8>>, _>(idx) {
        return bytes_value(b);
    }
    Value::Null
}
