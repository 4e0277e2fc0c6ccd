//! Schema introspection per backend.

use crate::database::{Backend, Database, Row};
use crate::metadata::{ColumnMetadata, TableMetadata, UdtName};
use crate::sql::BindValue;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

const SQLITE_TABLES: &str =
    "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name";
const SQLITE_COLUMNS: &str = "SELECT name, type, \"notnull\", dflt_value, pk FROM pragma_table_info(?)";
const SQLITE_INDEXES: &str = "SELECT name, \"unique\", origin FROM pragma_index_list(?)";
const SQLITE_INDEX_COLUMNS: &str = "SELECT name FROM pragma_index_info(?)";

const MYSQL_TABLES: &str = "SELECT CAST(TABLE_NAME AS CHAR) AS name \
     FROM INFORMATION_SCHEMA.TABLES \
     WHERE TABLE_SCHEMA = DATABASE() AND TABLE_TYPE = 'BASE TABLE' \
     ORDER BY TABLE_NAME";
const MYSQL_COLUMNS: &str = "SELECT CAST(COLUMN_NAME AS CHAR) AS name, \
     CAST(COLUMN_TYPE AS CHAR) AS data_type, \
     CAST(IS_NULLABLE AS CHAR) AS is_nullable, \
     CAST(COLUMN_DEFAULT AS CHAR) AS column_default, \
     CAST(COLUMN_KEY AS CHAR) AS column_key, \
     CAST(EXTRA AS CHAR) AS extra \
     FROM INFORMATION_SCHEMA.COLUMNS \
     WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ? \
     ORDER BY ORDINAL_POSITION";

const PG_TABLES: &str = "SELECT table_name::text AS name \
     FROM information_schema.tables \
     WHERE table_schema = current_schema() AND table_type = 'BASE TABLE' \
     ORDER BY table_name";
const PG_COLUMNS: &str = "SELECT column_name::text AS name, \
     data_type::text AS data_type, \
     is_nullable::text AS is_nullable, \
     column_default::text AS column_default, \
     is_identity::text AS is_identity, \
     is_generated::text AS is_generated, \
     udt_schema::text AS udt_schema, \
     udt_name::text AS udt_name \
     FROM information_schema.columns \
     WHERE table_schema = current_schema() AND table_name::text = $1 \
     ORDER BY ordinal_position";
const PG_KEYS: &str = "SELECT tc.constraint_type::text AS constraint_type, \
     tc.constraint_name::text AS constraint_name, \
     kcu.column_name::text AS column_name \
     FROM information_schema.table_constraints tc \
     JOIN information_schema.key_column_usage kcu \
       ON tc.constraint_name = kcu.constraint_name \
      AND tc.table_schema = kcu.table_schema \
      AND tc.table_name = kcu.table_name \
     WHERE tc.table_schema = current_schema() \
       AND tc.table_name::text = $1 \
       AND tc.constraint_type IN ('PRIMARY KEY', 'UNIQUE')";

fn text(row: &Row, key: &str) -> Option<String> {
    match row.get(key)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn int(row: &Row, key: &str) -> i64 {
    match row.get(key) {
        Some(Value::Number(n)) => n.as_i64().unwrap_or(0),
        Some(Value::Bool(b)) => i64::from(*b),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

fn yes(row: &Row, key: &str) -> bool {
    text(row, key).is_some_and(|v| v.eq_ignore_ascii_case("YES"))
}

/// Reads table names and column metadata straight from the engine catalog.
pub struct MetadataRetriever {
    db: Arc<dyn Database>,
}

impl MetadataRetriever {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }

    pub async fn tables(&self) -> Result<Vec<String>, sqlx::Error> {
        let sql = match self.db.backend() {
            Backend::Sqlite => SQLITE_TABLES,
            Backend::MySql => MYSQL_TABLES,
            Backend::Postgres => PG_TABLES,
        };
        let rows = self.db.fetch_all(sql, &[]).await?;
        Ok(rows.iter().filter_map(|r| text(r, "name")).collect())
    }

    /// Columns and keys of one table; `None` when the table has no columns (does not exist).
    pub async fn table(&self, name: &str) -> Result<Option<TableMetadata>, sqlx::Error> {
        let columns = match self.db.backend() {
            Backend::Sqlite => self.sqlite_columns(name).await?,
            Backend::MySql => self.mysql_columns(name).await?,
            Backend::Postgres => self.postgres_columns(name).await?,
        };
        if columns.is_empty() {
            return Ok(None);
        }
        let meta = TableMetadata::new(name, columns);
        tracing::debug!(
            target: "db",
            table = %name,
            columns = meta.columns.len(),
            primary_key = ?meta.primary_key,
            "table metadata loaded"
        );
        Ok(Some(meta))
    }

    async fn sqlite_columns(&self, table: &str) -> Result<Vec<ColumnMetadata>, sqlx::Error> {
        let arg = [BindValue::Text(table.to_string())];
        let rows = self.db.fetch_all(SQLITE_COLUMNS, &arg).await?;
        let pk_count = rows.iter().filter(|r| int(r, "pk") > 0).count();
        let mut columns: Vec<ColumnMetadata> = rows
            .iter()
            .map(|r| {
                let mut c = ColumnMetadata::new(
                    text(r, "name").unwrap_or_default(),
                    text(r, "type").unwrap_or_default(),
                );
                c.primary_key = int(r, "pk") > 0;
                c.nullable = int(r, "notnull") == 0 && !c.primary_key;
                c.has_default = text(r, "dflt_value").is_some();
                // A lone INTEGER PRIMARY KEY aliases the rowid.
                c.auto_increment = c.primary_key && pk_count == 1 && c.data_type.eq_ignore_ascii_case("INTEGER");
                c
            })
            .collect();

        for index in self.db.fetch_all(SQLITE_INDEXES, &arg).await? {
            if int(&index, "unique") != 1 || text(&index, "origin").as_deref() == Some("pk") {
                continue;
            }
            let Some(index_name) = text(&index, "name") else { continue };
            let cols = self
                .db
                .fetch_all(SQLITE_INDEX_COLUMNS, &[BindValue::Text(index_name)])
                .await?;
            if let [only] = cols.as_slice() {
                if let Some(col) = text(only, "name") {
                    columns
                        .iter_mut()
                        .filter(|c| c.name == col)
                        .for_each(|c| c.unique = true);
                }
            }
        }
        Ok(columns)
    }

    async fn mysql_columns(&self, table: &str) -> Result<Vec<ColumnMetadata>, sqlx::Error> {
        let rows = self
            .db
            .fetch_all(MYSQL_COLUMNS, &[BindValue::Text(table.to_string())])
            .await?;
        Ok(rows
            .iter()
            .map(|r| {
                let mut c = ColumnMetadata::new(
                    text(r, "name").unwrap_or_default(),
                    text(r, "data_type").unwrap_or_default(),
                );
                let extra = text(r, "extra").unwrap_or_default().to_lowercase();
                let key = text(r, "column_key").unwrap_or_default();
                c.nullable = yes(r, "is_nullable");
                // MariaDB reports a nullable column's default as the literal NULL.
                c.has_default = text(r, "column_default").is_some_and(|d| d != "NULL") || extra.contains("generated");
                c.auto_increment = extra.contains("auto_increment");
                c.primary_key = key == "PRI";
                c.unique = key == "UNI";
                c
            })
            .collect())
    }

    async fn postgres_columns(&self, table: &str) -> Result<Vec<ColumnMetadata>, sqlx::Error> {
        let arg = [BindValue::Text(table.to_string())];
        let rows = self.db.fetch_all(PG_COLUMNS, &arg).await?;
        let mut columns: Vec<ColumnMetadata> = rows
            .iter()
            .map(|r| {
                let udt_name = text(r, "udt_name").unwrap_or_default();
                let data_type = match text(r, "data_type") {
                    Some(t) if t != "USER-DEFINED" => t,
                    _ => udt_name.clone(),
                };
                let mut c = ColumnMetadata::new(text(r, "name").unwrap_or_default(), data_type);
                let default = text(r, "column_default");
                c.nullable = yes(r, "is_nullable");
                c.auto_increment =
                    yes(r, "is_identity") || default.as_deref().is_some_and(|d| d.starts_with("nextval("));
                c.has_default = default.is_some() || text(r, "is_generated").as_deref() == Some("ALWAYS");
                c.udt = text(r, "udt_schema").map(|schema| UdtName {
                    schema,
                    name: udt_name,
                });
                c
            })
            .collect();

        let mut constraints: HashMap<String, (String, Vec<String>)> = HashMap::new();
        for r in self.db.fetch_all(PG_KEYS, &arg).await? {
            let (Some(kind), Some(name), Some(col)) =
                (text(&r, "constraint_type"), text(&r, "constraint_name"), text(&r, "column_name"))
            else {
                continue;
            };
            constraints.entry(name).or_insert_with(|| (kind, Vec::new())).1.push(col);
        }
        for (kind, cols) in constraints.values() {
            for c in columns.iter_mut().filter(|c| cols.contains(&c.name)) {
                if kind == "PRIMARY KEY" {
                    c.primary_key = true;
                } else if cols.len() == 1 {
                    c.unique = true;
                }
            }
        }
        Ok(columns)
    }
}
