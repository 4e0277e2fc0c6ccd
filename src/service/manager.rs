//! DatabaseManager: table-level CRUD over the engine adapter, metadata cache and query builder.

use crate::database::{Backend, Database, ExecOutcome, Row};
use crate::error::AppError;
use crate::metadata::{CacheManager, MetadataRetriever, TableMetadata};
use crate::response::{Page, QueryResult};
use crate::sql::{QueryBuf, QueryBuilder, SelectArgs, StatementKind};
use serde_json::{Map, Value};
use std::sync::Arc;

pub struct DatabaseManager {
    db: Arc<dyn Database>,
    builder: QueryBuilder,
    retriever: MetadataRetriever,
    cache: CacheManager,
    prefix: String,
}

/// Text form of a key value for comparisons and messages.
fn plain(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn count_value(rows: &[Row]) -> u64 {
    match rows.first().and_then(|r| r.get("total")) {
        Some(Value::Number(n)) => n.as_u64().unwrap_or(0),
        Some(Value::String(s)) => s.parse().unwrap_or(0),
        _ => 0,
    }
}

impl DatabaseManager {
    pub fn new(db: Arc<dyn Database>, prefix: impl Into<String>) -> Self {
        let backend = db.backend();
        Self {
            retriever: MetadataRetriever::new(db.clone()),
            builder: QueryBuilder::new(backend),
            cache: CacheManager::new(),
            prefix: prefix.into(),
            db,
        }
    }

    pub fn backend(&self) -> Backend {
        self.db.backend()
    }

    pub async fn ping(&self) -> Result<(), AppError> {
        self.db.ping().await.map_err(AppError::from)
    }

    fn base_url(&self, table: &str) -> String {
        format!("{}/{}", self.prefix, table)
    }

    pub async fn tables(&self) -> Result<Arc<Vec<String>>, AppError> {
        match self.cache.tables().await {
            Some(tables) => Ok(tables),
            None => self.refresh_tables().await,
        }
    }

    async fn refresh_tables(&self) -> Result<Arc<Vec<String>>, AppError> {
        let tables = self.retriever.tables().await?;
        Ok(self.cache.set_tables(tables).await)
    }

    /// Metadata for `name`. A name missing from the cached list re-reads the catalog once.
    pub async fn table(&self, name: &str) -> Result<Arc<TableMetadata>, AppError> {
        if let Some(meta) = self.cache.get(name).await {
            return Ok(meta);
        }
        let tables = match self.cache.tables().await {
            Some(cached) if cached.iter().any(|t| t == name) => cached,
            _ => self.refresh_tables().await?,
        };
        if !tables.iter().any(|t| t == name) {
            return Err(AppError::TableNotFound(name.to_string()));
        }
        match self.retriever.table(name).await? {
            Some(meta) => Ok(self.cache.insert(meta).await),
            None => Err(AppError::TableNotFound(name.to_string())),
        }
    }

    pub async fn primary_key(&self, table: &str) -> Result<String, AppError> {
        self.table(table)
            .await?
            .primary_key
            .clone()
            .ok_or_else(|| AppError::NoPrimaryKey(table.to_string()))
    }

    pub async fn column_names(&self, table: &str) -> Result<Vec<String>, AppError> {
        let meta = self.table(table).await?;
        Ok(meta.column_names().into_iter().map(str::to_string).collect())
    }

    pub async fn required_fields(&self, table: &str) -> Result<Vec<String>, AppError> {
        let meta = self.table(table).await?;
        Ok(meta.required_columns().into_iter().map(str::to_string).collect())
    }

    pub async fn unique_fields(&self, table: &str) -> Result<Vec<String>, AppError> {
        let meta = self.table(table).await?;
        Ok(meta.unique_columns().into_iter().map(str::to_string).collect())
    }

    /// A failed statement may mean the schema changed under us: drop the cached metadata.
    async fn on_failure(&self, table: &str, q: &QueryBuf, e: &sqlx::Error) {
        tracing::error!(target: "db", table = %table, sql = %q.sql, error = %e, "query failed");
        if matches!(e, sqlx::Error::Database(_)) {
            self.cache.invalidate(table).await;
        }
    }

    async fn fetch(&self, table: &str, q: &QueryBuf) -> Result<Vec<Row>, AppError> {
        match self.db.fetch_all(&q.sql, &q.params).await {
            Ok(rows) => Ok(rows),
            Err(e) => {
                self.on_failure(table, q, &e).await;
                Err(e.into())
            }
        }
    }

    async fn exec(&self, table: &str, q: &QueryBuf) -> Result<ExecOutcome, AppError> {
        match self.db.execute(&q.sql, &q.params).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                self.on_failure(table, q, &e).await;
                Err(e.into())
            }
        }
    }

    /// Path id coerced to the primary key column's type.
    fn key_value(meta: &TableMetadata, id: &str) -> Value {
        meta.primary_key_column()
            .map(|c| c.coerce(id))
            .unwrap_or_else(|| Value::String(id.to_string()))
    }

    async fn find(&self, meta: &TableMetadata, column: &str, value: &Value) -> Result<Vec<Row>, AppError> {
        let q = self.builder.select_by_key(meta, column, value);
        self.fetch(&meta.name, &q).await
    }

    /// Rows matching `args`, with a COUNT over the same filters when the result is paged.
    pub async fn select(
        &self,
        table: &str,
        args: &SelectArgs,
        arguments: Map<String, Value>,
    ) -> Result<QueryResult, AppError> {
        let meta = self.table(table).await?;
        let q = self.builder.select(&meta, args);
        let rows = self.fetch(table, &q).await?;
        let page = match args.limit {
            Some(limit) => {
                let count = self.builder.count(&meta, &args.filters);
                let total = count_value(&self.fetch(table, &count).await?);
                Page {
                    total_records: total,
                    limit: Some(limit),
                    offset: args.offset.unwrap_or(0),
                }
            }
            None => Page::whole(rows.len() as u64),
        };
        let affected = rows.len() as u64;
        Ok(QueryResult::new(
            q.sql,
            q.kind,
            arguments,
            rows,
            affected,
            page,
            &self.base_url(table),
        ))
    }

    pub async fn select_one(
        &self,
        table: &str,
        id: &str,
        arguments: Map<String, Value>,
    ) -> Result<QueryResult, AppError> {
        let meta = self.table(table).await?;
        let pk = self.primary_key(table).await?;
        let q = self.builder.select_by_key(&meta, &pk, &Self::key_value(&meta, id));
        let rows = self.fetch(table, &q).await?;
        if rows.is_empty() {
            return Err(AppError::NotFound {
                table: table.to_string(),
                id: id.to_string(),
            });
        }
        let n = rows.len() as u64;
        Ok(QueryResult::new(
            q.sql,
            q.kind,
            arguments,
            rows,
            n,
            Page::whole(n),
            &self.base_url(table),
        ))
    }

    /// Insert one row. Unique columns (and a supplied primary key) are checked first.
    pub async fn insert(&self, table: &str, body: Map<String, Value>) -> Result<QueryResult, AppError> {
        let meta = self.table(table).await?;
        let mut guarded: Vec<&str> = meta.unique_columns();
        if let Some(pk) = meta.primary_key.as_deref() {
            guarded.push(pk);
        }
        for field in guarded {
            let Some(v) = body.get(field).filter(|v| !v.is_null()) else { continue };
            let q = self.builder.count(&meta, &[(field.to_string(), v.clone())]);
            if count_value(&self.fetch(table, &q).await?) > 0 {
                return Err(AppError::AlreadyUsed {
                    field: field.to_string(),
                    table: table.to_string(),
                });
            }
        }

        let q = self.builder.insert(&meta, &body);
        let (rows, affected) = if self.backend().supports_returning() {
            let rows = self.fetch(table, &q).await?;
            let n = rows.len() as u64;
            (rows, n)
        } else {
            let outcome = self.exec(table, &q).await?;
            let key = meta.primary_key.as_deref().and_then(|pk| {
                body.get(pk)
                    .filter(|v| !v.is_null())
                    .cloned()
                    .or_else(|| outcome.last_insert_id.map(Value::from))
                    .map(|v| (pk, v))
            });
            let rows = match key {
                Some((pk, v)) => self.find(&meta, pk, &v).await?,
                None => Vec::new(),
            };
            (rows, outcome.rows_affected)
        };
        tracing::info!(target: "db", table = %table, rows = affected, "record created");
        let n = rows.len() as u64;
        Ok(QueryResult::new(
            q.sql,
            StatementKind::Insert,
            Map::new(),
            rows,
            affected,
            Page::whole(n),
            &self.base_url(table),
        ))
    }

    /// Update the record `id` with the body's columns and return the re-selected row.
    pub async fn update(
        &self,
        table: &str,
        id: &str,
        mut body: Map<String, Value>,
    ) -> Result<QueryResult, AppError> {
        let meta = self.table(table).await?;
        let pk = self.primary_key(table).await?;
        let key = Self::key_value(&meta, id);
        if self.find(&meta, &pk, &key).await?.is_empty() {
            return Err(AppError::NotFound {
                table: table.to_string(),
                id: id.to_string(),
            });
        }
        if let Some(given) = body.remove(&pk) {
            if Self::key_value(&meta, &plain(&given)) != key {
                return Err(AppError::KeyMismatch {
                    key: pk,
                    id: id.to_string(),
                    table: table.to_string(),
                });
            }
        }
        if !body.keys().any(|k| meta.has_column(k)) {
            return Err(AppError::NothingToUpdate {
                table: table.to_string(),
                id: id.to_string(),
            });
        }

        let q = self.builder.update(&meta, &pk, &key, &body);
        let outcome = self.exec(table, &q).await?;
        let rows = self.find(&meta, &pk, &key).await?;
        tracing::info!(target: "db", table = %table, id = %id, rows = outcome.rows_affected, "record updated");
        let n = rows.len() as u64;
        Ok(QueryResult::new(
            q.sql,
            q.kind,
            Map::new(),
            rows,
            outcome.rows_affected,
            Page::whole(n),
            &self.base_url(table),
        ))
    }

    /// Delete the record `id`; the response carries the row as it was.
    pub async fn delete(&self, table: &str, id: &str) -> Result<QueryResult, AppError> {
        let meta = self.table(table).await?;
        let pk = self.primary_key(table).await?;
        let key = Self::key_value(&meta, id);
        let rows = self.find(&meta, &pk, &key).await?;
        if rows.is_empty() {
            return Err(AppError::NotFound {
                table: table.to_string(),
                id: id.to_string(),
            });
        }
        let q = self.builder.delete(&meta, &pk, &key);
        let outcome = self.exec(table, &q).await?;
        tracing::info!(target: "db", table = %table, id = %id, rows = outcome.rows_affected, "record deleted");
        let n = rows.len() as u64;
        Ok(QueryResult::new(
            q.sql,
            q.kind,
            Map::new(),
            rows,
            outcome.rows_affected,
            Page::whole(n),
            &self.base_url(table),
        ))
    }
}
