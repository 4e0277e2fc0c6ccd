//! Builds parameterized SELECT, COUNT, INSERT, UPDATE, DELETE from discovered table metadata.

use crate::database::Backend;
use crate::metadata::{ColumnMetadata, TableMetadata};
use crate::sql::dialect::{placeholder, quote_ident, select_expr};
use crate::sql::BindValue;
use serde::Serialize;
use serde_json::{Map, Value};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatementKind {
    Select,
    Insert,
    Update,
    Delete,
}

impl StatementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatementKind::Select => "select",
            StatementKind::Insert => "insert",
            StatementKind::Update => "update",
            StatementKind::Delete => "delete",
        }
    }

    pub fn is_mutation(&self) -> bool {
        !matches!(self, StatementKind::Select)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    /// `asc` / `desc`, case-insensitive; anything else sorts ascending.
    pub fn parse(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("desc") {
            SortOrder::Desc
        } else {
            SortOrder::Asc
        }
    }

    fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Filters, ordering and paging for a select.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SelectArgs {
    /// Equality filters, ANDed, in request order.
    pub filters: Vec<(String, Value)>,
    pub order_by: Option<String>,
    pub sort: SortOrder,
    pub limit: Option<u64>,
    /// Only emitted together with `limit`.
    pub offset: Option<u64>,
}

pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<BindValue>,
    pub kind: StatementKind,
}

impl QueryBuf {
    fn new(kind: StatementKind) -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
            kind,
        }
    }
}

/// Dialect-aware statement builder. Identifiers come from metadata; values are always parameters.
#[derive(Clone, Copy, Debug)]
pub struct QueryBuilder {
    backend: Backend,
}

impl QueryBuilder {
    pub fn new(backend: Backend) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    fn quoted(&self, s: &str) -> String {
        quote_ident(self.backend, s)
    }

    fn select_list(&self, table: &TableMetadata) -> String {
        if table.columns.is_empty() {
            return "*".to_string();
        }
        table
            .columns
            .iter()
            .map(|c| select_expr(self.backend, c))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn push_param(&self, q: &mut QueryBuf, column: Option<&ColumnMetadata>, v: &Value) -> String {
        q.params.push(BindValue::from_json(v));
        placeholder(self.backend, q.params.len(), column)
    }

    /// ` WHERE a = ? AND b = ?` for filters on known columns; empty when none apply.
    fn where_clause(&self, q: &mut QueryBuf, table: &TableMetadata, filters: &[(String, Value)]) -> String {
        let mut parts = Vec::new();
        for (col, val) in filters {
            let Some(c) = table.column(col) else { continue };
            let ph = self.push_param(q, Some(c), val);
            parts.push(format!("{} = {}", self.quoted(col), ph));
        }
        if parts.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", parts.join(" AND "))
        }
    }

    /// SELECT with equality filters, ORDER BY (requested column, else primary key) and LIMIT/OFFSET.
    pub fn select(&self, table: &TableMetadata, args: &SelectArgs) -> QueryBuf {
        let mut q = QueryBuf::new(StatementKind::Select);
        let where_clause = self.where_clause(&mut q, table, &args.filters);
        let order_col = args
            .order_by
            .as_deref()
            .filter(|c| table.has_column(c))
            .or(table.primary_key.as_deref());
        let order_clause = order_col
            .map(|c| format!(" ORDER BY {} {}", self.quoted(c), args.sort.as_sql()))
            .unwrap_or_default();
        let page_clause = match (args.limit, args.offset) {
            (Some(limit), Some(offset)) if offset > 0 => format!(" LIMIT {} OFFSET {}", limit, offset),
            (Some(limit), _) => format!(" LIMIT {}", limit),
            (None, _) => String::new(),
        };
        q.sql = format!(
            "SELECT {} FROM {}{}{}{}",
            self.select_list(table),
            self.quoted(&table.name),
            where_clause,
            order_clause,
            page_clause
        );
        q
    }

    pub fn count(&self, table: &TableMetadata, filters: &[(String, Value)]) -> QueryBuf {
        let mut q = QueryBuf::new(StatementKind::Select);
        let where_clause = self.where_clause(&mut q, table, filters);
        q.sql = format!(
            "SELECT COUNT(*) AS total FROM {}{}",
            self.quoted(&table.name),
            where_clause
        );
        q
    }

    pub fn select_by_key(&self, table: &TableMetadata, column: &str, value: &Value) -> QueryBuf {
        let mut q = QueryBuf::new(StatementKind::Select);
        let ph = self.push_param(&mut q, table.column(column), value);
        q.sql = format!(
            "SELECT {} FROM {} WHERE {} = {}",
            self.select_list(table),
            self.quoted(&table.name),
            self.quoted(column),
            ph
        );
        q
    }

    /// INSERT of the body's known columns, in table order. Postgres and SQLite return the new row.
    pub fn insert(&self, table: &TableMetadata, body: &Map<String, Value>) -> QueryBuf {
        let mut q = QueryBuf::new(StatementKind::Insert);
        let mut cols = Vec::new();
        let mut placeholders = Vec::new();
        for c in &table.columns {
            let Some(v) = body.get(&c.name) else { continue };
            placeholders.push(self.push_param(&mut q, Some(c), v));
            cols.push(self.quoted(&c.name));
        }
        let target = self.quoted(&table.name);
        q.sql = if cols.is_empty() {
            match self.backend {
                Backend::MySql => format!("INSERT INTO {} () VALUES ()", target),
                Backend::Postgres | Backend::Sqlite => format!("INSERT INTO {} DEFAULT VALUES", target),
            }
        } else {
            format!(
                "INSERT INTO {} ({}) VALUES ({})",
                target,
                cols.join(", "),
                placeholders.join(", ")
            )
        };
        if self.backend.supports_returning() {
            q.sql.push_str(" RETURNING ");
            q.sql.push_str(&self.select_list(table));
        }
        q
    }

    /// UPDATE ... SET for the body's known columns, primary key excluded.
    pub fn update(&self, table: &TableMetadata, pk: &str, id: &Value, body: &Map<String, Value>) -> QueryBuf {
        let mut q = QueryBuf::new(StatementKind::Update);
        let mut sets = Vec::new();
        for c in &table.columns {
            if c.name == pk {
                continue;
            }
            let Some(v) = body.get(&c.name) else { continue };
            let ph = self.push_param(&mut q, Some(c), v);
            sets.push(format!("{} = {}", self.quoted(&c.name), ph));
        }
        let id_ph = self.push_param(&mut q, table.column(pk), id);
        q.sql = format!(
            "UPDATE {} SET {} WHERE {} = {}",
            self.quoted(&table.name),
            sets.join(", "),
            self.quoted(pk),
            id_ph
        );
        q
    }

    pub fn delete(&self, table: &TableMetadata, pk: &str, id: &Value) -> QueryBuf {
        let mut q = QueryBuf::new(StatementKind::Delete);
        let ph = self.push_param(&mut q, table.column(pk), id);
        q.sql = format!(
            "DELETE FROM {} WHERE {} = {}",
            self.quoted(&table.name),
            self.quoted(pk),
            ph
        );
        q
    }
}
