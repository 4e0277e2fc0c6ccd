//! Standard response envelope.

use crate::database::Row;
use crate::sql::StatementKind;
use axum::{http::StatusCode, Json};
use serde::Serialize;
use serde_json::{Map, Value};

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Status {
    pub success: bool,
    #[serde(rename = "type")]
    pub kind: &'static str,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct SqlInfo {
    pub statement: String,
    #[serde(rename = "type")]
    pub kind: StatementKind,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct QueryInfo {
    pub sql: SqlInfo,
    /// Raw query-string arguments of the request.
    pub arguments: Map<String, Value>,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageMeta {
    pub total_records: u64,
    pub page: u64,
    pub per_page: u64,
    pub total_pages: u64,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Links {
    #[serde(rename = "self")]
    pub self_link: String,
    pub next: Option<String>,
    pub prev: Option<String>,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Timestamp {
    pub utc: String,
}

/// Envelope returned by every table endpoint.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct QueryResult {
    pub success: bool,
    pub status: Status,
    pub affected_rows: u64,
    /// Whether the statement produced rows.
    pub result_group: bool,
    pub query: QueryInfo,
    pub data: Vec<Row>,
    pub meta: PageMeta,
    pub links: Links,
    pub timestamp: Timestamp,
}

/// Paging window of a result: total matching rows and the requested slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub total_records: u64,
    pub limit: Option<u64>,
    pub offset: u64,
}

impl Page {
    /// A result that is not paged: everything is on page one.
    pub fn whole(total_records: u64) -> Self {
        Self {
            total_records,
            limit: None,
            offset: 0,
        }
    }

    pub fn meta(&self) -> PageMeta {
        match self.limit {
            Some(limit) if limit > 0 => PageMeta {
                total_records: self.total_records,
                page: self.offset / limit + 1,
                per_page: limit,
                total_pages: self.total_records.div_ceil(limit),
            },
            _ => PageMeta {
                total_records: self.total_records,
                page: 1,
                per_page: self.total_records,
                total_pages: 1,
            },
        }
    }

    /// `self`/`next`/`prev` links under `base` (e.g. `/api/v1/users`).
    pub fn links(&self, base: &str) -> Links {
        let meta = self.meta();
        match self.limit {
            Some(limit) if limit > 0 => Links {
                self_link: format!("{}?offset={}&limit={}", base, self.offset, limit),
                next: (meta.page < meta.total_pages)
                    .then(|| format!("{}?offset={}&limit={}", base, self.offset + limit, limit)),
                prev: (meta.page > 1)
                    .then(|| format!("{}?offset={}&limit={}", base, self.offset.saturating_sub(limit), limit)),
            },
            _ => Links {
                self_link: base.to_string(),
                next: None,
                prev: None,
            },
        }
    }
}

impl QueryResult {
    pub fn new(
        statement: String,
        kind: StatementKind,
        arguments: Map<String, Value>,
        data: Vec<Row>,
        affected_rows: u64,
        page: Page,
        base_url: &str,
    ) -> Self {
        QueryResult {
            success: true,
            status: Status {
                success: true,
                kind: if kind.is_mutation() { "success" } else { "info" },
            },
            affected_rows,
            result_group: !data.is_empty(),
            query: QueryInfo {
                sql: SqlInfo { statement, kind },
                arguments,
            },
            meta: page.meta(),
            links: page.links(base_url),
            data,
            timestamp: Timestamp {
                utc: chrono::Utc::now().to_rfc3339(),
            },
        }
    }
}

pub fn success(result: QueryResult) -> (StatusCode, Json<QueryResult>) {
    (StatusCode::OK, Json(result))
}

pub fn success_created(result: QueryResult) -> (StatusCode, Json<QueryResult>) {
    (StatusCode::CREATED, Json(result))
}
