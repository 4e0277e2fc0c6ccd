//! Database engine adapters.
//!
//! Each adapter owns a sqlx pool for one backend, executes raw parameterized
//! statements and normalizes driver rows into JSON objects.

pub mod engines;

use crate::config::{DatabaseSettings, DatabaseTarget};
use crate::error::{AppError, ConfigError};
use crate::sql::BindValue;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::str::FromStr;
use std::sync::Arc;

pub use engines::{MySqlDatabase, PostgresDatabase, SqliteDatabase};

/// One result row keyed by column name.
pub type Row = Map<String, Value>;

/// Supported SQL backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// MySQL or MariaDB
    MySql,
    /// PostgreSQL
    Postgres,
    /// SQLite
    Sqlite,
}

impl Backend {
    /// Infer the backend from a connection URL scheme.
    pub fn from_url(url: &str) -> Result<Self, ConfigError> {
        let lower = url.to_lowercase();
        if lower.starts_with("postgres://") || lower.starts_with("postgresql://") {
            Ok(Backend::Postgres)
        } else if lower.starts_with("mysql://") || lower.starts_with("mariadb://") {
            Ok(Backend::MySql)
        } else if lower.starts_with("sqlite:") || lower.ends_with(".db") || lower.ends_with(".sqlite") {
            Ok(Backend::Sqlite)
        } else {
            Err(ConfigError::Invalid {
                key: "DATABASE_URL",
                message: format!("unable to determine database type from `{}`", url),
            })
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Backend::MySql => "MySQL",
            Backend::Postgres => "PostgreSQL",
            Backend::Sqlite => "SQLite",
        }
    }

    pub fn default_port(&self) -> u16 {
        match self {
            Backend::MySql => 3306,
            Backend::Postgres => 5432,
            Backend::Sqlite => 0,
        }
    }

    /// Whether INSERT ... RETURNING is available.
    pub fn supports_returning(&self) -> bool {
        matches!(self, Backend::Postgres | Backend::Sqlite)
    }
}

impl FromStr for Backend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mysql" | "mariadb" => Ok(Backend::MySql),
            "postgresql" | "postgres" | "pg" => Ok(Backend::Postgres),
            "sqlite" | "sqlite3" => Ok(Backend::Sqlite),
            other => Err(ConfigError::UnsupportedDatabase(other.to_string())),
        }
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Outcome of a statement that returns no rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecOutcome {
    pub rows_affected: u64,
    /// Auto-generated key of the last inserted row, where the driver reports one.
    pub last_insert_id: Option<i64>,
}

/// Raw statement execution against one backend.
#[async_trait]
pub trait Database: Send + Sync + 'static {
    fn backend(&self) -> Backend;

    /// Run a row-returning statement and normalize every row to JSON.
    async fn fetch_all(&self, sql: &str, params: &[BindValue]) -> Result<Vec<Row>, sqlx::Error>;

    /// Run a statement that does not return rows.
    async fn execute(&self, sql: &str, params: &[BindValue]) -> Result<ExecOutcome, sqlx::Error>;

    /// Round-trip check used by readiness probes.
    async fn ping(&self) -> Result<(), sqlx::Error> {
        self.fetch_all("SELECT 1", &[]).await.map(|_| ())
    }
}

/// Open a pool for the configured backend.
pub async fn connect(settings: &DatabaseSettings) -> Result<Arc<dyn Database>, AppError> {
    let backend = settings.backend;
    tracing::info!(target: "db", backend = %backend, "connecting to database");
    let db: Arc<dyn Database> = match backend {
        Backend::MySql => Arc::new(MySqlDatabase::connect(settings).await.map_err(|e| {
            log_connect_failure(settings, &e);
            e
        })?),
        Backend::Postgres => Arc::new(PostgresDatabase::connect(settings).await.map_err(|e| {
            log_connect_failure(settings, &e);
            e
        })?),
        Backend::Sqlite => Arc::new(SqliteDatabase::connect(settings).await.map_err(|e| {
            log_connect_failure(settings, &e);
            e
        })?),
    };
    tracing::info!(
        target: "db",
        backend = %backend,
        database = %describe_target(&settings.target),
        "successfully established a connection"
    );
    Ok(db)
}

fn log_connect_failure(settings: &DatabaseSettings, e: &sqlx::Error) {
    tracing::error!(
        target: "db",
        backend = %settings.backend,
        database = %describe_target(&settings.target),
        error = %e,
        "failed to establish a connection to the database"
    );
}

/// Human-readable target without credentials.
pub fn describe_target(target: &DatabaseTarget) -> String {
    match target {
        DatabaseTarget::Url(url) => match url.split_once('@') {
            Some((_, rest)) => rest.to_string(),
            None => url.clone(),
        },
        DatabaseTarget::Parts {
            host,
            port,
            database,
            ..
        } => format!("{}:{}/{}", host, port, database),
    }
}
