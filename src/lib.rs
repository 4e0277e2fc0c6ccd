//! SQL gateway: REST CRUD over MySQL/MariaDB, PostgreSQL and SQLite tables discovered at runtime.

pub mod config;
pub mod database;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod logging;
pub mod metadata;
pub mod middleware;
pub mod response;
pub mod routes;
pub mod service;
pub mod sql;
pub mod state;

pub use config::Settings;
pub use database::{connect, Backend, Database};
pub use error::{AppError, ConfigError};
pub use response::QueryResult;
pub use routes::app;
pub use service::DatabaseManager;
pub use state::AppState;
