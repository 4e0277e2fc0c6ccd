//! Typed settings, one section per concern.

use crate::database::Backend;
use std::collections::HashMap;

pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_RATE_LIMIT_PER_MINUTE: u32 = 60;
pub const DEFAULT_LIMIT: u64 = 100;
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;
pub const API_PREFIX: &str = "/api/v1";
pub const DEFAULT_LOG_FILTER: &str = "sql_gateway=info,app=info,db=info,api=info,server=info";

#[derive(Clone, Debug)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub server: ServerSettings,
    pub api: ApiSettings,
    pub logging: LoggingSettings,
}

/// Where to connect: a full URL, or discrete parts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DatabaseTarget {
    Url(String),
    Parts {
        host: String,
        port: u16,
        user: String,
        password: String,
        database: String,
    },
}

#[derive(Clone, Debug)]
pub struct DatabaseSettings {
    pub backend: Backend,
    pub target: DatabaseTarget,
    pub max_connections: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppEnv::Development => "development",
            AppEnv::Production => "production",
        }
    }
}

#[derive(Clone, Debug)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub env: AppEnv,
}

#[derive(Clone, Debug)]
pub struct ApiSettings {
    /// API key -> secret.
    pub api_keys: HashMap<String, String>,
    pub allowed_origins: Vec<String>,
    pub hidden_tables: Vec<String>,
    /// Requests per client per minute; 0 disables the limiter.
    pub rate_limit_per_minute: u32,
    /// Key rate limits on `X-Forwarded-For`; only set behind a proxy that overwrites it.
    pub trust_forwarded_for: bool,
    /// Applied when a select carries no `limit`; `None` returns every row.
    pub default_limit: Option<u64>,
    pub max_body_bytes: usize,
    pub prefix: String,
}

impl ApiSettings {
    pub fn auth_enabled(&self) -> bool {
        !self.api_keys.is_empty()
    }

    pub fn is_allowed_origin(&self, origin: &str) -> bool {
        self.allowed_origins.iter().any(|o| o == origin)
    }
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            api_keys: HashMap::new(),
            allowed_origins: Vec::new(),
            hidden_tables: Vec::new(),
            rate_limit_per_minute: DEFAULT_RATE_LIMIT_PER_MINUTE,
            trust_forwarded_for: false,
            default_limit: Some(DEFAULT_LIMIT),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            prefix: API_PREFIX.to_string(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct LoggingSettings {
    /// `RUST_LOG`-style directive string.
    pub filter: String,
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: DEFAULT_LOG_FILTER.to_string(),
            json: false,
        }
    }
}
