//! Build [`Settings`] from environment variables.

use crate::config::types::*;
use crate::config::validate;
use crate::database::Backend;
use crate::error::ConfigError;
use std::collections::HashMap;
use std::str::FromStr;

impl Settings {
    /// Load `.env` (if present) and read the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                return Err(ConfigError::Invalid {
                    key: ".env",
                    message: e.to_string(),
                });
            }
        }
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Build settings from any key lookup. Blank values count as unset.
    pub fn from_vars<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let database = load_database(&get)?;

        let env = match get("APP_ENV").as_deref() {
            None => AppEnv::Development,
            Some(v) => parse_app_env(v)?,
        };
        let server = ServerSettings {
            host: get("APP_HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: parse_or("APP_PORT", get("APP_PORT"), DEFAULT_PORT)?,
            env,
        };

        let default_limit = match get("API_DEFAULT_LIMIT") {
            None => Some(DEFAULT_LIMIT),
            Some(v) => {
                let n: u64 = parse_value("API_DEFAULT_LIMIT", &v)?;
                (n > 0).then_some(n)
            }
        };
        let api = ApiSettings {
            api_keys: match get("API_KEYS") {
                Some(v) => parse_secrets(&v)?,
                None => HashMap::new(),
            },
            allowed_origins: parse_list(get("ALLOWED_ORIGINS")),
            hidden_tables: parse_list(get("HIDDEN_TABLES")),
            rate_limit_per_minute: parse_or(
                "RATE_LIMIT_PER_MINUTE",
                get("RATE_LIMIT_PER_MINUTE"),
                DEFAULT_RATE_LIMIT_PER_MINUTE,
            )?,
            trust_forwarded_for: parse_or("TRUST_PROXY", get("TRUST_PROXY"), false)?,
            default_limit,
            max_body_bytes: parse_or("API_MAX_BODY_BYTES", get("API_MAX_BODY_BYTES"), DEFAULT_MAX_BODY_BYTES)?,
            prefix: API_PREFIX.to_string(),
        };

        let logging = LoggingSettings {
            filter: get("RUST_LOG").unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string()),
            json: get("LOG_FORMAT").is_some_and(|v| v.eq_ignore_ascii_case("json")),
        };

        let settings = Settings {
            database,
            server,
            api,
            logging,
        };
        validate(&settings)?;
        Ok(settings)
    }
}

fn load_database<G>(get: &G) -> Result<DatabaseSettings, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    let max_connections = parse_or("DB_MAX_CONNECTIONS", get("DB_MAX_CONNECTIONS"), DEFAULT_MAX_CONNECTIONS)?;
    let declared = get("DB_TYPE").map(|t| Backend::from_str(&t)).transpose()?;

    if let Some(url) = get("DATABASE_URL") {
        let backend = match declared {
            Some(b) => b,
            None => Backend::from_url(&url)?,
        };
        return Ok(DatabaseSettings {
            backend,
            target: DatabaseTarget::Url(url),
            max_connections,
        });
    }

    let backend = declared.ok_or(ConfigError::Missing("DATABASE_URL or DB_TYPE"))?;
    let database = get("DB_NAME").ok_or(ConfigError::Missing("DB_NAME"))?;
    let target = if backend == Backend::Sqlite {
        DatabaseTarget::Parts {
            host: String::new(),
            port: 0,
            user: String::new(),
            password: String::new(),
            database,
        }
    } else {
        DatabaseTarget::Parts {
            host: get("DB_HOST").unwrap_or_else(|| "localhost".to_string()),
            port: parse_or("DB_PORT", get("DB_PORT"), backend.default_port())?,
            user: get("DB_USER").ok_or(ConfigError::Missing("DB_USER"))?,
            password: get("DB_PASS").unwrap_or_default(),
            database,
        }
    };
    Ok(DatabaseSettings {
        backend,
        target,
        max_connections,
    })
}

fn parse_app_env(v: &str) -> Result<AppEnv, ConfigError> {
    match v.to_lowercase().as_str() {
        "development" | "dev" => Ok(AppEnv::Development),
        "production" | "prod" => Ok(AppEnv::Production),
        other => Err(ConfigError::Invalid {
            key: "APP_ENV",
            message: format!("`{}` is not one of development, production", other),
        }),
    }
}

fn parse_value<T: FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    raw.parse::<T>().map_err(|e| ConfigError::Invalid {
        key,
        message: format!("`{}`: {}", raw, e),
    })
}

fn parse_or<T: FromStr>(key: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match raw {
        Some(v) => parse_value(key, &v),
        None => Ok(default),
    }
}

/// Comma separated list; blank entries dropped.
pub fn parse_list(raw: Option<String>) -> Vec<String> {
    raw.map(|v| {
        v.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

/// Parse `key:secret,key2:secret2` into a map.
pub fn parse_secrets(raw: &str) -> Result<HashMap<String, String>, ConfigError> {
    let mut out = HashMap::new();
    for pair in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        match pair.split_once(':') {
            Some((key, secret)) if !key.trim().is_empty() && !secret.trim().is_empty() => {
                out.insert(key.trim().to_string(), secret.trim().to_string());
            }
            _ => {
                return Err(ConfigError::Invalid {
                    key: "API_KEYS",
                    message: format!("expected `key:secret`, got `{}`", pair),
                })
            }
        }
    }
    Ok(out)
}
