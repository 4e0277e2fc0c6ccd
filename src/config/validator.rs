//! Settings validation: checks that cannot be expressed while parsing single values.

use crate::config::{DatabaseTarget, Settings};
use crate::database::Backend;
use crate::error::ConfigError;

pub fn validate(settings: &Settings) -> Result<(), ConfigError> {
    if settings.server.port == 0 {
        return Err(ConfigError::Invalid {
            key: "APP_PORT",
            message: "port must be greater than zero".into(),
        });
    }
    if settings.database.max_connections == 0 {
        return Err(ConfigError::Invalid {
            key: "DB_MAX_CONNECTIONS",
            message: "at least one connection is required".into(),
        });
    }
    if settings.api.max_body_bytes == 0 {
        return Err(ConfigError::Invalid {
            key: "API_MAX_BODY_BYTES",
            message: "body limit must be greater than zero".into(),
        });
    }
    if let DatabaseTarget::Parts { port, host, .. } = &settings.database.target {
        if settings.database.backend != Backend::Sqlite {
            if *port == 0 {
                return Err(ConfigError::Invalid {
                    key: "DB_PORT",
                    message: "port must be greater than zero".into(),
                });
            }
            if host.is_empty() {
                return Err(ConfigError::Missing("DB_HOST"));
            }
        }
    }
    for origin in &settings.api.allowed_origins {
        if !origin.contains("://") {
            return Err(ConfigError::Invalid {
                key: "ALLOWED_ORIGINS",
                message: format!("`{}` must include a scheme, e.g. http://{}", origin, origin),
            });
        }
    }
    Ok(())
}
