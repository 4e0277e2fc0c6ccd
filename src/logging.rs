//! Process-wide tracing subscriber.
//!
//! Events are grouped by target: `app` (bootstrap, middleware), `db` (connections, statements),
//! `api` (request arguments) and `server` (listener).

use crate::config::LoggingSettings;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber. `RUST_LOG` directives are taken from `settings.filter`.
pub fn init(settings: &LoggingSettings) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = EnvFilter::try_new(&settings.filter)?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    if settings.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    }
}
