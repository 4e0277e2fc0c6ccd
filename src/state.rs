//! Shared application state for all routes.

use crate::config::Settings;
use crate::database::Database;
use crate::middleware::RateLimiter;
use crate::service::DatabaseManager;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<DatabaseManager>,
    pub settings: Arc<Settings>,
    pub rate_limiter: Arc<RateLimiter>,
}

impl AppState {
    pub fn new(db: Arc<dyn Database>, settings: Settings) -> Self {
        let manager = DatabaseManager::new(db, settings.api.prefix.clone());
        let rate_limiter = RateLimiter::per_minute(settings.api.rate_limit_per_minute);
        Self {
            manager: Arc::new(manager),
            settings: Arc::new(settings),
            rate_limiter: Arc::new(rate_limiter),
        }
    }
}
