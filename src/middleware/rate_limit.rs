//! Fixed-window rate limiting per client.

use crate::config::ApiSettings;
use crate::error::AppError;
use crate::middleware::auth::{is_authorized, API_KEY_HEADER};
use crate::state::AppState;
use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::net::SocketAddr;
use tokio::sync::Mutex;

/// Prune expired windows once the table grows past this many clients.
const PRUNE_THRESHOLD: usize = 10_000;

pub struct RateLimiter {
    max_per_window: u32,
    window: Duration,
    /// client -> (count, window_start)
    clients: Mutex<HashMap<String, (u32, DateTime<Utc>)>>,
}

impl RateLimiter {
    /// `0` disables limiting.
    pub fn per_minute(max: u32) -> Self {
        Self {
            max_per_window: max,
            window: Duration::minutes(1),
            clients: Mutex::new(HashMap::new()),
        }
    }

    pub fn enabled(&self) -> bool {
        self.max_per_window > 0
    }

    /// Count one request for `client`; errors once the window is exhausted.
    pub async fn check(&self, client: &str) -> Result<(), AppError> {
        if !self.enabled() {
            return Ok(());
        }
        let now = Utc::now();
        let mut clients = self.clients.lock().await;
        if clients.len() > PRUNE_THRESHOLD {
            let window = self.window;
            clients.retain(|_, (_, start)| now - *start < window);
        }
        let entry = clients.entry(client.to_string()).or_insert((0, now));

        if now - entry.1 >= self.window {
            entry.0 = 0;
            entry.1 = now;
        }
        if entry.0 >= self.max_per_window {
            return Err(AppError::TooManyRequests(self.max_per_window));
        }
        entry.0 += 1;
        Ok(())
    }
}

/// Authenticated API key, else the client address. `X-Forwarded-For` counts only behind a trusted proxy.
fn client_key(req: &Request, api: &ApiSettings) -> String {
    let headers = req.headers();
    if api.auth_enabled() && is_authorized(&api.api_keys, headers) {
        if let Some(key) = headers.get(API_KEY_HEADER).and_then(|v| v.to_str().ok()) {
            return format!("key:{}", key);
        }
    }
    if api.trust_forwarded_for {
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|ip| !ip.is_empty());
        if let Some(ip) = forwarded {
            return format!("ip:{}", ip);
        }
    }
    match req.extensions().get::<ConnectInfo<SocketAddr>>() {
        Some(ConnectInfo(addr)) => format!("ip:{}", addr.ip()),
        None => "anonymous".to_string(),
    }
}

pub async fn rate_limit(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let client = client_key(&req, &state.settings.api);
    if let Err(e) = state.rate_limiter.check(&client).await {
        tracing::warn!(target: "app", client = %client, path = %req.uri().path(), "rate limit exceeded");
        return Err(e);
    }
    Ok(next.run(req).await)
}
