//! Resolve the request origin and which tables it may see.

use crate::config::ApiSettings;
use crate::error::AppError;
use crate::state::AppState;
use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};

/// Origin of the request: `Origin`, else `Referer` reduced to scheme and authority, else `Host`.
/// A value without a scheme is taken as `http://`.
pub fn request_origin(headers: &HeaderMap) -> Option<String> {
    let header_value = |name: header::HeaderName| {
        headers
            .get(name)
            .and_then(|v: &axum::http::HeaderValue| v.to_str().ok())
            .map(|s: &str| s.trim().to_string())
            .filter(|s: &String| !s.is_empty() && s != "null")
    };
    let raw = header_value(header::ORIGIN)
        .or_else(|| header_value(header::REFERER).map(|r| strip_path(&r)))
        .or_else(|| header_value(header::HOST))?;
    Some(if raw.contains("://") {
        raw
    } else {
        format!("http://{}", raw)
    })
}

fn strip_path(url: &str) -> String {
    match url.split_once("://") {
        Some((scheme, rest)) => {
            let authority = rest.split(['/', '?', '#']).next().unwrap_or(rest);
            format!("{}://{}", scheme, authority)
        }
        None => url.split(['/', '?', '#']).next().unwrap_or(url).to_string(),
    }
}

/// Tables hidden from this request. Trusted origins see everything.
#[derive(Clone, Debug)]
pub struct Visibility {
    pub origin: Option<String>,
    hidden: Vec<String>,
}

impl Visibility {
    pub fn for_origin(origin: Option<String>, api: &ApiSettings) -> Self {
        let trusted = origin.as_deref().is_some_and(|o| api.is_allowed_origin(o));
        Self {
            hidden: if trusted { Vec::new() } else { api.hidden_tables.clone() },
            origin,
        }
    }

    pub fn is_visible(&self, table: &str) -> bool {
        !self.hidden.iter().any(|t| t == table)
    }

    pub fn check(&self, table: &str) -> Result<(), AppError> {
        if self.is_visible(table) {
            Ok(())
        } else {
            tracing::warn!(target: "app", table = %table, origin = ?self.origin, "hidden table requested");
            Err(AppError::TableHidden(table.to_string()))
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for Visibility {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        Ok(Visibility::for_origin(
            request_origin(&parts.headers),
            &state.settings.api,
        ))
    }
}
