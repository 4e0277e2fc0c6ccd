//! Request middleware: API keys, rate limiting, routing errors.

pub mod auth;
pub mod errors;
pub mod rate_limit;

pub use auth::require_api_key;
pub use rate_limit::{rate_limit, RateLimiter};
