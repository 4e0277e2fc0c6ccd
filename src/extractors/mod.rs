//! Request extractors.

pub mod visibility;
pub use visibility::{request_origin, Visibility};
