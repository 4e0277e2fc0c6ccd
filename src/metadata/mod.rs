//! Schema discovery and its cache.

pub mod cache;
pub mod retriever;
pub mod types;

pub use cache::CacheManager;
pub use retriever::MetadataRetriever;
pub use types::*;
