//! HTTP handlers for table CRUD and query-argument parsing.

pub mod args;
pub mod table;
pub use table::*;
