//! DatabaseManager: generic table CRUD using the safe SQL builder.

mod manager;
mod validation;
pub use manager::DatabaseManager;
pub use validation::RequestValidator;
