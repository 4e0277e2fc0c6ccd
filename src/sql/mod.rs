//! Safe SQL builder: identifiers from discovered metadata only, values as parameters.

mod builder;
pub mod dialect;
pub mod params;
pub use builder::*;
pub use params::*;
