pub mod catalog;
pub mod error;

pub use catalog::{Catalog, LocationField, MigrationRecord};
pub use error::{Error, Result};
