//! Product catalog access.
//!
//! The catalog is an external, read-only CSV file. This module parses it into
//! [`Product`] records and optionally keeps the parsed result in memory.

pub mod loader;
pub mod types;

pub use loader::{load_catalog, Catalog, CatalogError};
pub use types::Product;
