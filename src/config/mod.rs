//! Configuration: schema and file loading.

pub mod loader;
pub mod schema;
