//! CLI command implementations.

pub mod baseline;
pub mod info;
pub mod migrate;
pub mod validate;
pub mod version;
