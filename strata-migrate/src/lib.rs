//! # strata-migrate
//!
//! Core schema migration engine.
//!
//! Migrations are discovered by resolvers (SQL scripts on disk, compiled-in
//! code migrations), ordered by version, validated against the schema
//! history table and applied under an exclusive lock. The crate is backend
//! agnostic: database access goes through the [`DatabaseExecutor`] and
//! [`SchemaHistory`] traits, implemented per engine (see `strata-sqlite`).
//!
//! A typical embedding wires the pieces together like this:
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use strata_dialect::{Capabilities, Dialect, DialectRules};
//! use strata_migrate::{
//!     ExecutionStrategy, FilesystemResourceProvider, MigrateConfig,
//!     MigrationEngine, ResourceNameParser, SqlMigrationResolver,
//! };
//!
//! # async fn wire(db: Arc<dyn strata_migrate::DatabaseExecutor>, history: impl strata_migrate::SchemaHistory) -> strata_migrate::MigrateResult<()> {
//! let resolver = SqlMigrationResolver::new(
//!     Arc::new(FilesystemResourceProvider::new()),
//!     vec!["migrations".to_string()],
//!     ResourceNameParser::new(),
//!     DialectRules::for_dialect(Dialect::Sqlite),
//! );
//!
//! let engine = MigrationEngine::new(
//!     MigrateConfig::new(),
//!     db,
//!     history,
//!     Box::new(resolver),
//!     ExecutionStrategy::new(Capabilities::for_dialect(Dialect::Sqlite)),
//! );
//!
//! let outcome = engine.migrate().await?;
//! println!("applied {} migrations", outcome.migrations_applied);
//! # Ok(())
//! # }
//! ```

pub mod checksum;
pub mod engine;
pub mod error;
pub mod executor;
pub mod history;
pub mod info;
pub mod name;
pub mod resolver;
pub mod resource;
pub mod version;

pub use checksum::{apply_placeholders, checksum, checksum_all};
pub use engine::{MigrateConfig, MigrateOutcome, MigrationEngine};
pub use error::{MigrateResult, MigrationError};
pub use executor::{DatabaseExecutor, ExecutionStrategy};
pub use history::{AppliedKey, AppliedMigration, SchemaHistory};
pub use info::{build_info, MigrationInfo, MigrationState};
pub use name::{NamePrefix, ResourceName, ResourceNameParser};
pub use resolver::{
    CodeMigration, CodeMigrationResolver, CompositeResolver, MigrationExecutor, MigrationKind,
    MigrationResolver, ResolvedMigration, SqlMigrationResolver,
};
pub use resource::{FilesystemResourceProvider, Resource, ResourceProvider};
pub use version::MigrationVersion;
