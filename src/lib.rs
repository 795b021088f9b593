//! # Strata
//!
//! A dialect-aware database schema migration engine.
//!
//! Strata provides:
//! - Versioned and repeatable SQL migrations resolved from script
//!   directories, plus compiled-in code migrations
//! - A dialect-aware statement tokenizer that splits scripts safely across
//!   quoting forms, comments, delimiter redefinition and procedure bodies
//! - A schema history table with checksums, validation and baselining
//! - An exclusive migration lock so concurrent deployments apply each
//!   migration exactly once
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use strata::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> MigrateResult<()> {
//!     let conn = strata::sqlite::connect("app.db")
//!         .await
//!         .map_err(|e| MigrationError::database(e.to_string()))?;
//!
//!     let resolver = SqlMigrationResolver::new(
//!         Arc::new(FilesystemResourceProvider::new()),
//!         vec!["migrations".to_string()],
//!         ResourceNameParser::new(),
//!         DialectRules::for_dialect(Dialect::Sqlite),
//!     );
//!
//!     let history = strata::sqlite::SqliteHistory::new(conn.clone(), "strata_schema_history")
//!         .map_err(|e| MigrationError::database(e.to_string()))?;
//!
//!     let engine = MigrationEngine::new(
//!         MigrateConfig::new(),
//!         Arc::new(strata::sqlite::SqliteExecutor::new(conn)),
//!         history,
//!         Box::new(resolver),
//!         ExecutionStrategy::new(Capabilities::for_dialect(Dialect::Sqlite)),
//!     );
//!
//!     let outcome = engine.migrate().await?;
//!     println!("applied {} migrations", outcome.migrations_applied);
//!     Ok(())
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

/// Per-engine dialect rules and capabilities.
pub mod dialect {
    pub use strata_dialect::*;
}

/// Dialect-aware SQL statement tokenizer.
pub mod sql {
    pub use strata_sql::*;
}

/// Migration resolution, schema history and the engine itself.
pub mod migrate {
    pub use strata_migrate::*;
}

/// SQLite backend.
pub mod sqlite {
    pub use strata_sqlite::*;
}

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::dialect::{Capabilities, Dialect, DialectRules};
    pub use crate::migrate::{
        ExecutionStrategy, FilesystemResourceProvider, MigrateConfig, MigrateResult,
        MigrationEngine, MigrationError, MigrationState, ResourceNameParser,
        SqlMigrationResolver,
    };
    pub use crate::sql::StatementTokenizer;
}

// Re-export key types at the crate root
pub use strata_migrate::{MigrateConfig, MigrateResult, MigrationEngine, MigrationError};
