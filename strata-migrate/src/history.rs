//! Schema history storage.
//!
//! The schema history table is the engine's source of truth about what has
//! already run against a database. Backends implement [`SchemaHistory`];
//! the engine only ever appends rows and reads them back in rank order.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::MigrateResult;
use crate::resolver::MigrationKind;
use crate::version::MigrationVersion;

/// One row of the schema history table.
#[derive(Debug, Clone)]
pub struct AppliedMigration {
    /// Position in the apply order, starting at 1 and strictly increasing.
    pub installed_rank: i32,
    /// The version, or `None` for repeatable migrations.
    pub version: Option<MigrationVersion>,
    /// Description recorded at apply time.
    pub description: String,
    /// The migration category.
    pub kind: MigrationKind,
    /// Script identifier recorded at apply time.
    pub script: String,
    /// Checksum recorded at apply time.
    pub checksum: Option<i32>,
    /// The database user or configured name that ran the migration.
    pub installed_by: String,
    /// When the migration was recorded.
    pub installed_on: DateTime<Utc>,
    /// Wall-clock execution time in milliseconds.
    pub execution_time_ms: i64,
    /// Whether the migration completed. A `false` row that is not
    /// superseded by a later successful row for the same migration blocks
    /// further migrate runs.
    pub success: bool,
}

impl AppliedMigration {
    /// Identity key used to match rows against resolved migrations:
    /// the version for versioned migrations, the description for
    /// repeatables.
    pub fn key(&self) -> AppliedKey<'_> {
        match &self.version {
            Some(version) => AppliedKey::Version(version),
            None => AppliedKey::Description(&self.description),
        }
    }
}

/// Identity of a history row, for matching against resolved migrations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AppliedKey<'a> {
    /// Versioned migration identity.
    Version(&'a MigrationVersion),
    /// Repeatable migration identity.
    Description(&'a str),
}

/// Backend storage for the schema history table and the migration lock.
#[async_trait]
pub trait SchemaHistory: Send + Sync {
    /// Create the history table if it does not exist yet.
    async fn initialize(&self) -> MigrateResult<()>;

    /// Whether the history table exists and contains at least one row.
    async fn exists(&self) -> MigrateResult<bool>;

    /// Read all rows in `installed_rank` order.
    async fn applied(&self) -> MigrateResult<Vec<AppliedMigration>>;

    /// Append one row.
    async fn record(&self, applied: &AppliedMigration) -> MigrateResult<()>;

    /// Acquire the exclusive migration lock, waiting up to `timeout`.
    ///
    /// Errors with [`crate::MigrationError::LockTimeout`] when another
    /// process holds the lock for the whole window.
    async fn acquire_lock(&self, timeout: Duration) -> MigrateResult<()>;

    /// Release the migration lock. Callers release on every exit path,
    /// success or failure.
    async fn release_lock(&self) -> MigrateResult<()>;
}
