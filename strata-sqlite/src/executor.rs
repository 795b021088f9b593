//! SQLite statement execution.

use async_trait::async_trait;
use strata_migrate::{DatabaseExecutor, MigrateResult, MigrationError};
use tokio_rusqlite::Connection;
use tracing::debug;

use crate::error::SqliteError;

/// Runs migration statements over a `tokio-rusqlite` connection.
///
/// Cloning is cheap; all clones share the one underlying SQLite connection
/// and its worker thread, so statements from one process never interleave
/// at the driver level.
#[derive(Clone)]
pub struct SqliteExecutor {
    conn: Connection,
}

impl SqliteExecutor {
    /// Wrap an open connection.
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    /// The underlying connection handle.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    async fn batch(&self, sql: String) -> MigrateResult<()> {
        self.conn
            .call(move |conn| {
                conn.execute_batch(&sql)?;
                Ok(())
            })
            .await
            .map_err(|e| MigrationError::from(SqliteError::from(e)))
    }
}

#[async_trait]
impl DatabaseExecutor for SqliteExecutor {
    async fn execute(&self, sql: &str) -> MigrateResult<()> {
        debug!(sql = %sql, "executing migration statement");
        self.batch(sql.to_string()).await
    }

    async fn begin(&self) -> MigrateResult<()> {
        self.batch("BEGIN".to_string()).await
    }

    async fn commit(&self) -> MigrateResult<()> {
        self.batch("COMMIT".to_string()).await
    }

    async fn rollback(&self) -> MigrateResult<()> {
        self.batch("ROLLBACK".to_string()).await
    }
}
