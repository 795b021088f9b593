//! Schema history storage on SQLite.
//!
//! SQLite has no advisory locks, so the migration lock is a single-row
//! compare-and-set on a companion `<table>_lock` table: acquiring means
//! claiming the row while `locked_by` is NULL, and contenders poll until
//! the timeout runs out.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use strata_migrate::{
    AppliedMigration, MigrateResult, MigrationError, MigrationKind, MigrationVersion,
    SchemaHistory,
};
use tokio_rusqlite::Connection;
use tracing::{debug, warn};

use crate::error::{SqliteError, SqliteResult};

/// How often lock contenders retry the claim.
const LOCK_RETRY_INTERVAL: Duration = Duration::from_millis(100);

static LOCK_TOKEN_SEQ: AtomicU64 = AtomicU64::new(0);

/// Row shape as read from SQLite, before version parsing.
struct RawRow {
    installed_rank: i32,
    version: Option<String>,
    description: String,
    kind: String,
    script: String,
    checksum: Option<i32>,
    installed_by: String,
    installed_on: String,
    execution_time_ms: i64,
    success: bool,
}

/// Schema history table and migration lock on a SQLite database.
#[derive(Clone)]
pub struct SqliteHistory {
    conn: Connection,
    table: String,
    lock_table: String,
    token: String,
}

impl SqliteHistory {
    /// Create a history store over an open connection.
    ///
    /// The table name is interpolated into DDL and queries, so only
    /// identifier-safe names (ASCII alphanumerics and underscores) are
    /// accepted.
    pub fn new(conn: Connection, table: impl Into<String>) -> SqliteResult<Self> {
        let table = table.into();
        if table.is_empty()
            || !table
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(SqliteError::config(format!(
                "invalid history table name '{table}'"
            )));
        }

        let token = format!(
            "{}-{}",
            std::process::id(),
            LOCK_TOKEN_SEQ.fetch_add(1, Ordering::Relaxed)
        );
        let lock_table = format!("{table}_lock");
        Ok(Self {
            conn,
            table,
            lock_table,
            token,
        })
    }

    /// The configured history table name.
    pub fn table(&self) -> &str {
        &self.table
    }

    async fn try_claim_lock(&self) -> MigrateResult<bool> {
        let sql = format!(
            "UPDATE {} SET locked_by = ?1, locked_at = ?2 WHERE id = 1 AND locked_by IS NULL",
            self.lock_table
        );
        let token = self.token.clone();
        let now = Utc::now().to_rfc3339();

        let changed = self
            .conn
            .call(move |conn| {
                let changed = conn.execute(&sql, (&token, &now))?;
                Ok(changed)
            })
            .await
            .map_err(|e| MigrationError::from(SqliteError::from(e)))?;

        Ok(changed == 1)
    }
}

#[async_trait]
impl SchemaHistory for SqliteHistory {
    async fn initialize(&self) -> MigrateResult<()> {
        let ddl = format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                installed_rank INTEGER PRIMARY KEY,
                version TEXT,
                description TEXT NOT NULL,
                type TEXT NOT NULL,
                script TEXT NOT NULL,
                checksum INTEGER,
                installed_by TEXT NOT NULL,
                installed_on TEXT NOT NULL,
                execution_time INTEGER NOT NULL,
                success INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS {table}_s_idx ON {table} (success);
            CREATE TABLE IF NOT EXISTS {lock_table} (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                locked_by TEXT,
                locked_at TEXT
            );
            INSERT OR IGNORE INTO {lock_table} (id, locked_by, locked_at)
                VALUES (1, NULL, NULL);",
            table = self.table,
            lock_table = self.lock_table,
        );

        self.conn
            .call(move |conn| {
                conn.execute_batch(&ddl)?;
                Ok(())
            })
            .await
            .map_err(|e| MigrationError::from(SqliteError::from(e)))?;

        debug!(table = %self.table, "schema history initialized");
        Ok(())
    }

    async fn exists(&self) -> MigrateResult<bool> {
        let table = self.table.clone();
        let sql = format!("SELECT COUNT(*) FROM {table}");

        self.conn
            .call(move |conn| {
                let table_count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
                    [&table],
                    |row| row.get(0),
                )?;
                if table_count == 0 {
                    return Ok(false);
                }
                let rows: i64 = conn.query_row(&sql, [], |row| row.get(0))?;
                Ok(rows > 0)
            })
            .await
            .map_err(|e| MigrationError::from(SqliteError::from(e)))
    }

    async fn applied(&self) -> MigrateResult<Vec<AppliedMigration>> {
        let sql = format!(
            "SELECT installed_rank, version, description, type, script, checksum,
                    installed_by, installed_on, execution_time, success
             FROM {} ORDER BY installed_rank",
            self.table
        );

        let raw = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map([], |row| {
                    Ok(RawRow {
                        installed_rank: row.get(0)?,
                        version: row.get(1)?,
                        description: row.get(2)?,
                        kind: row.get(3)?,
                        script: row.get(4)?,
                        checksum: row.get(5)?,
                        installed_by: row.get(6)?,
                        installed_on: row.get(7)?,
                        execution_time_ms: row.get(8)?,
                        success: row.get::<_, i64>(9)? != 0,
                    })
                })?;
                let rows: Result<Vec<_>, _> = rows.collect();
                Ok(rows?)
            })
            .await
            .map_err(|e| MigrationError::from(SqliteError::from(e)))?;

        let mut applied = Vec::with_capacity(raw.len());
        for row in raw {
            let version = match row.version {
                Some(v) => Some(MigrationVersion::parse(&v)?),
                None => None,
            };
            let installed_on = DateTime::parse_from_rfc3339(&row.installed_on)
                .map_err(|e| {
                    MigrationError::database(format!(
                        "invalid installed_on timestamp '{}': {e}",
                        row.installed_on
                    ))
                })?
                .with_timezone(&Utc);

            applied.push(AppliedMigration {
                installed_rank: row.installed_rank,
                version,
                description: row.description,
                kind: MigrationKind::from_str_lossy(&row.kind),
                script: row.script,
                checksum: row.checksum,
                installed_by: row.installed_by,
                installed_on,
                execution_time_ms: row.execution_time_ms,
                success: row.success,
            });
        }

        Ok(applied)
    }

    async fn record(&self, applied: &AppliedMigration) -> MigrateResult<()> {
        let sql = format!(
            "INSERT INTO {} (installed_rank, version, description, type, script,
                             checksum, installed_by, installed_on, execution_time, success)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            self.table
        );

        let rank = applied.installed_rank;
        let version = applied.version.as_ref().map(|v| v.to_string());
        let description = applied.description.clone();
        let kind = applied.kind.as_str();
        let script = applied.script.clone();
        let checksum = applied.checksum;
        let installed_by = applied.installed_by.clone();
        let installed_on = applied.installed_on.to_rfc3339();
        let execution_time = applied.execution_time_ms;
        let success = applied.success as i64;

        self.conn
            .call(move |conn| {
                conn.execute(
                    &sql,
                    (
                        rank,
                        version,
                        description,
                        kind,
                        script,
                        checksum,
                        installed_by,
                        installed_on,
                        execution_time,
                        success,
                    ),
                )?;
                Ok(())
            })
            .await
            .map_err(|e| MigrationError::from(SqliteError::from(e)))
    }

    async fn acquire_lock(&self, timeout: Duration) -> MigrateResult<()> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.try_claim_lock().await? {
                debug!(token = %self.token, "migration lock acquired");
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                warn!(table = %self.lock_table, "gave up waiting for the migration lock");
                return Err(MigrationError::LockTimeout(timeout));
            }
            tokio::time::sleep(LOCK_RETRY_INTERVAL).await;
        }
    }

    async fn release_lock(&self) -> MigrateResult<()> {
        let sql = format!(
            "UPDATE {} SET locked_by = NULL, locked_at = NULL WHERE id = 1 AND locked_by = ?1",
            self.lock_table
        );
        let token = self.token.clone();

        let changed = self
            .conn
            .call(move |conn| {
                let changed = conn.execute(&sql, [&token])?;
                Ok(changed)
            })
            .await
            .map_err(|e| MigrationError::from(SqliteError::from(e)))?;

        if changed == 0 {
            warn!(token = %self.token, "released a lock this process did not hold");
        }
        Ok(())
    }
}
