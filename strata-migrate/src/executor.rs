//! Statement execution strategy.
//!
//! The engine never talks to a database driver directly. Backends implement
//! [`DatabaseExecutor`]; the [`ExecutionStrategy`] decides the transaction
//! shape around a migration based on the dialect's capabilities and wraps
//! statement failures with the script path and line number.

use async_trait::async_trait;
use strata_dialect::Capabilities;
use strata_sql::SqlStatement;
use tracing::debug;

use crate::error::{MigrateResult, MigrationError};

/// Connection-like handle that can execute raw SQL.
#[async_trait]
pub trait DatabaseExecutor: Send + Sync {
    /// Execute one statement.
    async fn execute(&self, sql: &str) -> MigrateResult<()>;

    /// Begin a transaction.
    async fn begin(&self) -> MigrateResult<()>;

    /// Commit the current transaction.
    async fn commit(&self) -> MigrateResult<()>;

    /// Roll back the current transaction.
    async fn rollback(&self) -> MigrateResult<()>;
}

/// Dialect-aware transactional wrapper around statement execution.
#[derive(Debug, Clone)]
pub struct ExecutionStrategy {
    capabilities: Capabilities,
}

impl ExecutionStrategy {
    /// Create a strategy for the given capabilities.
    pub fn new(capabilities: Capabilities) -> Self {
        Self { capabilities }
    }

    /// The capabilities this strategy was built with.
    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    /// Execute a migration's statements in order.
    ///
    /// One transaction wraps the whole migration when the engine supports
    /// transactional DDL and no statement opts out. Otherwise each statement
    /// commits individually, so a mid-script failure leaves the migration
    /// partially applied; the caller records that as a failed history row.
    pub async fn execute_statements(
        &self,
        db: &dyn DatabaseExecutor,
        script: &str,
        path: &str,
        statements: &[SqlStatement],
    ) -> MigrateResult<()> {
        let transactional = self.capabilities.transactional_ddl
            && statements.iter().all(|s| s.execute_in_transaction);

        if transactional {
            db.begin().await?;
        }

        for statement in statements {
            debug!(script, line = statement.line_number, "executing statement");
            if let Err(err) = db.execute(&statement.sql).await {
                if transactional {
                    // Best effort; the original failure is what matters.
                    let _ = db.rollback().await;
                }
                return Err(MigrationError::statement_failed(
                    script,
                    path,
                    statement.line_number,
                    err.to_string(),
                ));
            }
        }

        if transactional {
            db.commit().await?;
        }

        Ok(())
    }
}
