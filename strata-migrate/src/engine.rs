//! The migration engine.
//!
//! Ties resolution, validation, history and execution together behind the
//! four public operations: `migrate`, `info`, `validate` and `baseline`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::error::{MigrateResult, MigrationError};
use crate::executor::{DatabaseExecutor, ExecutionStrategy};
use crate::history::{AppliedMigration, SchemaHistory};
use crate::info::{build_info, latest_by_key, MigrationInfo, MigrationState};
use crate::resolver::{MigrationKind, MigrationResolver, ResolvedMigration};
use crate::version::MigrationVersion;

/// Engine configuration.
///
/// Built with chained setters; every field has a working default.
#[derive(Debug, Clone)]
pub struct MigrateConfig {
    /// Name of the schema history table.
    pub table: String,
    /// Recorded in the `installed_by` column of every new history row.
    pub installed_by: String,
    /// Allow versioned migrations below the latest applied version to run.
    pub out_of_order: bool,
    /// Run validation before migrating.
    pub validate_on_migrate: bool,
    /// Tolerate applied migrations that are no longer resolved.
    pub ignore_missing: bool,
    /// How long to wait for the migration lock.
    pub lock_timeout: Duration,
    /// Version recorded by `baseline` when none is given.
    pub baseline_version: String,
    /// Description recorded by `baseline`.
    pub baseline_description: String,
}

impl Default for MigrateConfig {
    fn default() -> Self {
        Self {
            table: "strata_schema_history".to_string(),
            installed_by: "strata".to_string(),
            out_of_order: false,
            validate_on_migrate: true,
            ignore_missing: false,
            lock_timeout: Duration::from_secs(60),
            baseline_version: "1".to_string(),
            baseline_description: "<< Strata Baseline >>".to_string(),
        }
    }
}

impl MigrateConfig {
    /// Create a configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the schema history table name.
    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    /// Set the recorded installer name.
    pub fn installed_by(mut self, installed_by: impl Into<String>) -> Self {
        self.installed_by = installed_by.into();
        self
    }

    /// Allow out-of-order versioned migrations.
    pub fn out_of_order(mut self, out_of_order: bool) -> Self {
        self.out_of_order = out_of_order;
        self
    }

    /// Toggle validation before migrating.
    pub fn validate_on_migrate(mut self, validate: bool) -> Self {
        self.validate_on_migrate = validate;
        self
    }

    /// Tolerate applied-but-unresolved migrations during validation.
    pub fn ignore_missing(mut self, ignore: bool) -> Self {
        self.ignore_missing = ignore;
        self
    }

    /// Set the lock acquisition timeout.
    pub fn lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    /// Set the default baseline version.
    pub fn baseline_version(mut self, version: impl Into<String>) -> Self {
        self.baseline_version = version.into();
        self
    }
}

/// Summary of one `migrate` run.
#[derive(Debug, Clone)]
pub struct MigrateOutcome {
    /// How many migrations were applied in this run.
    pub migrations_applied: usize,
    /// The highest successfully applied version after the run.
    pub current_version: Option<MigrationVersion>,
}

/// The migration engine.
pub struct MigrationEngine<H: SchemaHistory> {
    config: MigrateConfig,
    db: Arc<dyn DatabaseExecutor>,
    history: H,
    resolver: Box<dyn MigrationResolver>,
    strategy: ExecutionStrategy,
}

impl<H: SchemaHistory> MigrationEngine<H> {
    /// Create an engine.
    pub fn new(
        config: MigrateConfig,
        db: Arc<dyn DatabaseExecutor>,
        history: H,
        resolver: Box<dyn MigrationResolver>,
        strategy: ExecutionStrategy,
    ) -> Self {
        Self {
            config,
            db,
            history,
            resolver,
            strategy,
        }
    }

    /// The engine configuration.
    pub fn config(&self) -> &MigrateConfig {
        &self.config
    }

    /// Apply all pending migrations.
    ///
    /// Takes the migration lock for the whole run and releases it on every
    /// exit path. A statement failure records a `success = false` history
    /// row before the error is returned, so the failure is visible to
    /// `info` and blocks later runs until repaired.
    pub async fn migrate(&self) -> MigrateResult<MigrateOutcome> {
        self.history.initialize().await?;
        self.history.acquire_lock(self.config.lock_timeout).await?;

        let outcome = self.run_locked().await;

        match self.history.release_lock().await {
            Ok(()) => outcome,
            Err(release_err) => match outcome {
                // The run itself failed; the release failure is secondary.
                Err(err) => {
                    warn!(error = %release_err, "failed to release migration lock");
                    Err(err)
                }
                Ok(_) => Err(release_err),
            },
        }
    }

    async fn run_locked(&self) -> MigrateResult<MigrateOutcome> {
        let resolved = self.resolver.resolve().await?;
        let applied = self.history.applied().await?;

        if self.config.validate_on_migrate {
            self.validate_inner(&resolved, &applied)?;
        }
        Self::check_failed(&applied)?;

        let infos = build_info(&resolved, &applied, self.config.out_of_order);
        for info in &infos {
            if info.state == MigrationState::Ignored {
                warn!(
                    script = %info.script,
                    "ignoring out-of-order migration below the current version"
                );
            }
        }

        // Versioned pending first (build_info already ordered them), then
        // repeatables that are new or outdated.
        let schedule: Vec<&MigrationInfo> = infos
            .iter()
            .filter(|i| matches!(i.state, MigrationState::Pending | MigrationState::Outdated))
            .collect();

        let mut next_rank = applied
            .iter()
            .map(|row| row.installed_rank)
            .max()
            .unwrap_or(0)
            + 1;
        let mut applied_count = 0usize;

        for item in schedule {
            let Some(migration) = find_resolved(&resolved, item) else {
                continue;
            };

            info!(script = %migration.script, "applying migration");
            let started = Instant::now();
            let result = migration
                .executor
                .execute(
                    self.db.as_ref(),
                    &self.strategy,
                    &migration.script,
                    &migration.physical_location,
                )
                .await;
            let elapsed_ms = started.elapsed().as_millis() as i64;

            let row = AppliedMigration {
                installed_rank: next_rank,
                version: migration.version.clone(),
                description: migration.description.clone(),
                kind: migration.kind,
                script: migration.script.clone(),
                checksum: migration.checksum,
                installed_by: self.config.installed_by.clone(),
                installed_on: Utc::now(),
                execution_time_ms: elapsed_ms,
                success: result.is_ok(),
            };

            match result {
                Ok(()) => {
                    self.history.record(&row).await?;
                    next_rank += 1;
                    applied_count += 1;
                }
                Err(err) => {
                    // A tokenize error means nothing ran; only record a
                    // failed row once statements actually hit the database.
                    if !matches!(err, MigrationError::Tokenize { .. }) {
                        self.history.record(&row).await?;
                    }
                    return Err(err);
                }
            }
        }

        let applied_after = self.history.applied().await?;
        Ok(MigrateOutcome {
            migrations_applied: applied_count,
            current_version: crate::info::latest_applied_version(&applied_after).cloned(),
        })
    }

    /// Report the state of every known migration.
    pub async fn info(&self) -> MigrateResult<Vec<MigrationInfo>> {
        self.history.initialize().await?;
        let resolved = self.resolver.resolve().await?;
        let applied = self.history.applied().await?;
        Ok(build_info(&resolved, &applied, self.config.out_of_order))
    }

    /// Validate resolved migrations against the schema history.
    pub async fn validate(&self) -> MigrateResult<()> {
        self.history.initialize().await?;
        let resolved = self.resolver.resolve().await?;
        let applied = self.history.applied().await?;
        self.validate_inner(&resolved, &applied)?;
        Self::check_failed(&applied)
    }

    fn validate_inner(
        &self,
        resolved: &[ResolvedMigration],
        applied: &[AppliedMigration],
    ) -> MigrateResult<()> {
        let latest = latest_by_key(applied);
        let mut problems = Vec::new();

        for migration in resolved {
            if migration.kind == MigrationKind::UndoSql {
                continue;
            }
            let key = match &migration.version {
                Some(version) => crate::history::AppliedKey::Version(version),
                None => crate::history::AppliedKey::Description(&migration.description),
            };
            let Some(row) = latest.get(&key) else {
                continue;
            };
            // Repeatable drift is a scheduled re-run, not a problem.
            if migration.version.is_some()
                && row.success
                && !migration.checksum_matches(row.checksum)
            {
                problems.push(
                    MigrationError::checksum_mismatch(
                        &migration.script,
                        row.checksum,
                        migration.checksum,
                    )
                    .to_string(),
                );
            }
        }

        if !self.config.ignore_missing {
            for row in latest.values() {
                if row.kind == MigrationKind::Baseline {
                    continue;
                }
                let still_resolved = resolved.iter().any(|m| {
                    m.kind != MigrationKind::UndoSql
                        && match (&m.version, &row.version) {
                            (Some(a), Some(b)) => a == b,
                            (None, None) => m.description == row.description,
                            _ => false,
                        }
                });
                if !still_resolved {
                    problems.push(format!(
                        "applied migration '{}' is no longer resolved from any location",
                        row.script
                    ));
                }
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(MigrationError::Validation(problems.join("\n")))
        }
    }

    fn check_failed(applied: &[AppliedMigration]) -> MigrateResult<()> {
        let latest = latest_by_key(applied);
        for row in latest.values() {
            if !row.success {
                return Err(MigrationError::failed_migration(
                    &row.script,
                    row.version.as_ref().map(|v| v.to_string()).as_deref(),
                ));
            }
        }
        Ok(())
    }

    /// Mark an existing database as already at `version`.
    ///
    /// Records a synthetic baseline row so older versioned migrations are
    /// ignored. Rejected when real migrations have already been applied.
    /// Re-baselining to the same version is a no-op.
    pub async fn baseline(&self, version: Option<&str>) -> MigrateResult<()> {
        self.history.initialize().await?;

        let version_str = version.unwrap_or(&self.config.baseline_version);
        let version = MigrationVersion::parse(version_str)?;

        let applied = self.history.applied().await?;
        if let Some(existing) = applied.iter().find(|row| row.kind == MigrationKind::Baseline) {
            if existing.version.as_ref() == Some(&version) {
                debug!(version = %version, "database already baselined at this version");
                return Ok(());
            }
            return Err(MigrationError::BaselineRejected(format!(
                "already baselined at version {}",
                existing
                    .version
                    .as_ref()
                    .map_or_else(|| "?".to_string(), |v| v.to_string())
            )));
        }
        if !applied.is_empty() {
            return Err(MigrationError::BaselineRejected(
                "schema history already contains applied migrations".to_string(),
            ));
        }

        self.history
            .record(&AppliedMigration {
                installed_rank: 1,
                version: Some(version.clone()),
                description: self.config.baseline_description.clone(),
                kind: MigrationKind::Baseline,
                script: self.config.baseline_description.clone(),
                checksum: None,
                installed_by: self.config.installed_by.clone(),
                installed_on: Utc::now(),
                execution_time_ms: 0,
                success: true,
            })
            .await?;

        info!(version = %version, "baseline recorded");
        Ok(())
    }
}

fn find_resolved<'a>(
    resolved: &'a [ResolvedMigration],
    info: &MigrationInfo,
) -> Option<&'a ResolvedMigration> {
    resolved.iter().find(|m| {
        m.kind != MigrationKind::UndoSql
            && match (&m.version, &info.version) {
                (Some(a), Some(b)) => a == b,
                (None, None) => m.description == info.description,
                _ => false,
            }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use strata_dialect::{Capabilities, Dialect, DialectRules};

    use crate::resolver::MigrationExecutor;

    #[derive(Default)]
    struct MemoryHistory {
        rows: Mutex<Vec<AppliedMigration>>,
        locked: Mutex<bool>,
    }

    impl MemoryHistory {
        fn with_rows(rows: Vec<AppliedMigration>) -> Self {
            Self {
                rows: Mutex::new(rows),
                locked: Mutex::new(false),
            }
        }
    }

    #[async_trait]
    impl SchemaHistory for MemoryHistory {
        async fn initialize(&self) -> MigrateResult<()> {
            Ok(())
        }

        async fn exists(&self) -> MigrateResult<bool> {
            Ok(!self.rows.lock().unwrap().is_empty())
        }

        async fn applied(&self) -> MigrateResult<Vec<AppliedMigration>> {
            Ok(self.rows.lock().unwrap().clone())
        }

        async fn record(&self, applied: &AppliedMigration) -> MigrateResult<()> {
            self.rows.lock().unwrap().push(applied.clone());
            Ok(())
        }

        async fn acquire_lock(&self, timeout: Duration) -> MigrateResult<()> {
            let mut locked = self.locked.lock().unwrap();
            if *locked {
                return Err(MigrationError::LockTimeout(timeout));
            }
            *locked = true;
            Ok(())
        }

        async fn release_lock(&self) -> MigrateResult<()> {
            *self.locked.lock().unwrap() = false;
            Ok(())
        }
    }

    struct MemoryDb {
        executed: Mutex<Vec<String>>,
        fail_on: Option<&'static str>,
    }

    impl MemoryDb {
        fn new() -> Self {
            Self {
                executed: Mutex::new(Vec::new()),
                fail_on: None,
            }
        }

        fn failing_on(sql: &'static str) -> Self {
            Self {
                executed: Mutex::new(Vec::new()),
                fail_on: Some(sql),
            }
        }

        fn executed(&self) -> Vec<String> {
            self.executed.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl DatabaseExecutor for MemoryDb {
        async fn execute(&self, sql: &str) -> MigrateResult<()> {
            self.executed.lock().unwrap().push(sql.to_string());
            if self.fail_on == Some(sql) {
                return Err(MigrationError::database("synthetic failure"));
            }
            Ok(())
        }

        async fn begin(&self) -> MigrateResult<()> {
            Ok(())
        }

        async fn commit(&self) -> MigrateResult<()> {
            Ok(())
        }

        async fn rollback(&self) -> MigrateResult<()> {
            Ok(())
        }
    }

    struct FixedResolver(Vec<ResolvedMigration>);

    #[async_trait]
    impl MigrationResolver for FixedResolver {
        async fn resolve(&self) -> MigrateResult<Vec<ResolvedMigration>> {
            Ok(self.0.clone())
        }
    }

    fn sql(version: Option<&str>, description: &str, content: &str) -> ResolvedMigration {
        let sum = crate::checksum::checksum(content);
        ResolvedMigration {
            version: version.map(|v| MigrationVersion::parse(v).unwrap()),
            description: description.to_string(),
            script: format!(
                "{}{}__{}.sql",
                if version.is_some() { "V" } else { "R" },
                version.unwrap_or(""),
                description.replace(' ', "_")
            ),
            checksum: Some(sum),
            equivalent_checksum: Some(sum),
            kind: MigrationKind::Sql,
            physical_location: format!("/m/{description}.sql"),
            executor: MigrationExecutor::Sql {
                content: content.to_string(),
                rules: DialectRules::for_dialect(Dialect::Sqlite),
            },
        }
    }

    fn engine(
        db: Arc<MemoryDb>,
        history: MemoryHistory,
        migrations: Vec<ResolvedMigration>,
    ) -> MigrationEngine<MemoryHistory> {
        MigrationEngine::new(
            MigrateConfig::new().installed_by("tests"),
            db,
            history,
            Box::new(FixedResolver(migrations)),
            ExecutionStrategy::new(Capabilities::for_dialect(Dialect::Sqlite)),
        )
    }

    #[tokio::test]
    async fn test_migrate_applies_pending_in_order() {
        let db = Arc::new(MemoryDb::new());
        let eng = engine(
            Arc::clone(&db),
            MemoryHistory::default(),
            vec![
                sql(Some("2"), "Second", "CREATE TABLE b (id INT);"),
                sql(Some("1"), "First", "CREATE TABLE a (id INT);"),
            ],
        );

        let outcome = eng.migrate().await.unwrap();
        assert_eq!(outcome.migrations_applied, 2);
        assert_eq!(outcome.current_version.unwrap().to_string(), "2");
        assert_eq!(
            db.executed(),
            vec!["CREATE TABLE a (id INT)", "CREATE TABLE b (id INT)"]
        );

        let rows = eng.history.applied().await.unwrap();
        assert_eq!(rows[0].installed_rank, 1);
        assert_eq!(rows[1].installed_rank, 2);
        assert!(rows.iter().all(|r| r.success));
        assert_eq!(rows[0].installed_by, "tests");
    }

    #[tokio::test]
    async fn test_migrate_is_idempotent() {
        let db = Arc::new(MemoryDb::new());
        let eng = engine(
            Arc::clone(&db),
            MemoryHistory::default(),
            vec![sql(Some("1"), "First", "CREATE TABLE a (id INT);")],
        );

        eng.migrate().await.unwrap();
        let outcome = eng.migrate().await.unwrap();

        assert_eq!(outcome.migrations_applied, 0);
        assert_eq!(db.executed().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_statement_records_failed_row() {
        let db = Arc::new(MemoryDb::failing_on("BROKEN"));
        let eng = engine(
            Arc::clone(&db),
            MemoryHistory::default(),
            vec![sql(Some("1"), "Bad", "CREATE TABLE a (id INT);\nBROKEN;")],
        );

        let err = eng.migrate().await.unwrap_err();
        assert!(matches!(err, MigrationError::StatementFailed { .. }));

        let rows = eng.history.applied().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert!(!rows[0].success);

        // The failed row blocks the next run.
        let err = eng.migrate().await.unwrap_err();
        assert!(matches!(err, MigrationError::FailedMigrationPresent { .. }));
    }

    #[tokio::test]
    async fn test_repeatable_reruns_only_on_checksum_change() {
        let db = Arc::new(MemoryDb::new());
        let history = MemoryHistory::default();
        let eng = engine(
            Arc::clone(&db),
            history,
            vec![sql(None, "Refresh view", "CREATE VIEW v AS SELECT 1;")],
        );
        eng.migrate().await.unwrap();
        let outcome = eng.migrate().await.unwrap();
        assert_eq!(outcome.migrations_applied, 0);

        // Same history, changed script content.
        let rows = eng.history.applied().await.unwrap();
        let eng = engine(
            Arc::clone(&db),
            MemoryHistory::with_rows(rows),
            vec![sql(None, "Refresh view", "CREATE VIEW v AS SELECT 2;")],
        );
        let outcome = eng.migrate().await.unwrap();
        assert_eq!(outcome.migrations_applied, 1);
    }

    #[tokio::test]
    async fn test_checksum_drift_fails_validation() {
        let db = Arc::new(MemoryDb::new());
        let eng = engine(
            Arc::clone(&db),
            MemoryHistory::default(),
            vec![sql(Some("1"), "First", "CREATE TABLE a (id INT);")],
        );
        eng.migrate().await.unwrap();

        let rows = eng.history.applied().await.unwrap();
        let eng = engine(
            Arc::clone(&db),
            MemoryHistory::with_rows(rows),
            vec![sql(Some("1"), "First", "CREATE TABLE a (id BIGINT);")],
        );

        let err = eng.migrate().await.unwrap_err();
        assert!(matches!(err, MigrationError::Validation(_)));
        assert!(eng.validate().await.is_err());
    }

    #[tokio::test]
    async fn test_out_of_order_skipped_unless_enabled() {
        let db = Arc::new(MemoryDb::new());
        let eng = engine(
            Arc::clone(&db),
            MemoryHistory::default(),
            vec![sql(Some("2"), "Second", "CREATE TABLE b (id INT);")],
        );
        eng.migrate().await.unwrap();
        let rows = eng.history.applied().await.unwrap();

        let migrations = vec![
            sql(Some("1.5"), "Late", "CREATE TABLE late (id INT);"),
            sql(Some("2"), "Second", "CREATE TABLE b (id INT);"),
        ];

        let eng = engine(
            Arc::clone(&db),
            MemoryHistory::with_rows(rows.clone()),
            migrations.clone(),
        );
        let outcome = eng.migrate().await.unwrap();
        assert_eq!(outcome.migrations_applied, 0);

        let mut eng = engine(Arc::clone(&db), MemoryHistory::with_rows(rows), migrations);
        eng.config.out_of_order = true;
        let outcome = eng.migrate().await.unwrap();
        assert_eq!(outcome.migrations_applied, 1);
    }

    #[tokio::test]
    async fn test_lock_contention_times_out() {
        let db = Arc::new(MemoryDb::new());
        let history = MemoryHistory::default();
        history.acquire_lock(Duration::from_secs(1)).await.unwrap();

        let eng = engine(
            Arc::clone(&db),
            history,
            vec![sql(Some("1"), "First", "CREATE TABLE a (id INT);")],
        );
        let err = eng.migrate().await.unwrap_err();
        assert!(matches!(err, MigrationError::LockTimeout(_)));
    }

    #[tokio::test]
    async fn test_baseline_then_migrate_skips_older_versions() {
        let db = Arc::new(MemoryDb::new());
        let eng = engine(
            Arc::clone(&db),
            MemoryHistory::default(),
            vec![
                sql(Some("1"), "Old", "CREATE TABLE old (id INT);"),
                sql(Some("3"), "New", "CREATE TABLE new (id INT);"),
            ],
        );

        eng.baseline(Some("2")).await.unwrap();
        // Idempotent for the same version, rejected for a different one.
        eng.baseline(Some("2")).await.unwrap();
        assert!(matches!(
            eng.baseline(Some("4")).await,
            Err(MigrationError::BaselineRejected(_))
        ));

        let outcome = eng.migrate().await.unwrap();
        assert_eq!(outcome.migrations_applied, 1);
        assert_eq!(db.executed(), vec!["CREATE TABLE new (id INT)"]);
    }

    #[tokio::test]
    async fn test_baseline_rejected_after_migrations() {
        let db = Arc::new(MemoryDb::new());
        let eng = engine(
            Arc::clone(&db),
            MemoryHistory::default(),
            vec![sql(Some("1"), "First", "CREATE TABLE a (id INT);")],
        );
        eng.migrate().await.unwrap();

        assert!(matches!(
            eng.baseline(Some("1")).await,
            Err(MigrationError::BaselineRejected(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_applied_migration_fails_validation() {
        let db = Arc::new(MemoryDb::new());
        let eng = engine(
            Arc::clone(&db),
            MemoryHistory::default(),
            vec![sql(Some("1"), "First", "CREATE TABLE a (id INT);")],
        );
        eng.migrate().await.unwrap();
        let rows = eng.history.applied().await.unwrap();

        let eng = engine(Arc::clone(&db), MemoryHistory::with_rows(rows.clone()), vec![]);
        assert!(eng.validate().await.is_err());

        let mut eng = engine(Arc::clone(&db), MemoryHistory::with_rows(rows), vec![]);
        eng.config.ignore_missing = true;
        assert!(eng.validate().await.is_ok());
    }

    #[tokio::test]
    async fn test_undo_scripts_never_scheduled() {
        let mut undo = sql(Some("1"), "Drop a", "DROP TABLE a;");
        undo.kind = MigrationKind::UndoSql;
        undo.script = "U1__Drop_a.sql".to_string();

        let db = Arc::new(MemoryDb::new());
        let eng = engine(
            Arc::clone(&db),
            MemoryHistory::default(),
            vec![sql(Some("1"), "Add a", "CREATE TABLE a (id INT);"), undo],
        );

        let outcome = eng.migrate().await.unwrap();
        assert_eq!(outcome.migrations_applied, 1);
        assert_eq!(db.executed(), vec!["CREATE TABLE a (id INT)"]);
    }
}
