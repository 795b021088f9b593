//! End-to-end migration runs against in-memory SQLite.

use std::path::Path;
use std::sync::Arc;

use strata_dialect::{Capabilities, Dialect, DialectRules};
use strata_migrate::{
    ExecutionStrategy, FilesystemResourceProvider, MigrateConfig, MigrationEngine,
    MigrationError, MigrationState, ResourceNameParser, SchemaHistory, SqlMigrationResolver,
};
use strata_sqlite::{connect_in_memory, SqliteExecutor, SqliteHistory};
use tokio_rusqlite::Connection;

fn engine(conn: Connection, dir: &Path) -> MigrationEngine<SqliteHistory> {
    let resolver = SqlMigrationResolver::new(
        Arc::new(FilesystemResourceProvider::new()),
        vec![dir.display().to_string()],
        ResourceNameParser::new(),
        DialectRules::for_dialect(Dialect::Sqlite),
    );
    let history = SqliteHistory::new(conn.clone(), "strata_schema_history")
        .expect("valid table name");

    MigrationEngine::new(
        MigrateConfig::new().installed_by("tests"),
        Arc::new(SqliteExecutor::new(conn)),
        history,
        Box::new(resolver),
        ExecutionStrategy::new(Capabilities::for_dialect(Dialect::Sqlite)),
    )
}

async fn table_exists(conn: &Connection, name: &str) -> bool {
    let name = name.to_string();
    conn.call(move |conn| {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [&name],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    })
    .await
    .unwrap()
}

#[tokio::test]
async fn test_migrate_applies_pending_and_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("V1__Create_users.sql"),
        "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT NOT NULL);\n",
    )
    .unwrap();
    std::fs::write(
        dir.path().join("V2__Create_posts.sql"),
        "CREATE TABLE posts (id INTEGER PRIMARY KEY, user_id INTEGER REFERENCES users (id));\n\
         CREATE INDEX posts_user_idx ON posts (user_id);\n",
    )
    .unwrap();

    let conn = connect_in_memory().await.unwrap();
    let eng = engine(conn.clone(), dir.path());

    let outcome = eng.migrate().await.unwrap();
    assert_eq!(outcome.migrations_applied, 2);
    assert_eq!(outcome.current_version.unwrap().to_string(), "2");
    assert!(table_exists(&conn, "users").await);
    assert!(table_exists(&conn, "posts").await);

    let infos = eng.info().await.unwrap();
    assert!(infos.iter().all(|i| i.state == MigrationState::Success));
    assert_eq!(infos[0].installed_rank, Some(1));
    assert_eq!(infos[1].installed_rank, Some(2));

    // Nothing to do on a second run.
    let outcome = eng.migrate().await.unwrap();
    assert_eq!(outcome.migrations_applied, 0);
}

#[tokio::test]
async fn test_failed_statement_rolls_back_and_blocks_further_runs() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("V1__Broken.sql"),
        "CREATE TABLE widgets (id INTEGER PRIMARY KEY);\n\
         INSERT INTO no_such_table VALUES (1);\n",
    )
    .unwrap();

    let conn = connect_in_memory().await.unwrap();
    let eng = engine(conn.clone(), dir.path());

    let err = eng.migrate().await.unwrap_err();
    match err {
        MigrationError::StatementFailed { line, .. } => assert_eq!(line, 2),
        other => panic!("unexpected error: {other}"),
    }

    // SQLite DDL is transactional, so the first statement was rolled back.
    assert!(!table_exists(&conn, "widgets").await);

    // The failure is on record and blocks the next run.
    let infos = eng.info().await.unwrap();
    assert_eq!(infos[0].state, MigrationState::Failed);
    let err = eng.migrate().await.unwrap_err();
    assert!(matches!(err, MigrationError::FailedMigrationPresent { .. }));
}

#[tokio::test]
async fn test_unterminated_literal_leaves_no_history_row() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("V1__Bad_quote.sql"),
        "INSERT INTO t VALUES ('unterminated);\n",
    )
    .unwrap();

    let conn = connect_in_memory().await.unwrap();
    let eng = engine(conn.clone(), dir.path());

    let err = eng.migrate().await.unwrap_err();
    assert!(matches!(err, MigrationError::Tokenize { .. }));

    // Nothing ran, so nothing was recorded.
    let history = SqliteHistory::new(conn, "strata_schema_history").unwrap();
    assert!(history.applied().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_repeatable_reruns_when_content_changes() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("V1__Base.sql"), "CREATE TABLE t (id INTEGER);\n").unwrap();
    let view = dir.path().join("R__Totals_view.sql");
    std::fs::write(
        &view,
        "DROP VIEW IF EXISTS totals;\nCREATE VIEW totals AS SELECT COUNT(*) AS n FROM t;\n",
    )
    .unwrap();

    let conn = connect_in_memory().await.unwrap();
    let eng = engine(conn.clone(), dir.path());

    assert_eq!(eng.migrate().await.unwrap().migrations_applied, 2);
    assert_eq!(eng.migrate().await.unwrap().migrations_applied, 0);

    // Edit the view definition; only the repeatable runs again.
    std::fs::write(
        &view,
        "DROP VIEW IF EXISTS totals;\nCREATE VIEW totals AS SELECT COUNT(id) AS n FROM t;\n",
    )
    .unwrap();
    assert_eq!(eng.migrate().await.unwrap().migrations_applied, 1);

    // Both applications are on record.
    let history = SqliteHistory::new(conn, "strata_schema_history").unwrap();
    let repeatable_rows = history
        .applied()
        .await
        .unwrap()
        .into_iter()
        .filter(|row| row.version.is_none())
        .count();
    assert_eq!(repeatable_rows, 2);
}

#[tokio::test]
async fn test_checksum_drift_on_versioned_migration_fails_validation() {
    let dir = tempfile::tempdir().unwrap();
    let script = dir.path().join("V1__Init.sql");
    std::fs::write(&script, "CREATE TABLE t (id INTEGER);\n").unwrap();

    let conn = connect_in_memory().await.unwrap();
    let eng = engine(conn.clone(), dir.path());
    eng.migrate().await.unwrap();

    std::fs::write(&script, "CREATE TABLE t (id BIGINT);\n").unwrap();
    let err = eng.migrate().await.unwrap_err();
    assert!(matches!(err, MigrationError::Validation(_)));
    assert!(eng.validate().await.is_err());
}

#[tokio::test]
async fn test_concurrent_migrate_runs_apply_once() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("V1__Create_items.sql"),
        "CREATE TABLE items (id INTEGER PRIMARY KEY);\n",
    )
    .unwrap();

    let conn = connect_in_memory().await.unwrap();
    let first = engine(conn.clone(), dir.path());
    let second = engine(conn.clone(), dir.path());

    let (a, b) = tokio::join!(first.migrate(), second.migrate());
    let (a, b) = (a.unwrap(), b.unwrap());

    // Exactly one of the two runs applied the migration.
    assert_eq!(a.migrations_applied + b.migrations_applied, 1);

    let history = SqliteHistory::new(conn, "strata_schema_history").unwrap();
    assert_eq!(history.applied().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_baseline_skips_older_scripts() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("V1__Old.sql"), "CREATE TABLE old (id INTEGER);\n").unwrap();
    std::fs::write(dir.path().join("V3__New.sql"), "CREATE TABLE new_t (id INTEGER);\n").unwrap();

    let conn = connect_in_memory().await.unwrap();
    let eng = engine(conn.clone(), dir.path());

    eng.baseline(Some("2")).await.unwrap();
    let outcome = eng.migrate().await.unwrap();

    assert_eq!(outcome.migrations_applied, 1);
    assert!(!table_exists(&conn, "old").await);
    assert!(table_exists(&conn, "new_t").await);
}
