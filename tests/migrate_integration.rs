//! Integration tests exercising the full engine through the `strata`
//! facade crate.

use std::path::Path;
use std::sync::Arc;

use strata::dialect::{Capabilities, Dialect, DialectRules};
use strata::migrate::{
    ExecutionStrategy, FilesystemResourceProvider, MigrateConfig, MigrationEngine,
    MigrationState, ResourceNameParser, SqlMigrationResolver,
};
use strata::sql::StatementTokenizer;
use strata::sqlite::{connect_in_memory, SqliteExecutor, SqliteHistory};

fn engine(
    conn: tokio_rusqlite::Connection,
    dir: &Path,
) -> MigrationEngine<SqliteHistory> {
    let resolver = SqlMigrationResolver::new(
        Arc::new(FilesystemResourceProvider::new()),
        vec![dir.display().to_string()],
        ResourceNameParser::new(),
        DialectRules::for_dialect(Dialect::Sqlite),
    );
    let history =
        SqliteHistory::new(conn.clone(), "strata_schema_history").expect("valid table name");

    MigrationEngine::new(
        MigrateConfig::new(),
        Arc::new(SqliteExecutor::new(conn)),
        history,
        Box::new(resolver),
        ExecutionStrategy::new(Capabilities::for_dialect(Dialect::Sqlite)),
    )
}

#[tokio::test]
async fn test_full_migrate_and_info_flow() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("V1__Create_accounts.sql"),
        "CREATE TABLE accounts (id INTEGER PRIMARY KEY, email TEXT NOT NULL UNIQUE);\n",
    )
    .unwrap();
    std::fs::write(
        dir.path().join("V1_1__Add_balance.sql"),
        "ALTER TABLE accounts ADD COLUMN balance INTEGER NOT NULL DEFAULT 0;\n",
    )
    .unwrap();
    std::fs::write(
        dir.path().join("R__Account_summary.sql"),
        "DROP VIEW IF EXISTS account_summary;\n\
         CREATE VIEW account_summary AS SELECT COUNT(*) AS accounts FROM accounts;\n",
    )
    .unwrap();

    let conn = connect_in_memory().await.unwrap();
    let eng = engine(conn, dir.path());

    let outcome = eng.migrate().await.unwrap();
    assert_eq!(outcome.migrations_applied, 3);
    assert_eq!(outcome.current_version.unwrap().to_string(), "1.1");

    let infos = eng.info().await.unwrap();
    assert_eq!(infos.len(), 3);
    assert!(infos.iter().all(|i| i.state == MigrationState::Success));
    // Versioned migrations sort before the repeatable.
    assert_eq!(infos[0].version.as_ref().unwrap().to_string(), "1");
    assert_eq!(infos[1].version.as_ref().unwrap().to_string(), "1.1");
    assert!(infos[2].version.is_none());

    assert!(eng.validate().await.is_ok());
}

#[tokio::test]
async fn test_tokenizer_feeds_executable_statements() {
    // A trigger body contains semicolons that must not split the statement.
    let script = "\
CREATE TABLE audit (entry TEXT);
CREATE TRIGGER log_insert AFTER INSERT ON audit
BEGIN
    INSERT INTO audit VALUES ('logged');
END;
";
    let tokenizer = StatementTokenizer::new(DialectRules::for_dialect(Dialect::Sqlite));
    let statements = tokenizer.tokenize(script).unwrap();
    assert_eq!(statements.len(), 2);

    // And the split statements actually run.
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("V1__Audit.sql"), script).unwrap();

    let conn = connect_in_memory().await.unwrap();
    let eng = engine(conn, dir.path());
    assert_eq!(eng.migrate().await.unwrap().migrations_applied, 1);
}
