//! Integration tests for the Strata CLI

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Get the strata binary
#[allow(deprecated)]
fn strata_cmd() -> Command {
    Command::cargo_bin("strata").unwrap()
}

#[test]
fn test_help_command() {
    strata_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Strata CLI"))
        .stdout(predicate::str::contains("migrate"))
        .stdout(predicate::str::contains("info"))
        .stdout(predicate::str::contains("validate"))
        .stdout(predicate::str::contains("baseline"));
}

#[test]
fn test_version_command() {
    strata_cmd()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("Version"));
}

#[test]
fn test_migrate_help() {
    strata_cmd()
        .args(["migrate", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Apply all pending migrations"))
        .stdout(predicate::str::contains("--out-of-order"))
        .stdout(predicate::str::contains("--locations"));
}

#[test]
fn test_migrate_applies_scripts_to_sqlite_file() {
    let dir = TempDir::new().unwrap();
    let migrations = dir.path().join("migrations");
    fs::create_dir(&migrations).unwrap();
    fs::write(
        migrations.join("V1__Create_users.sql"),
        "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT NOT NULL);\n",
    )
    .unwrap();
    let db = dir.path().join("app.db");

    strata_cmd()
        .current_dir(dir.path())
        .args(["migrate", "--url", db.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Applied 1 migration"));

    // A second run has nothing to do.
    strata_cmd()
        .current_dir(dir.path())
        .args(["migrate", "--url", db.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("up to date"));
}

#[test]
fn test_info_shows_pending_and_applied() {
    let dir = TempDir::new().unwrap();
    let migrations = dir.path().join("migrations");
    fs::create_dir(&migrations).unwrap();
    fs::write(
        migrations.join("V1__Create_users.sql"),
        "CREATE TABLE users (id INTEGER PRIMARY KEY);\n",
    )
    .unwrap();
    let db = dir.path().join("app.db");
    let db = db.to_str().unwrap();

    strata_cmd()
        .current_dir(dir.path())
        .args(["info", "--url", db])
        .assert()
        .success()
        .stdout(predicate::str::contains("Pending"));

    strata_cmd()
        .current_dir(dir.path())
        .args(["migrate", "--url", db])
        .assert()
        .success();

    strata_cmd()
        .current_dir(dir.path())
        .args(["info", "--url", db])
        .assert()
        .success()
        .stdout(predicate::str::contains("Success"));
}

#[test]
fn test_validate_reports_checksum_drift() {
    let dir = TempDir::new().unwrap();
    let migrations = dir.path().join("migrations");
    fs::create_dir(&migrations).unwrap();
    let script = migrations.join("V1__Init.sql");
    fs::write(&script, "CREATE TABLE t (id INTEGER);\n").unwrap();
    let db = dir.path().join("app.db");
    let db = db.to_str().unwrap();

    strata_cmd()
        .current_dir(dir.path())
        .args(["migrate", "--url", db])
        .assert()
        .success();

    fs::write(&script, "CREATE TABLE t (id BIGINT);\n").unwrap();

    strata_cmd()
        .current_dir(dir.path())
        .args(["validate", "--url", db])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Validation failed"));
}

#[test]
fn test_baseline_skips_older_scripts() {
    let dir = TempDir::new().unwrap();
    let migrations = dir.path().join("migrations");
    fs::create_dir(&migrations).unwrap();
    fs::write(migrations.join("V1__Old.sql"), "CREATE TABLE old (id INTEGER);\n").unwrap();
    fs::write(migrations.join("V3__New.sql"), "CREATE TABLE new_t (id INTEGER);\n").unwrap();
    let db = dir.path().join("app.db");
    let db = db.to_str().unwrap();

    strata_cmd()
        .current_dir(dir.path())
        .args(["baseline", "--url", db, "--baseline-version", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Baseline recorded"));

    strata_cmd()
        .current_dir(dir.path())
        .args(["migrate", "--url", db])
        .assert()
        .success()
        .stdout(predicate::str::contains("Applied 1 migration"));
}

#[test]
fn test_config_file_sets_locations() {
    let dir = TempDir::new().unwrap();
    let migrations = dir.path().join("db").join("changes");
    fs::create_dir_all(&migrations).unwrap();
    fs::write(
        migrations.join("V1__Init.sql"),
        "CREATE TABLE t (id INTEGER);\n",
    )
    .unwrap();
    let db = dir.path().join("app.db");

    fs::write(
        dir.path().join("strata.toml"),
        format!(
            "[database]\nurl = \"{}\"\n\n[migrations]\nlocations = [\"db/changes\"]\n",
            db.display()
        ),
    )
    .unwrap();

    strata_cmd()
        .current_dir(dir.path())
        .arg("migrate")
        .assert()
        .success()
        .stdout(predicate::str::contains("Applied 1 migration"));
}
