//! Migration status reporting.
//!
//! Joins resolved migrations against the schema history into one status
//! list. The engine derives its pending set from the same join, so `info`
//! always shows exactly what `migrate` would do.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::history::{AppliedKey, AppliedMigration};
use crate::resolver::{MigrationKind, ResolvedMigration};
use crate::version::MigrationVersion;

/// The state of one migration relative to the schema history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationState {
    /// Resolved, not applied, and scheduled to run.
    Pending,
    /// Applied successfully.
    Success,
    /// The most recent application of this migration failed.
    Failed,
    /// Applied, but no longer resolved from any location.
    Missing,
    /// Resolved with a version below the latest applied version (or below
    /// the baseline) and not scheduled because out-of-order runs are off.
    Ignored,
    /// Applied repeatable whose checksum has changed; scheduled to re-run.
    Outdated,
}

impl MigrationState {
    /// Short display label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Success => "Success",
            Self::Failed => "Failed",
            Self::Missing => "Missing",
            Self::Ignored => "Ignored",
            Self::Outdated => "Outdated",
        }
    }
}

impl std::fmt::Display for MigrationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One line of the status report.
#[derive(Debug, Clone)]
pub struct MigrationInfo {
    /// The version, or `None` for repeatables.
    pub version: Option<MigrationVersion>,
    /// Description from the filename or the history row.
    pub description: String,
    /// The migration category.
    pub kind: MigrationKind,
    /// Script identifier.
    pub script: String,
    /// Computed state.
    pub state: MigrationState,
    /// When the migration was applied, if it was.
    pub installed_on: Option<DateTime<Utc>>,
    /// History rank, if applied.
    pub installed_rank: Option<i32>,
}

/// The most recent history row for each migration identity.
///
/// Re-runs append rows rather than update them, so only the latest row per
/// key decides the current state.
pub(crate) fn latest_by_key<'a>(
    applied: &'a [AppliedMigration],
) -> HashMap<AppliedKey<'a>, &'a AppliedMigration> {
    let mut latest: HashMap<AppliedKey<'a>, &'a AppliedMigration> = HashMap::new();
    for row in applied {
        let entry = latest.entry(row.key()).or_insert(row);
        if row.installed_rank >= entry.installed_rank {
            *entry = row;
        }
    }
    latest
}

/// The highest successfully applied version, baseline rows included.
pub(crate) fn latest_applied_version(applied: &[AppliedMigration]) -> Option<&MigrationVersion> {
    applied
        .iter()
        .filter(|row| row.success)
        .filter_map(|row| row.version.as_ref())
        .max()
}

/// Join resolved migrations against history rows into a status list.
///
/// Undo scripts are excluded; they are resolution artifacts, not part of
/// the forward schedule. Output order is versioned migrations ascending,
/// then repeatables by description, with missing-but-applied rows placed by
/// the same rule.
pub fn build_info(
    resolved: &[ResolvedMigration],
    applied: &[AppliedMigration],
    out_of_order: bool,
) -> Vec<MigrationInfo> {
    let latest = latest_by_key(applied);
    let max_version = latest_applied_version(applied);

    let mut infos = Vec::new();

    for migration in resolved {
        if migration.kind == MigrationKind::UndoSql {
            continue;
        }

        let key = match &migration.version {
            Some(version) => AppliedKey::Version(version),
            None => AppliedKey::Description(&migration.description),
        };

        let state = match latest.get(&key) {
            Some(row) if !row.success => MigrationState::Failed,
            Some(row) => {
                if migration.version.is_none() && !migration.checksum_matches(row.checksum) {
                    MigrationState::Outdated
                } else {
                    MigrationState::Success
                }
            }
            None => match (&migration.version, max_version) {
                (Some(version), Some(max)) if version < max && !out_of_order => {
                    MigrationState::Ignored
                }
                _ => MigrationState::Pending,
            },
        };

        let row = latest.get(&key);
        infos.push(MigrationInfo {
            version: migration.version.clone(),
            description: migration.description.clone(),
            kind: migration.kind,
            script: migration.script.clone(),
            state,
            installed_on: row.map(|r| r.installed_on),
            installed_rank: row.map(|r| r.installed_rank),
        });
    }

    // History rows with no resolved counterpart. Baseline rows never have
    // one and are reported as applied, not missing.
    for row in latest.values() {
        if row.kind == MigrationKind::Baseline {
            infos.push(MigrationInfo {
                version: row.version.clone(),
                description: row.description.clone(),
                kind: row.kind,
                script: row.script.clone(),
                state: MigrationState::Success,
                installed_on: Some(row.installed_on),
                installed_rank: Some(row.installed_rank),
            });
            continue;
        }
        let resolved_covers = resolved.iter().any(|m| {
            m.kind != MigrationKind::UndoSql
                && match (&m.version, &row.version) {
                    (Some(a), Some(b)) => a == b,
                    (None, None) => m.description == row.description,
                    _ => false,
                }
        });
        if !resolved_covers {
            infos.push(MigrationInfo {
                version: row.version.clone(),
                description: row.description.clone(),
                kind: row.kind,
                script: row.script.clone(),
                state: MigrationState::Missing,
                installed_on: Some(row.installed_on),
                installed_rank: Some(row.installed_rank),
            });
        }
    }

    infos.sort_by(|a, b| match (&a.version, &b.version) {
        (Some(va), Some(vb)) => va.cmp(vb),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.description.cmp(&b.description),
    });

    infos
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_dialect::{Dialect, DialectRules};

    use crate::resolver::MigrationExecutor;

    fn resolved(version: Option<&str>, description: &str, checksum: i32) -> ResolvedMigration {
        ResolvedMigration {
            version: version.map(|v| MigrationVersion::parse(v).unwrap()),
            description: description.to_string(),
            script: format!("{description}.sql"),
            checksum: Some(checksum),
            equivalent_checksum: Some(checksum),
            kind: MigrationKind::Sql,
            physical_location: format!("/m/{description}.sql"),
            executor: MigrationExecutor::Sql {
                content: String::new(),
                rules: DialectRules::for_dialect(Dialect::Sqlite),
            },
        }
    }

    fn applied_row(
        rank: i32,
        version: Option<&str>,
        description: &str,
        checksum: i32,
        success: bool,
    ) -> AppliedMigration {
        AppliedMigration {
            installed_rank: rank,
            version: version.map(|v| MigrationVersion::parse(v).unwrap()),
            description: description.to_string(),
            kind: MigrationKind::Sql,
            script: format!("{description}.sql"),
            checksum: Some(checksum),
            installed_by: "tests".to_string(),
            installed_on: Utc::now(),
            execution_time_ms: 1,
            success,
        }
    }

    #[test]
    fn test_pending_and_success_states() {
        let resolved = vec![resolved(Some("1"), "First", 10), resolved(Some("2"), "Second", 20)];
        let applied = vec![applied_row(1, Some("1"), "First", 10, true)];

        let infos = build_info(&resolved, &applied, false);
        assert_eq!(infos[0].state, MigrationState::Success);
        assert_eq!(infos[1].state, MigrationState::Pending);
    }

    #[test]
    fn test_out_of_order_ignored_by_default() {
        let resolved = vec![resolved(Some("1.5"), "Late", 15), resolved(Some("2"), "Second", 20)];
        let applied = vec![applied_row(1, Some("2"), "Second", 20, true)];

        let infos = build_info(&resolved, &applied, false);
        assert_eq!(infos[0].state, MigrationState::Ignored);

        let infos = build_info(&resolved, &applied, true);
        assert_eq!(infos[0].state, MigrationState::Pending);
    }

    #[test]
    fn test_changed_repeatable_is_outdated() {
        let resolved = vec![resolved(None, "Refresh view", 99)];
        let applied = vec![applied_row(1, None, "Refresh view", 11, true)];

        let infos = build_info(&resolved, &applied, false);
        assert_eq!(infos[0].state, MigrationState::Outdated);
    }

    #[test]
    fn test_failed_row_superseded_by_success_counts_as_success() {
        let resolved = vec![resolved(None, "Refresh view", 11)];
        let applied = vec![
            applied_row(1, None, "Refresh view", 11, false),
            applied_row(2, None, "Refresh view", 11, true),
        ];

        let infos = build_info(&resolved, &applied, false);
        assert_eq!(infos[0].state, MigrationState::Success);
    }

    #[test]
    fn test_applied_but_unresolved_is_missing() {
        let applied = vec![applied_row(1, Some("1"), "Gone", 10, true)];

        let infos = build_info(&[], &applied, false);
        assert_eq!(infos.len(), 1);
        assert_eq!(infos[0].state, MigrationState::Missing);
    }
}
