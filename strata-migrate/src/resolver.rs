//! Migration discovery.
//!
//! Resolvers turn configured sources into [`ResolvedMigration`]s. The SQL
//! resolver scans script locations through a [`ResourceProvider`]; the code
//! resolver wraps compiled-in migrations. A [`CompositeResolver`] merges
//! several resolvers, sorts the result and rejects collisions.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use strata_dialect::DialectRules;
use strata_sql::StatementTokenizer;
use tracing::{debug, warn};

use crate::checksum::{apply_placeholders, checksum};
use crate::error::{MigrateResult, MigrationError};
use crate::executor::{DatabaseExecutor, ExecutionStrategy};
use crate::name::{NamePrefix, ResourceNameParser};
use crate::resource::ResourceProvider;
use crate::version::MigrationVersion;

/// The category of a resolved or applied migration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationKind {
    /// Versioned or repeatable SQL script.
    Sql,
    /// Undo script for a versioned migration. Resolved and validated, never
    /// scheduled by `migrate`.
    UndoSql,
    /// Compiled-in migration.
    Code,
    /// Synthetic baseline marker row.
    Baseline,
}

impl MigrationKind {
    /// Stable identifier as stored in the schema history `type` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sql => "SQL",
            Self::UndoSql => "UNDO_SQL",
            Self::Code => "CODE",
            Self::Baseline => "BASELINE",
        }
    }

    /// Parse the stable identifier back from the history table.
    pub fn from_str_lossy(s: &str) -> Self {
        match s {
            "UNDO_SQL" => Self::UndoSql,
            "CODE" => Self::Code,
            "BASELINE" => Self::Baseline,
            _ => Self::Sql,
        }
    }
}

impl fmt::Display for MigrationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A compiled-in migration.
///
/// Code migrations carry no checksum by default, so they re-run only when
/// versioned semantics say so (never, once applied). A repeatable code
/// migration can override [`CodeMigration::checksum`] to opt into
/// change detection.
#[async_trait]
pub trait CodeMigration: Send + Sync {
    /// The version, or `None` for a repeatable code migration.
    fn version(&self) -> Option<MigrationVersion>;

    /// Human-readable description, also the repeatable identity key.
    fn description(&self) -> String;

    /// Optional checksum for change detection.
    fn checksum(&self) -> Option<i32> {
        None
    }

    /// Apply the migration.
    async fn migrate(&self, db: &dyn DatabaseExecutor) -> MigrateResult<()>;
}

/// How a resolved migration is applied.
#[derive(Clone)]
pub enum MigrationExecutor {
    /// Tokenize script text and run the statements.
    Sql {
        /// Script text in execution form (placeholders already applied when
        /// replacement is enabled).
        content: String,
        /// Tokenizer rules for the target dialect.
        rules: DialectRules,
    },
    /// Delegate to a compiled-in migration.
    Code(Arc<dyn CodeMigration>),
}

impl fmt::Debug for MigrationExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sql { content, .. } => f
                .debug_struct("Sql")
                .field("bytes", &content.len())
                .finish(),
            Self::Code(_) => f.write_str("Code"),
        }
    }
}

impl MigrationExecutor {
    /// Run this migration against the database.
    pub async fn execute(
        &self,
        db: &dyn DatabaseExecutor,
        strategy: &ExecutionStrategy,
        script: &str,
        path: &str,
    ) -> MigrateResult<()> {
        match self {
            Self::Sql { content, rules } => {
                let tokenizer = StatementTokenizer::new(rules.clone());
                let statements = tokenizer
                    .tokenize(content)
                    .map_err(|e| MigrationError::tokenize(script, path, e))?;
                strategy
                    .execute_statements(db, script, path, &statements)
                    .await
            }
            Self::Code(migration) => migration.migrate(db).await,
        }
    }
}

/// A migration found by a resolver, not yet compared against history.
#[derive(Debug, Clone)]
pub struct ResolvedMigration {
    /// The version, or `None` for repeatable migrations.
    pub version: Option<MigrationVersion>,
    /// Description from the filename or code migration.
    pub description: String,
    /// Script identifier, e.g. the bare filename.
    pub script: String,
    /// Checksum in the configured execution mode.
    pub checksum: Option<i32>,
    /// Checksum in the opposite placeholder mode, accepted as equivalent
    /// during validation so flipping replacement does not strand history.
    pub equivalent_checksum: Option<i32>,
    /// The migration category.
    pub kind: MigrationKind,
    /// Absolute location, used in error messages.
    pub physical_location: String,
    /// How to apply it.
    pub executor: MigrationExecutor,
}

impl ResolvedMigration {
    /// Whether either of this migration's checksums matches `applied`.
    pub fn checksum_matches(&self, applied: Option<i32>) -> bool {
        self.checksum == applied
            || (applied.is_some() && self.equivalent_checksum == applied)
    }
}

/// Produces migrations from one kind of source.
#[async_trait]
pub trait MigrationResolver: Send + Sync {
    /// Resolve all available migrations, unsorted.
    async fn resolve(&self) -> MigrateResult<Vec<ResolvedMigration>>;
}

/// Resolves SQL scripts from configured locations.
pub struct SqlMigrationResolver {
    provider: Arc<dyn ResourceProvider>,
    locations: Vec<String>,
    parser: ResourceNameParser,
    rules: DialectRules,
    placeholders: HashMap<String, String>,
    placeholder_replacement: bool,
}

impl SqlMigrationResolver {
    /// Create a resolver over the given locations.
    pub fn new(
        provider: Arc<dyn ResourceProvider>,
        locations: Vec<String>,
        parser: ResourceNameParser,
        rules: DialectRules,
    ) -> Self {
        Self {
            provider,
            locations,
            parser,
            rules,
            placeholders: HashMap::new(),
            placeholder_replacement: false,
        }
    }

    /// Enable `${key}` placeholder replacement with the given values.
    pub fn placeholders(mut self, placeholders: HashMap<String, String>) -> Self {
        self.placeholder_replacement = !placeholders.is_empty();
        self.placeholders = placeholders;
        self
    }
}

#[async_trait]
impl MigrationResolver for SqlMigrationResolver {
    async fn resolve(&self) -> MigrateResult<Vec<ResolvedMigration>> {
        let mut migrations = Vec::new();

        for location in &self.locations {
            let resources = self.provider.list(location).await?;
            debug!(location, count = resources.len(), "scanned migration location");

            for resource in resources {
                let name = self.parser.parse(&resource.name);
                if !name.is_valid() {
                    warn!(
                        file = %resource.name,
                        reason = name.failure().unwrap_or("unknown"),
                        "skipping file that is not a migration"
                    );
                    continue;
                }

                let kind = match name.prefix {
                    Some(NamePrefix::Undo) => MigrationKind::UndoSql,
                    _ => MigrationKind::Sql,
                };

                let raw_sum = checksum(&resource.content);
                let (content, sum, equivalent) = if self.placeholder_replacement {
                    let replaced = apply_placeholders(&resource.content, &self.placeholders);
                    let replaced_sum = checksum(&replaced);
                    (replaced, replaced_sum, raw_sum)
                } else {
                    (resource.content.clone(), raw_sum, raw_sum)
                };

                migrations.push(ResolvedMigration {
                    version: name.version,
                    description: name.description,
                    script: resource.name,
                    checksum: Some(sum),
                    equivalent_checksum: Some(equivalent),
                    kind,
                    physical_location: resource.path,
                    executor: MigrationExecutor::Sql {
                        content,
                        rules: self.rules.clone(),
                    },
                });
            }
        }

        Ok(migrations)
    }
}

/// Resolves an explicit list of compiled-in migrations.
pub struct CodeMigrationResolver {
    migrations: Vec<Arc<dyn CodeMigration>>,
}

impl CodeMigrationResolver {
    /// Create a resolver over the given migrations.
    pub fn new(migrations: Vec<Arc<dyn CodeMigration>>) -> Self {
        Self { migrations }
    }
}

#[async_trait]
impl MigrationResolver for CodeMigrationResolver {
    async fn resolve(&self) -> MigrateResult<Vec<ResolvedMigration>> {
        Ok(self
            .migrations
            .iter()
            .map(|migration| {
                let description = migration.description();
                ResolvedMigration {
                    version: migration.version(),
                    description: description.clone(),
                    script: description,
                    checksum: migration.checksum(),
                    equivalent_checksum: migration.checksum(),
                    kind: MigrationKind::Code,
                    physical_location: "<code>".to_string(),
                    executor: MigrationExecutor::Code(Arc::clone(migration)),
                }
            })
            .collect())
    }
}

/// Merges multiple resolvers into one sorted, collision-checked list.
///
/// Versioned migrations come first in version order, then repeatables in
/// description order. Two migrations with equal versions, or two
/// repeatables with equal descriptions, are a fatal error naming both
/// physical locations. Undo migrations are checked against each other but
/// never collide with the versioned migration they undo.
pub struct CompositeResolver {
    resolvers: Vec<Box<dyn MigrationResolver>>,
}

impl CompositeResolver {
    /// Create a composite over the given resolvers.
    pub fn new(resolvers: Vec<Box<dyn MigrationResolver>>) -> Self {
        Self { resolvers }
    }

    fn check_collisions(sorted: &[ResolvedMigration]) -> MigrateResult<()> {
        for pair in sorted.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            // An undo script legitimately shares its version with the
            // forward migration it reverses. Every other pairing, including
            // a SQL and a code migration from different resolvers, must
            // still collide.
            if (a.kind == MigrationKind::UndoSql) != (b.kind == MigrationKind::UndoSql) {
                continue;
            }
            match (&a.version, &b.version) {
                (Some(va), Some(vb)) if va == vb => {
                    return Err(MigrationError::DuplicateVersion {
                        version: va.to_string(),
                        first: a.physical_location.clone(),
                        second: b.physical_location.clone(),
                    });
                }
                (None, None) if a.description == b.description => {
                    return Err(MigrationError::DuplicateDescription {
                        description: a.description.clone(),
                        first: a.physical_location.clone(),
                        second: b.physical_location.clone(),
                    });
                }
                _ => {}
            }
        }
        Ok(())
    }
}

#[async_trait]
impl MigrationResolver for CompositeResolver {
    async fn resolve(&self) -> MigrateResult<Vec<ResolvedMigration>> {
        let mut all = Vec::new();
        for resolver in &self.resolvers {
            all.extend(resolver.resolve().await?);
        }

        // Versioned before repeatable, then by version or description, with
        // the kind as a tiebreaker so same-kind duplicates end up adjacent
        // and an undo script sorts next to the migration it undoes without
        // colliding with it.
        all.sort_by(|a, b| {
            let primary = match (&a.version, &b.version) {
                (Some(va), Some(vb)) => va.cmp(vb),
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => a.description.cmp(&b.description),
            };
            primary.then_with(|| a.kind.as_str().cmp(b.kind.as_str()))
        });

        Self::check_collisions(&all)?;

        Ok(all)
    }
}
