//! Wires configuration and CLI flags into a ready migration engine.

use std::sync::Arc;
use std::time::Duration;

use strata_dialect::{Capabilities, Dialect, DialectRules};
use strata_migrate::{
    ExecutionStrategy, FilesystemResourceProvider, MigrateConfig, MigrationEngine,
    ResourceNameParser, SqlMigrationResolver,
};
use strata_sqlite::{connect, connect_in_memory, SqliteExecutor, SqliteHistory};

use crate::cli::ConnectionArgs;
use crate::config::Config;
use crate::error::{CliError, CliResult};

/// A connected migration engine plus the settings it was built from.
pub struct MigrationContext {
    /// The engine, ready to run commands.
    pub engine: MigrationEngine<SqliteHistory>,
    /// Effective script locations after flag overrides.
    pub locations: Vec<String>,
    /// The database location shown to the user.
    pub url: String,
}

impl MigrationContext {
    /// Load config, apply flag overrides and connect.
    ///
    /// Only the SQLite dialect is executable today; the other dialects are
    /// tokenizer targets without a bundled driver.
    pub async fn connect(args: &ConnectionArgs) -> CliResult<Self> {
        Self::connect_with(args, |config| config).await
    }

    /// Like [`MigrationContext::connect`], with a hook to adjust the engine
    /// configuration after the config file has been applied. Command flags
    /// layer on top of `strata.toml` here.
    pub async fn connect_with(
        args: &ConnectionArgs,
        tweak: impl FnOnce(MigrateConfig) -> MigrateConfig,
    ) -> CliResult<Self> {
        let config = Config::load_or_default(args.config.as_deref())?;

        let dialect: Dialect = config
            .database
            .dialect
            .parse()
            .map_err(|e| CliError::Config(format!("{e}")))?;
        if dialect != Dialect::Sqlite {
            return Err(CliError::Config(format!(
                "dialect '{dialect}' has no bundled driver; only sqlite can execute migrations"
            )));
        }

        let url = args
            .url
            .clone()
            .or_else(|| config.database.url.clone())
            .unwrap_or_else(|| ":memory:".to_string());

        let conn = if url == ":memory:" {
            connect_in_memory().await?
        } else {
            connect(&url).await?
        };

        let locations = if args.locations.is_empty() {
            config.migrations.locations.clone()
        } else {
            args.locations.clone()
        };
        let table = args
            .table
            .clone()
            .unwrap_or_else(|| config.migrations.table.clone());

        let resolver = SqlMigrationResolver::new(
            Arc::new(FilesystemResourceProvider::new()),
            locations.clone(),
            ResourceNameParser::new(),
            DialectRules::for_dialect(dialect),
        )
        .placeholders(config.migrations.placeholders.clone());

        let mut engine_config = MigrateConfig::new()
            .table(&table)
            .out_of_order(config.migrations.out_of_order)
            .validate_on_migrate(config.migrations.validate_on_migrate)
            .ignore_missing(config.migrations.ignore_missing)
            .lock_timeout(Duration::from_secs(config.migrations.lock_timeout_secs));
        if let Some(installed_by) = &config.migrations.installed_by {
            engine_config = engine_config.installed_by(installed_by);
        }
        let engine_config = tweak(engine_config);

        let history = SqliteHistory::new(conn.clone(), table)?;
        let engine = MigrationEngine::new(
            engine_config,
            Arc::new(SqliteExecutor::new(conn)),
            history,
            Box::new(resolver),
            ExecutionStrategy::new(Capabilities::for_dialect(dialect)),
        );

        Ok(Self {
            engine,
            locations,
            url,
        })
    }
}
