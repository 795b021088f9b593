//! CLI configuration handling.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::CliResult;

/// Default config file name (lives in project root)
pub const CONFIG_FILE_NAME: &str = "strata.toml";

/// Default migrations directory (relative to project root)
pub const MIGRATIONS_DIR: &str = "migrations";

/// Strata CLI configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Database configuration
    pub database: DatabaseConfig,

    /// Migration configuration
    pub migrations: MigrationsConfig,
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load the config file next to the working directory, or defaults when
    /// there is none.
    pub fn load_or_default(path: Option<&Path>) -> CliResult<Self> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let default = Path::new(CONFIG_FILE_NAME);
                if default.exists() {
                    Self::load(default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> CliResult<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQL dialect (sqlite, postgres, mysql, sqlserver, oracle, firebird)
    pub dialect: String,

    /// Database location. For SQLite this is the database file path.
    pub url: Option<String>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            dialect: "sqlite".to_string(),
            url: None,
        }
    }
}

/// Migration configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrationsConfig {
    /// Directories scanned for migration scripts
    pub locations: Vec<String>,

    /// Schema history table name
    pub table: String,

    /// Recorded installer name (defaults to "strata")
    pub installed_by: Option<String>,

    /// Allow versioned migrations below the latest applied version
    pub out_of_order: bool,

    /// Validate before migrating
    pub validate_on_migrate: bool,

    /// Tolerate applied migrations that are no longer on disk
    pub ignore_missing: bool,

    /// Seconds to wait for the migration lock
    pub lock_timeout_secs: u64,

    /// `${key}` placeholder values substituted into scripts
    pub placeholders: HashMap<String, String>,
}

impl Default for MigrationsConfig {
    fn default() -> Self {
        Self {
            locations: vec![MIGRATIONS_DIR.to_string()],
            table: "strata_schema_history".to_string(),
            installed_by: None,
            out_of_order: false,
            validate_on_migrate: true,
            ignore_missing: false,
            lock_timeout_secs: 60,
            placeholders: HashMap::new(),
        }
    }
}
