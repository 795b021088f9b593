//! Error types for the migration engine.

use thiserror::Error;

use strata_sql::TokenizeError;

/// Result type alias for migration operations.
pub type MigrateResult<T> = Result<T, MigrationError>;

/// Errors that can occur during migration operations.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// File system error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A version string could not be parsed.
    #[error("Invalid migration version '{0}': {1}")]
    InvalidVersion(String, String),

    /// Two resolved migrations share the same version.
    #[error(
        "Found more than one migration with version {version}:\n-> {first}\n-> {second}"
    )]
    DuplicateVersion {
        /// The colliding version.
        version: String,
        /// Physical location of the first offender.
        first: String,
        /// Physical location of the second offender.
        second: String,
    },

    /// Two repeatable migrations share the same description.
    #[error(
        "Found more than one repeatable migration with description '{description}':\n-> {first}\n-> {second}"
    )]
    DuplicateDescription {
        /// The colliding description.
        description: String,
        /// Physical location of the first offender.
        first: String,
        /// Physical location of the second offender.
        second: String,
    },

    /// An applied migration no longer matches its script on disk.
    #[error(
        "Migration checksum mismatch for '{script}': applied with {applied}, resolved as {resolved}"
    )]
    ChecksumMismatch {
        /// Script identifier.
        script: String,
        /// Checksum recorded in the schema history.
        applied: String,
        /// Checksum of the currently resolved script.
        resolved: String,
    },

    /// The schema history contains a failed migration that has not been
    /// superseded; the database needs manual repair before migrating.
    #[error(
        "Schema history contains a failed migration: '{script}'{version}. Repair it before migrating"
    )]
    FailedMigrationPresent {
        /// Script identifier of the failed row.
        script: String,
        /// Formatted version suffix (empty for repeatables).
        version: String,
    },

    /// Validation found problems before execution.
    #[error("Validation failed:\n{0}")]
    Validation(String),

    /// A script could not be split into statements.
    #[error("Failed to parse '{script}' ({path}): {source}")]
    Tokenize {
        /// Script identifier.
        script: String,
        /// Absolute path of the script.
        path: String,
        /// Underlying tokenizer error.
        #[source]
        source: TokenizeError,
    },

    /// A statement failed during execution.
    #[error("Migration '{script}' failed at line {line} ({path}): {message}")]
    StatementFailed {
        /// Script identifier.
        script: String,
        /// Absolute path of the script.
        path: String,
        /// Line number of the failing statement within the script.
        line: u32,
        /// Database error message.
        message: String,
    },

    /// The schema history lock could not be acquired in time.
    #[error("Timed out waiting for the schema history lock after {0:?}")]
    LockTimeout(std::time::Duration),

    /// Baseline is not possible in the current history state.
    #[error("Cannot baseline: {0}")]
    BaselineRejected(String),

    /// Database operation error reported by the backend.
    #[error("Database error: {0}")]
    Database(String),

    /// General migration error.
    #[error("Migration error: {0}")]
    Other(String),
}

impl MigrationError {
    /// Create a database error.
    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    /// Create an invalid-version error.
    pub fn invalid_version(raw: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidVersion(raw.into(), reason.into())
    }

    /// Create a checksum mismatch error.
    pub fn checksum_mismatch(
        script: impl Into<String>,
        applied: Option<i32>,
        resolved: Option<i32>,
    ) -> Self {
        let fmt = |c: Option<i32>| c.map_or_else(|| "none".to_string(), |c| c.to_string());
        Self::ChecksumMismatch {
            script: script.into(),
            applied: fmt(applied),
            resolved: fmt(resolved),
        }
    }

    /// Create a failed-migration error for a history row.
    pub fn failed_migration(script: impl Into<String>, version: Option<&str>) -> Self {
        Self::FailedMigrationPresent {
            script: script.into(),
            version: version.map_or_else(String::new, |v| format!(" (version {v})")),
        }
    }

    /// Wrap a tokenizer error with script context.
    pub fn tokenize(
        script: impl Into<String>,
        path: impl Into<String>,
        source: TokenizeError,
    ) -> Self {
        Self::Tokenize {
            script: script.into(),
            path: path.into(),
            source,
        }
    }

    /// Wrap a statement failure with script and line context.
    pub fn statement_failed(
        script: impl Into<String>,
        path: impl Into<String>,
        line: u32,
        message: impl Into<String>,
    ) -> Self {
        Self::StatementFailed {
            script: script.into(),
            path: path.into(),
            line,
            message: message.into(),
        }
    }

    /// Create an other error.
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }
}
