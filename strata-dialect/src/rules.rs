//! Tokenizer-facing dialect rules.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A supported database engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// PostgreSQL and compatible engines (CockroachDB, Redshift).
    Postgres,
    /// MySQL and MariaDB.
    MySql,
    /// Microsoft SQL Server and Sybase.
    SqlServer,
    /// Oracle Database.
    Oracle,
    /// SQLite.
    Sqlite,
    /// Firebird / InterBase.
    Firebird,
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Postgres => "postgres",
            Self::MySql => "mysql",
            Self::SqlServer => "sqlserver",
            Self::Oracle => "oracle",
            Self::Sqlite => "sqlite",
            Self::Firebird => "firebird",
        };
        f.write_str(name)
    }
}

/// Error returned when a dialect name is not recognized.
#[derive(Debug, Error)]
#[error("Unknown dialect: '{0}' (expected one of postgres, mysql, sqlserver, oracle, sqlite, firebird)")]
pub struct UnknownDialect(pub String);

impl FromStr for Dialect {
    type Err = UnknownDialect;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "mysql" | "mariadb" => Ok(Self::MySql),
            "sqlserver" | "mssql" => Ok(Self::SqlServer),
            "oracle" => Ok(Self::Oracle),
            "sqlite" | "sqlite3" => Ok(Self::Sqlite),
            "firebird" => Ok(Self::Firebird),
            other => Err(UnknownDialect(other.to_string())),
        }
    }
}

/// A statement terminator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delimiter {
    /// The terminator string (`;`, `GO`, `$$`, ...).
    pub token: String,
    /// Whether the terminator only counts when it is the sole content of a
    /// line (SQL Server's `GO`).
    pub alone_on_line: bool,
}

impl Delimiter {
    /// Create a delimiter that terminates a statement at end of line.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            alone_on_line: false,
        }
    }

    /// Create a delimiter that must appear alone on its own line.
    pub fn alone_on_line(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            alone_on_line: true,
        }
    }

    /// The standard semicolon delimiter.
    pub fn semicolon() -> Self {
        Self::new(";")
    }
}

impl fmt::Display for Delimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.token)
    }
}

/// In-script directive for changing the active delimiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelimiterDirective {
    /// No directive is recognized.
    None,
    /// MySQL's `DELIMITER <token>` client directive.
    MySqlDelimiter,
    /// Firebird's `SET TERM <token> <old>` directive.
    SetTerm,
}

/// Lexical rules the statement tokenizer needs for one engine.
///
/// This replaces per-engine tokenizer subclassing: the tokenizer is generic
/// and the differences between engines live in this value.
#[derive(Debug, Clone)]
pub struct DialectRules {
    /// Which engine these rules describe.
    pub dialect: Dialect,
    /// The delimiter in effect before any in-script directive changes it.
    pub default_delimiter: Delimiter,
    /// Whether `#` starts a line comment (MySQL).
    pub hash_line_comments: bool,
    /// Whether a backslash escapes the next character inside a string
    /// literal (MySQL).
    pub backslash_escapes: bool,
    /// Whether block comments may nest (`/* /* */ */`, Postgres).
    pub nested_block_comments: bool,
    /// Whether `$tag$ ... $tag$` dollar-quoted literals exist (Postgres).
    pub dollar_quoting: bool,
    /// Whether `q'[...]'` alternative-quoted literals exist (Oracle).
    pub alternative_quoting: bool,
    /// Whether backticks quote identifiers (MySQL).
    pub backtick_identifiers: bool,
    /// Whether square brackets quote identifiers (SQL Server).
    pub bracket_identifiers: bool,
    /// In-script delimiter-change directive, if any.
    pub delimiter_directive: DelimiterDirective,
    /// Keywords that prefix a string literal and belong to it
    /// (`N'...'`, `DATE'...'`).
    pub literal_prefixes: &'static [&'static str],
    /// Keyword sequences that open a block statement whose body may contain
    /// the delimiter (`CREATE PROCEDURE`, `DECLARE`, ...). Matched against
    /// the first keywords of the statement.
    pub block_openers: &'static [&'static [&'static str]],
    /// Leading keyword phrases of statements that must run outside a
    /// transaction on this engine.
    pub non_transactional_prefixes: &'static [&'static str],
}

const NO_PREFIXES: &[&str] = &[];
const NO_OPENERS: &[&[&str]] = &[];
const NO_PHRASES: &[&str] = &[];

impl DialectRules {
    /// Look up the rules for a dialect.
    pub fn for_dialect(dialect: Dialect) -> Self {
        match dialect {
            Dialect::Postgres => Self {
                dialect,
                default_delimiter: Delimiter::semicolon(),
                hash_line_comments: false,
                backslash_escapes: false,
                nested_block_comments: true,
                dollar_quoting: true,
                alternative_quoting: false,
                backtick_identifiers: false,
                bracket_identifiers: false,
                delimiter_directive: DelimiterDirective::None,
                literal_prefixes: &["E", "B", "X", "U&"],
                // Function bodies are dollar-quoted on Postgres, so no
                // block tracking is needed.
                block_openers: NO_OPENERS,
                non_transactional_prefixes: &[
                    "VACUUM",
                    "CREATE DATABASE",
                    "DROP DATABASE",
                    "CREATE TABLESPACE",
                    "DROP TABLESPACE",
                    "CREATE INDEX CONCURRENTLY",
                    "DROP INDEX CONCURRENTLY",
                    "REINDEX",
                    "ALTER SYSTEM",
                    "ALTER TYPE",
                ],
            },
            Dialect::MySql => Self {
                dialect,
                default_delimiter: Delimiter::semicolon(),
                hash_line_comments: true,
                backslash_escapes: true,
                nested_block_comments: false,
                dollar_quoting: false,
                alternative_quoting: false,
                backtick_identifiers: true,
                bracket_identifiers: false,
                delimiter_directive: DelimiterDirective::MySqlDelimiter,
                literal_prefixes: &["N", "X", "B"],
                // Stored program bodies are handled with DELIMITER, but
                // scripts written without it still rely on block tracking.
                block_openers: &[
                    &["CREATE", "PROCEDURE"],
                    &["CREATE", "FUNCTION"],
                    &["CREATE", "TRIGGER"],
                    &["CREATE", "EVENT"],
                ],
                non_transactional_prefixes: NO_PHRASES,
            },
            Dialect::SqlServer => Self {
                dialect,
                default_delimiter: Delimiter::alone_on_line("GO"),
                hash_line_comments: false,
                backslash_escapes: false,
                nested_block_comments: true,
                dollar_quoting: false,
                alternative_quoting: false,
                backtick_identifiers: false,
                bracket_identifiers: true,
                delimiter_directive: DelimiterDirective::None,
                literal_prefixes: &["N"],
                // GO batches already isolate procedure bodies.
                block_openers: NO_OPENERS,
                non_transactional_prefixes: &[
                    "CREATE DATABASE",
                    "DROP DATABASE",
                    "ALTER DATABASE",
                    "BACKUP",
                    "RESTORE",
                ],
            },
            Dialect::Oracle => Self {
                dialect,
                default_delimiter: Delimiter::semicolon(),
                hash_line_comments: false,
                backslash_escapes: false,
                nested_block_comments: false,
                dollar_quoting: false,
                alternative_quoting: true,
                backtick_identifiers: false,
                bracket_identifiers: false,
                delimiter_directive: DelimiterDirective::None,
                literal_prefixes: &["N", "DATE", "TIMESTAMP", "INTERVAL"],
                block_openers: &[
                    &["CREATE", "PROCEDURE"],
                    &["CREATE", "FUNCTION"],
                    &["CREATE", "TRIGGER"],
                    &["CREATE", "PACKAGE"],
                    &["CREATE", "TYPE"],
                    &["CREATE", "OR", "REPLACE", "PROCEDURE"],
                    &["CREATE", "OR", "REPLACE", "FUNCTION"],
                    &["CREATE", "OR", "REPLACE", "TRIGGER"],
                    &["CREATE", "OR", "REPLACE", "PACKAGE"],
                    &["CREATE", "OR", "REPLACE", "TYPE"],
                    &["DECLARE"],
                    &["BEGIN"],
                ],
                non_transactional_prefixes: NO_PHRASES,
            },
            Dialect::Sqlite => Self {
                dialect,
                default_delimiter: Delimiter::semicolon(),
                hash_line_comments: false,
                backslash_escapes: false,
                nested_block_comments: false,
                dollar_quoting: false,
                alternative_quoting: false,
                backtick_identifiers: true,
                bracket_identifiers: true,
                delimiter_directive: DelimiterDirective::None,
                literal_prefixes: &["X"],
                // Trigger bodies contain semicolons between BEGIN and END.
                block_openers: &[
                    &["CREATE", "TRIGGER"],
                    &["CREATE", "TEMP", "TRIGGER"],
                    &["CREATE", "TEMPORARY", "TRIGGER"],
                ],
                non_transactional_prefixes: NO_PHRASES,
            },
            Dialect::Firebird => Self {
                dialect,
                default_delimiter: Delimiter::semicolon(),
                hash_line_comments: false,
                backslash_escapes: false,
                nested_block_comments: false,
                dollar_quoting: false,
                alternative_quoting: false,
                backtick_identifiers: false,
                bracket_identifiers: false,
                delimiter_directive: DelimiterDirective::SetTerm,
                literal_prefixes: NO_PREFIXES,
                block_openers: &[
                    &["CREATE", "PROCEDURE"],
                    &["CREATE", "TRIGGER"],
                    &["CREATE", "OR", "ALTER", "PROCEDURE"],
                    &["CREATE", "OR", "ALTER", "TRIGGER"],
                    &["EXECUTE", "BLOCK"],
                ],
                non_transactional_prefixes: NO_PHRASES,
            },
        }
    }
}
