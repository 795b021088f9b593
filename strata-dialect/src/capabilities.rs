//! Executor-facing capability descriptors.

use serde::{Deserialize, Serialize};

use crate::rules::Dialect;

/// The locking primitive available for guarding the schema history table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockStrategy {
    /// A session-scoped advisory lock function (Postgres
    /// `pg_advisory_lock`, MySQL `GET_LOCK`).
    Advisory,
    /// A `SELECT ... FOR UPDATE` row lock on the history table.
    RowLock,
    /// A dedicated single-row lock table claimed with a compare-and-set
    /// update (engines without advisory locks, e.g. SQLite).
    LockTable,
    /// No locking primitive exists; concurrent migration safety is not
    /// guaranteed on this engine.
    Unsupported,
}

/// What the executor and history store may rely on for one engine.
///
/// Dialect-specific execution behavior is carried as data in this struct
/// rather than as per-engine subclasses.
#[derive(Debug, Clone)]
pub struct Capabilities {
    /// Which engine these capabilities describe.
    pub dialect: Dialect,
    /// Whether DDL statements participate in transactions. When false,
    /// each statement commits individually and a failed migration may be
    /// partially applied.
    pub transactional_ddl: bool,
    /// How the run-level migration lock is taken.
    pub lock_strategy: LockStrategy,
    /// Whether the driver accepts several statements in one round trip.
    /// When false the executor must send statements one at a time.
    pub supports_multi_statement_batch: bool,
    /// Literal spelling of boolean true in SQL text.
    pub boolean_true: &'static str,
    /// Literal spelling of boolean false in SQL text.
    pub boolean_false: &'static str,
    /// Identifier quoting characters (open, close).
    pub identifier_quotes: (char, char),
}

impl Capabilities {
    /// Look up the capabilities for a dialect.
    pub fn for_dialect(dialect: Dialect) -> Self {
        match dialect {
            Dialect::Postgres => Self {
                dialect,
                transactional_ddl: true,
                lock_strategy: LockStrategy::Advisory,
                supports_multi_statement_batch: true,
                boolean_true: "TRUE",
                boolean_false: "FALSE",
                identifier_quotes: ('"', '"'),
            },
            Dialect::MySql => Self {
                dialect,
                // MySQL commits implicitly around DDL.
                transactional_ddl: false,
                lock_strategy: LockStrategy::Advisory,
                supports_multi_statement_batch: false,
                boolean_true: "1",
                boolean_false: "0",
                identifier_quotes: ('`', '`'),
            },
            Dialect::SqlServer => Self {
                dialect,
                transactional_ddl: true,
                lock_strategy: LockStrategy::Advisory,
                supports_multi_statement_batch: true,
                boolean_true: "1",
                boolean_false: "0",
                identifier_quotes: ('[', ']'),
            },
            Dialect::Oracle => Self {
                dialect,
                // DDL commits implicitly on Oracle.
                transactional_ddl: false,
                lock_strategy: LockStrategy::RowLock,
                supports_multi_statement_batch: false,
                boolean_true: "1",
                boolean_false: "0",
                identifier_quotes: ('"', '"'),
            },
            Dialect::Sqlite => Self {
                dialect,
                transactional_ddl: true,
                lock_strategy: LockStrategy::LockTable,
                supports_multi_statement_batch: true,
                boolean_true: "1",
                boolean_false: "0",
                identifier_quotes: ('"', '"'),
            },
            Dialect::Firebird => Self {
                dialect,
                transactional_ddl: true,
                lock_strategy: LockStrategy::Unsupported,
                supports_multi_statement_batch: false,
                boolean_true: "TRUE",
                boolean_false: "FALSE",
                identifier_quotes: ('"', '"'),
            },
        }
    }

    /// Quote an identifier for this engine.
    pub fn quote_identifier(&self, name: &str) -> String {
        let (open, close) = self.identifier_quotes;
        format!("{open}{name}{close}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_strategies() {
        assert_eq!(
            Capabilities::for_dialect(Dialect::Postgres).lock_strategy,
            LockStrategy::Advisory
        );
        assert_eq!(
            Capabilities::for_dialect(Dialect::Sqlite).lock_strategy,
            LockStrategy::LockTable
        );
        assert_eq!(
            Capabilities::for_dialect(Dialect::Firebird).lock_strategy,
            LockStrategy::Unsupported
        );
    }

    #[test]
    fn test_transactional_ddl() {
        assert!(Capabilities::for_dialect(Dialect::Postgres).transactional_ddl);
        assert!(!Capabilities::for_dialect(Dialect::MySql).transactional_ddl);
        assert!(!Capabilities::for_dialect(Dialect::Oracle).transactional_ddl);
    }

    #[test]
    fn test_quote_identifier() {
        let caps = Capabilities::for_dialect(Dialect::SqlServer);
        assert_eq!(caps.quote_identifier("schema_history"), "[schema_history]");

        let caps = Capabilities::for_dialect(Dialect::MySql);
        assert_eq!(caps.quote_identifier("t"), "`t`");
    }
}
