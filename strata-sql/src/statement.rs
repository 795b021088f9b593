//! The tokenizer's output value.

use strata_dialect::Delimiter;

/// A single executable SQL statement extracted from a script.
///
/// Immutable once produced; the executor consumes these in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlStatement {
    /// The statement text, with the trailing delimiter and any comments
    /// outside string literals stripped.
    pub sql: String,
    /// 1-based line number of the first line of the statement within the
    /// original script.
    pub line_number: u32,
    /// The delimiter that terminated this statement.
    pub delimiter: Delimiter,
    /// Whether this statement may run inside a transaction. Statements such
    /// as `VACUUM` or `CREATE DATABASE` must run outside one on engines
    /// that refuse them mid-transaction.
    pub execute_in_transaction: bool,
}

impl SqlStatement {
    /// Create a statement that runs inside a transaction.
    pub fn new(sql: impl Into<String>, line_number: u32, delimiter: Delimiter) -> Self {
        Self {
            sql: sql.into(),
            line_number,
            delimiter,
            execute_in_transaction: true,
        }
    }

    /// Mark this statement as requiring autocommit execution.
    pub fn outside_transaction(mut self) -> Self {
        self.execute_in_transaction = false;
        self
    }
}
