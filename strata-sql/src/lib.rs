//! # strata-sql
//!
//! Dialect-aware SQL statement tokenizer.
//!
//! Migration scripts are plain text files containing any number of SQL
//! statements. Before they can be executed one by one, the raw text has to
//! be split into discrete statements, and that split has to survive every
//! lexical convention the engines disagree on: quoting and escaping rules,
//! comment markers, in-script delimiter redefinition, and procedure bodies
//! that legally contain the statement terminator.
//!
//! The tokenizer is deliberately permissive about SQL *semantics*: it only
//! tracks enough lexical structure to find statement boundaries and literal
//! extents. It never validates that the statements themselves make sense.
//!
//! ```rust
//! use strata_dialect::{Dialect, DialectRules};
//! use strata_sql::StatementTokenizer;
//!
//! let rules = DialectRules::for_dialect(Dialect::Sqlite);
//! let tokenizer = StatementTokenizer::new(rules);
//!
//! let statements = tokenizer
//!     .tokenize("CREATE TABLE t (id INT);\nINSERT INTO t VALUES (1);\n")
//!     .unwrap();
//!
//! assert_eq!(statements.len(), 2);
//! assert_eq!(statements[1].line_number, 2);
//! ```

pub mod error;
pub mod statement;
pub mod tokenizer;

pub use error::{TokenizeError, TokenizeResult};
pub use statement::SqlStatement;
pub use tokenizer::StatementTokenizer;
