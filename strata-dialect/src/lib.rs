//! # strata-dialect
//!
//! Per-engine configuration for the Strata migration engine.
//!
//! This crate is a leaf: it carries no behavior beyond lookups. Each
//! supported database engine is described by two value types:
//!
//! - [`DialectRules`] — everything the statement tokenizer needs to find
//!   statement boundaries in raw script text (default delimiter, quoting
//!   forms, comment markers, delimiter-change directives, block-nesting
//!   keywords).
//! - [`Capabilities`] — everything the executor and history store need to
//!   behave correctly against the engine (transactional DDL, locking
//!   primitive, boolean spellings, identifier quoting).
//!
//! Dialect-specific behavior is data, not a type hierarchy: callers look up
//! the rules for a [`Dialect`] and pass the value around.
//!
//! ```rust
//! use strata_dialect::{Dialect, DialectRules};
//!
//! let rules = DialectRules::for_dialect(Dialect::Postgres);
//! assert_eq!(rules.default_delimiter.token, ";");
//! assert!(rules.dollar_quoting);
//! ```

pub mod capabilities;
pub mod rules;

pub use capabilities::{Capabilities, LockStrategy};
pub use rules::{Delimiter, DelimiterDirective, Dialect, DialectRules, UnknownDialect};
