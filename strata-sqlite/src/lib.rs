//! # strata-sqlite
//!
//! SQLite backend for the Strata migration engine.
//!
//! Implements the `strata-migrate` backend traits over `tokio-rusqlite`:
//! [`SqliteExecutor`] runs migration statements and [`SqliteHistory`] owns
//! the schema history table and the single-row migration lock.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use strata_sqlite::{connect, SqliteExecutor, SqliteHistory};
//!
//! # async fn open() -> Result<(), Box<dyn std::error::Error>> {
//! let conn = connect("app.db").await?;
//! let executor = Arc::new(SqliteExecutor::new(conn.clone()));
//! let history = SqliteHistory::new(conn, "strata_schema_history")?;
//! # let _ = (executor, history);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod executor;
pub mod history;

pub use error::{SqliteError, SqliteResult};
pub use executor::SqliteExecutor;
pub use history::SqliteHistory;

use std::path::Path;

use tokio_rusqlite::Connection;

/// Open a SQLite database file, creating it if needed.
pub async fn connect(path: impl AsRef<Path>) -> SqliteResult<Connection> {
    Connection::open(path.as_ref())
        .await
        .map_err(SqliteError::from)
}

/// Open an in-memory SQLite database.
pub async fn connect_in_memory() -> SqliteResult<Connection> {
    Connection::open_in_memory().await.map_err(SqliteError::from)
}
