//! Database module for SQLite persistence
//!
//! Holds the relational projection of the authoritative document.

mod items;
mod schema;

pub use items::*;
pub use schema::*;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;

use crate::config::DatabaseConfig;

/// Create a new database connection pool
///
/// The pool connects lazily, so an unreachable database does not stop the
/// server from starting. Only a malformed URL is an error here.
pub fn create_pool(config: &DatabaseConfig) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(&config.url)?
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.timeout().max(Duration::from_secs(1)))
        .connect_lazy_with(options);

    Ok(pool)
}
