//! Backend-specific SQL fragments
//!
//! Everything that differs between database products is kept behind
//! [`SqlDialect`]; the repositories only splice table names and these
//! fragments into otherwise portable statements.

use std::fmt::Debug;

/// SQL differences between storage backends
pub trait SqlDialect: Send + Sync + Debug {
    /// Query returning a positive count when table `?1` exists
    fn table_exists_sql(&self) -> &'static str;

    /// DDL batch creating the published table and its expiry index
    fn create_published_table(&self, table: &str) -> String;

    /// DDL batch creating the received table and its expiry index
    fn create_received_table(&self, table: &str) -> String;

    /// Expression rendering a unix-seconds column as a `%Y-%m-%d-%H` key
    fn hour_bucket(&self, column: &str) -> String;
}

/// SQLite / SQLCipher dialect
#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteDialect;

impl SqlDialect for SqliteDialect {
    fn table_exists_sql(&self) -> &'static str {
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1"
    }

    fn create_published_table(&self, table: &str) -> String {
        format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                Id INTEGER PRIMARY KEY,
                Version TEXT,
                Name TEXT NOT NULL,
                Content TEXT,
                Retries INTEGER NOT NULL DEFAULT 0,
                Added INTEGER NOT NULL,
                ExpiresAt INTEGER,
                StatusName TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS ix_{table}_expires_at ON {table}(ExpiresAt);"
        )
    }

    fn create_received_table(&self, table: &str) -> String {
        format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                Id INTEGER PRIMARY KEY,
                Version TEXT,
                Name TEXT NOT NULL,
                \"Group\" TEXT,
                Content TEXT,
                Retries INTEGER NOT NULL DEFAULT 0,
                Added INTEGER NOT NULL,
                ExpiresAt INTEGER,
                StatusName TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS ix_{table}_expires_at ON {table}(ExpiresAt);"
        )
    }

    fn hour_bucket(&self, column: &str) -> String {
        format!("strftime('%Y-%m-%d-%H', {column}, 'unixepoch')")
    }
}
