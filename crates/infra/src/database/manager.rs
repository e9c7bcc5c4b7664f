//! Database connection manager backed by the shared SQLite pool.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use mailroom_common::storage::{SqliteConnection, SqlitePool, SqlitePoolConfig};
use mailroom_domain::{DatabaseConfig, MailroomError, Result};
use rusqlite::params;
use tracing::info;

use crate::errors::InfraError;

/// Database manager that wraps an [`SqlitePool`].
#[derive(Debug)]
pub struct DbManager {
    pool: Arc<SqlitePool>,
    path: PathBuf,
}

impl DbManager {
    /// Create a new manager with the given pool size and optional SQLCipher
    /// key. Without a key the database is plain SQLite.
    pub fn new<P: AsRef<Path>>(
        db_path: P,
        pool_size: u32,
        encryption_key: Option<&str>,
    ) -> Result<Self> {
        let path = db_path.as_ref().to_path_buf();

        let mut config =
            SqlitePoolConfig { max_size: pool_size.max(1), ..SqlitePoolConfig::default() };
        if let Some(key) = encryption_key {
            config = config.with_encryption_key(key);
        }

        let pool = SqlitePool::new(&path, config).map_err(map_storage_error)?;

        info!(
            db_path = %path.display(),
            max_connections = pool.metrics().max_pool_size(),
            encrypted = encryption_key.is_some(),
            "sqlite pool initialised"
        );

        Ok(Self { pool: Arc::new(pool), path })
    }

    /// Create a manager from the `database` configuration section.
    pub fn from_config(config: &DatabaseConfig) -> Result<Self> {
        Self::new(&config.path, config.pool_size, config.encryption_key.as_deref())
    }

    /// Borrow the underlying pool.
    pub fn pool(&self) -> &Arc<SqlitePool> {
        &self.pool
    }

    /// Acquire a connection from the pool.
    pub fn get_connection(&self) -> Result<SqliteConnection> {
        self.pool.get_connection().map_err(map_storage_error)
    }

    /// Return the configured database path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Verify the database answers a trivial query.
    pub fn health_check(&self) -> Result<()> {
        let conn = self.get_connection()?;
        conn.query_row("SELECT 1", params![], |row| row.get::<_, i32>(0))
            .map_err(|e| MailroomError::from(InfraError::from(e)))?;
        Ok(())
    }
}

fn map_storage_error(err: mailroom_common::storage::StorageError) -> MailroomError {
    MailroomError::from(InfraError::from(err))
}
