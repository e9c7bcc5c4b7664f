//! SQLite connection pool

use std::path::Path;
use std::sync::Arc;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use tracing::{debug, info, instrument, warn};

use super::cipher::{configure_sqlcipher, looks_like_wrong_key, verify_encryption};
use super::connection::SqliteConnection;
use super::pragmas::apply_connection_pragmas;
use crate::storage::config::SqlitePoolConfig;
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::metrics::StorageMetrics;

/// SQLite connection pool
///
/// Manages a pool of SQLite connections using r2d2. Each new connection is
/// keyed (when an encryption key is configured) and then has its pragmas
/// applied before it is handed out.
#[derive(Debug)]
pub struct SqlitePool {
    pool: Pool<SqliteConnectionManager>,
    config: SqlitePoolConfig,
    metrics: Arc<StorageMetrics>,
}

impl SqlitePool {
    /// Create a new connection pool
    ///
    /// # Errors
    /// Returns an error if:
    /// - The configuration is invalid
    /// - The database file can't be opened
    /// - The encryption key is wrong
    #[instrument(skip(config), fields(db_path = ?path, pool_size = config.max_size, encrypted = config.encryption_key.is_some()))]
    pub fn new(path: &Path, config: SqlitePoolConfig) -> StorageResult<Self> {
        config.validate()?;
        info!("Creating SQLite connection pool");

        let metrics = Arc::new(StorageMetrics::new(config.max_size));

        let init_config = config.clone();
        let manager = SqliteConnectionManager::file(path).with_init(move |conn| {
            if let Some(key) = init_config.encryption_key.as_deref() {
                configure_sqlcipher(conn, key)
                    .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
            }

            apply_connection_pragmas(conn, &init_config)
                .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;

            Ok(())
        });

        let pool = Pool::builder()
            .max_size(config.max_size)
            .connection_timeout(config.connection_timeout)
            .build(manager)
            .map_err(|e| {
                warn!("Failed to create connection pool: {}", e);
                classify_pool_error(&e, "Failed to create pool")
            })?;

        {
            let conn = pool.get().map_err(|e| {
                warn!("Failed to get test connection: {}", e);
                classify_pool_error(&e, "Failed to get test connection")
            })?;

            if config.encryption_key.is_some() {
                verify_encryption(&conn)?;
            }
            debug!("Test connection verified");
        }

        info!("SQLite pool created successfully with {} connections", config.max_size);

        Ok(Self { pool, config, metrics })
    }

    /// Get a connection from the pool
    ///
    /// # Errors
    /// Returns `Timeout` when the pool is exhausted for longer than the
    /// configured connection timeout, `Connection` for other failures.
    #[instrument(skip(self), fields(pool_size = self.config.max_size))]
    pub fn get_connection(&self) -> StorageResult<SqliteConnection> {
        let start = std::time::Instant::now();

        match self.pool.get() {
            Ok(conn) => {
                let duration_ms = start.elapsed().as_millis() as u64;
                self.metrics.record_connection_acquired(duration_ms);
                debug!("Connection acquired in {}ms", duration_ms);
                Ok(SqliteConnection::new(conn))
            }
            Err(e) => {
                if e.to_string().to_lowercase().contains("timed out") {
                    self.metrics.record_connection_timeout();
                    warn!("Connection timeout after {:?}", self.config.connection_timeout);
                    Err(StorageError::Timeout(self.config.connection_timeout.as_secs()))
                } else {
                    self.metrics.record_connection_error();
                    warn!("Connection error: {}", e);
                    Err(StorageError::Connection(format!("Failed to get connection: {}", e)))
                }
            }
        }
    }

    /// Get the pool metrics
    pub fn metrics(&self) -> &Arc<StorageMetrics> {
        &self.metrics
    }

    /// Current number of open and idle connections
    pub fn state(&self) -> (u32, u32) {
        let state = self.pool.state();
        (state.connections, state.idle_connections)
    }

    /// Get the pool configuration
    pub fn config(&self) -> &SqlitePoolConfig {
        &self.config
    }
}

fn classify_pool_error(err: &r2d2::Error, context: &str) -> StorageError {
    if looks_like_wrong_key(&err.to_string()) {
        StorageError::WrongKeyOrNotEncrypted
    } else {
        StorageError::Connection(format!("{}: {}", context, err))
    }
}
