//! Connection pool configuration

use std::time::Duration;

use crate::storage::error::{StorageError, StorageResult};

/// SQLite pool configuration
///
/// When `encryption_key` is set every pooled connection is keyed with
/// SQLCipher before any other statement runs.
#[derive(Clone)]
pub struct SqlitePoolConfig {
    /// Maximum number of connections in the pool
    pub max_size: u32,

    /// Connection timeout
    pub connection_timeout: Duration,

    /// Busy timeout for SQLite operations
    pub busy_timeout: Duration,

    /// Enable WAL journal mode
    pub enable_wal: bool,

    /// SQLCipher key; `None` opens a plain SQLite database
    pub encryption_key: Option<String>,
}

// Custom Debug impl to avoid exposing the key
impl std::fmt::Debug for SqlitePoolConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlitePoolConfig")
            .field("max_size", &self.max_size)
            .field("connection_timeout", &self.connection_timeout)
            .field("busy_timeout", &self.busy_timeout)
            .field("enable_wal", &self.enable_wal)
            .field("encryption_key", &self.encryption_key.as_ref().map(|_| "***"))
            .finish()
    }
}

impl Default for SqlitePoolConfig {
    fn default() -> Self {
        Self {
            max_size: 10,
            connection_timeout: Duration::from_secs(5),
            busy_timeout: Duration::from_millis(5000),
            enable_wal: true,
            encryption_key: None,
        }
    }
}

impl SqlitePoolConfig {
    /// Set the maximum pool size
    pub fn with_max_size(mut self, size: u32) -> Self {
        self.max_size = size;
        self
    }

    /// Key every connection with SQLCipher
    pub fn with_encryption_key(mut self, key: impl Into<String>) -> Self {
        self.encryption_key = Some(key.into());
        self
    }

    /// Validate the configuration
    ///
    /// # Errors
    /// Returns `InvalidConfig` for a zero pool size, a zero connection timeout
    /// or an empty encryption key.
    pub fn validate(&self) -> StorageResult<()> {
        if self.max_size == 0 {
            return Err(StorageError::InvalidConfig("Pool size must be greater than 0".into()));
        }

        if self.connection_timeout.is_zero() {
            return Err(StorageError::InvalidConfig(
                "Connection timeout must be greater than 0".into(),
            ));
        }

        if self.encryption_key.as_deref().is_some_and(str::is_empty) {
            return Err(StorageError::InvalidConfig("Encryption key must not be empty".into()));
        }

        Ok(())
    }
}
