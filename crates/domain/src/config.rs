//! Configuration management

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::{MailroomError, Result};

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub messaging: MessagingConfig,
    pub cleanup: CleanupConfig,
}

/// Database configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: String,
    pub pool_size: u32,
    #[serde(skip_serializing)]
    pub encryption_key: Option<String>,
}

/// Message table and retry settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessagingConfig {
    /// Prefix for `{prefix}_published` and `{prefix}_received`
    pub table_prefix: String,
    /// Release tag stamped on new messages; only matching rows are retried
    pub version: String,
    /// Retry budget per message
    pub failed_retry_count: i32,
    /// Minimum message age before it becomes a retry candidate
    pub retry_grace_seconds: u64,
    /// Maximum candidates returned per retry query
    pub retry_batch_size: u32,
}

/// Expired message sweep settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanupConfig {
    pub enabled: bool,
    /// Rows deleted per statement
    pub batch_size: u32,
    /// Pause after a batch that deleted rows
    pub batch_pause_ms: u64,
    /// Wait between full sweeps
    pub idle_interval_seconds: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { path: "mailroom.db".to_string(), pool_size: 8, encryption_key: None }
    }
}

impl Default for MessagingConfig {
    fn default() -> Self {
        Self {
            table_prefix: "cap".to_string(),
            version: "v1".to_string(),
            failed_retry_count: 50,
            retry_grace_seconds: 240,
            retry_batch_size: 200,
        }
    }
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self { enabled: true, batch_size: 1000, batch_pause_ms: 1000, idle_interval_seconds: 300 }
    }
}

impl MessagingConfig {
    pub fn published_table(&self) -> String {
        format!("{}_published", self.table_prefix)
    }

    pub fn received_table(&self) -> String {
        format!("{}_received", self.table_prefix)
    }

    pub fn retry_grace(&self) -> Duration {
        Duration::from_secs(self.retry_grace_seconds)
    }
}

impl CleanupConfig {
    pub fn batch_pause(&self) -> Duration {
        Duration::from_millis(self.batch_pause_ms)
    }

    pub fn idle_interval(&self) -> Duration {
        Duration::from_secs(self.idle_interval_seconds)
    }
}

impl Config {
    /// Check values that would produce broken SQL or a stalled sweeper
    ///
    /// The table prefix is spliced into DDL, so it must be a plain
    /// identifier.
    ///
    /// # Errors
    /// Returns `MailroomError::Config` naming the first invalid field.
    pub fn validate(&self) -> Result<()> {
        let prefix = &self.messaging.table_prefix;
        let is_identifier = prefix
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
            && prefix.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !is_identifier {
            return Err(MailroomError::Config(format!(
                "messaging.table_prefix must be a plain identifier, got '{}'",
                prefix
            )));
        }

        if self.messaging.version.trim().is_empty() {
            return Err(MailroomError::Config("messaging.version must not be empty".into()));
        }

        if self.messaging.failed_retry_count < 0 {
            return Err(MailroomError::Config(
                "messaging.failed_retry_count must not be negative".into(),
            ));
        }

        if self.messaging.retry_batch_size == 0 {
            return Err(MailroomError::Config(
                "messaging.retry_batch_size must be greater than 0".into(),
            ));
        }

        if self.cleanup.batch_size == 0 {
            return Err(MailroomError::Config("cleanup.batch_size must be greater than 0".into()));
        }

        if self.database.pool_size == 0 {
            return Err(MailroomError::Config("database.pool_size must be greater than 0".into()));
        }

        Ok(())
    }
}
