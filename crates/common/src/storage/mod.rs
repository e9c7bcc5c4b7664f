//! Storage primitives for pooled SQLite databases
//!
//! This module provides the r2d2 connection pool, the pooled connection
//! wrapper, per-connection pragmas and optional SQLCipher keying.

pub mod config;
pub mod error;
pub mod metrics;
pub mod sqlite;

// Re-export commonly used types
pub use config::SqlitePoolConfig;
pub use error::{StorageError, StorageResult};
pub use metrics::StorageMetrics;
pub use sqlite::{apply_connection_pragmas, SqliteConnection, SqlitePool};
