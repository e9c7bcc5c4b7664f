//! Integration tests for the storage module
//!
//! These tests verify end-to-end pool workflows including:
//! - Plain and SQLCipher-keyed databases
//! - Wrong-key detection
//! - Transactions on pooled connections
//! - Pool exhaustion

#![cfg(feature = "platform")]

use std::sync::atomic::Ordering;
use std::time::Duration;

use mailroom_common::error::{ErrorClassification, ErrorSeverity};
use mailroom_common::storage::{SqlitePool, SqlitePoolConfig, StorageError};
use tempfile::TempDir;

fn test_encryption_key() -> String {
    "test_key_64_chars_long_aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa".to_string()
}

/// One connection per pool so building it pays the key derivation once.
fn short_timeout_config() -> SqlitePoolConfig {
    SqlitePoolConfig {
        max_size: 1,
        connection_timeout: Duration::from_secs(1),
        ..SqlitePoolConfig::default()
    }
}

/// Data written through an encrypted pool is readable after reopening with
/// the same key.
#[test]
fn encrypted_pool_persists_across_reopen() {
    let temp_dir = TempDir::new().expect("temp dir");
    let db_path = temp_dir.path().join("encrypted.db");
    let config = SqlitePoolConfig::default().with_encryption_key(test_encryption_key());

    {
        let pool = SqlitePool::new(&db_path, config.clone()).expect("pool");
        let conn = pool.get_connection().expect("connection");
        conn.execute_batch(
            "CREATE TABLE cap_published (Id INTEGER PRIMARY KEY, Name TEXT NOT NULL);
             INSERT INTO cap_published (Id, Name) VALUES (1, 'orders.created');",
        )
        .expect("seed");
    }

    let pool = SqlitePool::new(&db_path, config).expect("reopen");
    let conn = pool.get_connection().expect("connection");
    let name: String = conn
        .query_row("SELECT Name FROM cap_published WHERE Id = 1", [], |row| row.get(0))
        .expect("row");
    assert_eq!(name, "orders.created");
}

/// Opening an encrypted database with another key fails with a critical
/// error instead of handing out unusable connections.
#[test]
fn wrong_key_is_reported() {
    let temp_dir = TempDir::new().expect("temp dir");
    let db_path = temp_dir.path().join("encrypted.db");

    {
        let config = short_timeout_config().with_encryption_key(test_encryption_key());
        let pool = SqlitePool::new(&db_path, config).expect("pool");
        let conn = pool.get_connection().expect("connection");
        conn.execute("CREATE TABLE t (id INTEGER)", []).expect("create");
    }

    let config = short_timeout_config().with_encryption_key("a completely different key");
    let err = SqlitePool::new(&db_path, config).expect_err("wrong key must fail");

    assert!(matches!(err, StorageError::WrongKeyOrNotEncrypted), "unexpected error: {err}");
    assert!(err.is_critical());
    assert_eq!(err.severity(), ErrorSeverity::Critical);
}

/// A rolled back transaction on a pooled connection leaves no rows behind.
#[test]
fn rollback_discards_pooled_writes() {
    let temp_dir = TempDir::new().expect("temp dir");
    let pool = SqlitePool::new(&temp_dir.path().join("plain.db"), SqlitePoolConfig::default())
        .expect("pool");

    let mut conn = pool.get_connection().expect("connection");
    conn.execute("CREATE TABLE t (id INTEGER)", []).expect("create");

    {
        let tx = conn.transaction().expect("begin");
        tx.execute("INSERT INTO t (id) VALUES (1)", []).expect("insert");
        // dropped without commit
    }

    let count: i64 = conn.query_row("SELECT COUNT(*) FROM t", [], |row| row.get(0)).expect("count");
    assert_eq!(count, 0);
}

/// Exhausting a single-connection pool surfaces a retryable timeout.
#[test]
fn exhausted_pool_times_out() {
    let temp_dir = TempDir::new().expect("temp dir");
    let config = SqlitePoolConfig {
        max_size: 1,
        connection_timeout: Duration::from_millis(200),
        ..SqlitePoolConfig::default()
    };
    let pool = SqlitePool::new(&temp_dir.path().join("one.db"), config).expect("pool");

    let _held = pool.get_connection().expect("first connection");
    let err = pool.get_connection().expect_err("second connection must time out");

    assert!(matches!(err, StorageError::Timeout(_)), "unexpected error: {err}");
    assert!(err.is_retryable());
    assert_eq!(pool.metrics().connections_timeout.load(Ordering::Relaxed), 1);
}
