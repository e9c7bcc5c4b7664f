//! SQLCipher keying and verification

use rusqlite::Connection;
use tracing::{debug, error};

use crate::storage::error::{StorageError, StorageResult};

/// Cipher compatibility version for SQLCipher 4.x databases
const CIPHER_COMPATIBILITY: i32 = 4;

/// Key a freshly opened connection
///
/// Must run before any other statement touches the database.
///
/// # Errors
/// Returns `Encryption` if any of the cipher pragmas is rejected.
pub fn configure_sqlcipher(conn: &Connection, key: &str) -> StorageResult<()> {
    let start = std::time::Instant::now();

    conn.pragma_update(None, "key", key).map_err(|e| {
        error!(error = %e, "SQLCipher key setup failed");
        classify_cipher_error(e, "Failed to set encryption key")
    })?;

    conn.pragma_update(None, "cipher_compatibility", CIPHER_COMPATIBILITY).map_err(|e| {
        error!(error = %e, "Failed to set cipher_compatibility");
        StorageError::Encryption(format!("Failed to set cipher_compatibility: {}", e))
    })?;

    conn.pragma_update(None, "cipher_memory_security", "ON").map_err(|e| {
        error!(error = %e, "Failed to set cipher_memory_security");
        StorageError::Encryption(format!("Failed to set cipher_memory_security: {}", e))
    })?;

    debug!(duration_ms = start.elapsed().as_millis() as u64, "SQLCipher configuration successful");

    Ok(())
}

/// Force a page read so a wrong key surfaces before the pool is handed out
///
/// # Errors
/// Returns `WrongKeyOrNotEncrypted` if the key does not decrypt the file.
pub fn verify_encryption(conn: &Connection) -> StorageResult<()> {
    conn.query_row("SELECT count(*) FROM sqlite_master", [], |_| Ok(())).map_err(|e| {
        error!(error = %e, "Encryption verification failed");
        classify_cipher_error(e, "Failed to read database")
    })?;

    debug!("Encryption verification successful");
    Ok(())
}

/// Returns true when an error message means the file could not be decrypted
pub(crate) fn looks_like_wrong_key(message: &str) -> bool {
    let message = message.to_lowercase();
    message.contains("file is not a database")
        || message.contains("file is encrypted")
        || message.contains("notadb")
}

fn classify_cipher_error(err: rusqlite::Error, context: &str) -> StorageError {
    if err.sqlite_error_code() == Some(rusqlite::ErrorCode::NotADatabase)
        || looks_like_wrong_key(&err.to_string())
    {
        StorageError::WrongKeyOrNotEncrypted
    } else {
        StorageError::Encryption(format!("{}: {}", context, err))
    }
}
