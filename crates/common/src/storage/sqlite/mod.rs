//! SQLite backend
//!
//! Provides an r2d2-based connection pool for plain or SQLCipher-encrypted
//! SQLite databases.

pub mod cipher;
pub mod connection;
pub mod pool;
pub mod pragmas;

pub use cipher::{configure_sqlcipher, verify_encryption};
pub use connection::SqliteConnection;
pub use pool::SqlitePool;
pub use pragmas::apply_connection_pragmas;
