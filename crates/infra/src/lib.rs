//! # Mailroom Infrastructure
//!
//! SQLite implementations of the `mailroom-core` ports.
//!
//! This crate contains:
//! - Connection management and schema provisioning
//! - The message store, retry selector and transactional outbox writer
//! - Monitoring queries over both message tables
//! - The expired message sweeper
//! - Configuration loading
//!
//! ## Architecture
//! - Implements traits defined in `mailroom-core`
//! - Depends on `mailroom-common` for the pooled SQLite connection
//! - Contains all "impure" code (I/O, background tasks)

pub mod config;
pub mod database;
pub mod errors;
pub mod sync;

// Re-export commonly used items
pub use database::*;
pub use errors::{map_join_error, InfraError};
pub use sync::{CleanupError, CleanupStats, DryRunResult, ExpiredMessageCollector};
