//! Background maintenance for the message tables
//!
//! - ExpiredMessageCollector: periodic deletion of expired messages

pub mod cleanup;
mod errors;

pub use cleanup::{CleanupStats, DryRunResult, ExpiredMessageCollector};
pub use errors::CleanupError;
