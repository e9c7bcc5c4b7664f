//! # Mailroom Domain
//!
//! Message types, configuration and errors for the Mailroom outbox/inbox
//! store.
//!
//! This crate contains:
//! - Published and received message records and their delivery status
//! - Monitoring DTOs (statistics summary, listing query and view)
//! - Configuration structures with defaults and validation
//! - Domain error types and Result definitions
//!
//! ## Architecture
//! - No dependencies on other Mailroom crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod errors;
pub mod macros;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
