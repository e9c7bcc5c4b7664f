//! # Mailroom Core
//!
//! Storage-agnostic message persistence logic.
//!
//! This crate contains:
//! - Port interfaces (traits) for the message store, retry selection and
//!   monitoring queries
//! - The retry-eligibility policy
//! - The 24-hour histogram window used by monitoring
//!
//! ## Architecture Principles
//! - Only depends on `mailroom-domain`
//! - No database code
//! - All storage access via traits

pub mod messaging;
pub mod monitoring;

pub use messaging::ports::{MessageStore, OutboxWriter, RetryCandidateSource};
pub use messaging::retry::RetryPolicy;
pub use monitoring::ports::MonitoringApi;
pub use monitoring::timeline::{HourlyWindow, HOURLY_KEY_FORMAT, WINDOW_HOURS};
