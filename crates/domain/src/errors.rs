//! Error types used throughout the crate family

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for Mailroom
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum MailroomError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for Mailroom operations
pub type Result<T> = std::result::Result<T, MailroomError>;
