//! Published and received message records
//!
//! Timestamps are unix seconds, matching the INTEGER columns they are stored
//! in. The `*_utc()` helpers convert them for display.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{MailroomError, Result};
use crate::impl_domain_status_conversions;

/// Delivery lifecycle state of a stored message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MessageStatus {
    /// Waiting for a (first or further) delivery attempt
    #[default]
    Scheduled,
    /// Delivered; eligible for expiry
    Succeeded,
    /// Last attempt failed; eligible for retry while budget remains
    Failed,
}

impl_domain_status_conversions!(MessageStatus {
    Scheduled => "Scheduled",
    Succeeded => "Succeeded",
    Failed => "Failed",
});

impl MessageStatus {
    /// Statuses the retry selector picks up
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Scheduled | Self::Failed)
    }
}

/// Outgoing message persisted by the outbox writer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedMessage {
    pub id: i64,
    pub version: String,
    pub name: String,
    pub content: String,
    pub retries: i32,
    pub added: i64,
    pub expires_at: Option<i64>,
    pub status_name: MessageStatus,
}

impl PublishedMessage {
    /// New scheduled message added now, with no retries and no expiry
    ///
    /// `version` is left empty; the outbox writer stamps the running version.
    pub fn new(id: i64, name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id,
            version: String::new(),
            name: name.into(),
            content: content.into(),
            retries: 0,
            added: Utc::now().timestamp(),
            expires_at: None,
            status_name: MessageStatus::Scheduled,
        }
    }

    pub fn with_status(mut self, status: MessageStatus) -> Self {
        self.status_name = status;
        self
    }

    pub fn with_added(mut self, added: i64) -> Self {
        self.added = added;
        self
    }

    pub fn with_expires_at(mut self, expires_at: Option<i64>) -> Self {
        self.expires_at = expires_at;
        self
    }

    /// Reject messages that were never populated
    ///
    /// # Errors
    /// Returns `InvalidInput` when the name is blank.
    pub fn validate(&self) -> Result<()> {
        validate_name(&self.name, self.id)
    }

    pub fn added_utc(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.added, 0)
    }

    pub fn expires_at_utc(&self) -> Option<DateTime<Utc>> {
        self.expires_at.and_then(|ts| DateTime::from_timestamp(ts, 0))
    }
}

/// Incoming message recorded for a consumer group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceivedMessage {
    pub id: i64,
    pub version: String,
    pub group: String,
    pub name: String,
    pub content: String,
    pub retries: i32,
    pub added: i64,
    pub expires_at: Option<i64>,
    pub status_name: MessageStatus,
}

impl ReceivedMessage {
    /// New scheduled message for `group`, added now
    pub fn new(
        id: i64,
        group: impl Into<String>,
        name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id,
            version: String::new(),
            group: group.into(),
            name: name.into(),
            content: content.into(),
            retries: 0,
            added: Utc::now().timestamp(),
            expires_at: None,
            status_name: MessageStatus::Scheduled,
        }
    }

    pub fn with_status(mut self, status: MessageStatus) -> Self {
        self.status_name = status;
        self
    }

    pub fn with_added(mut self, added: i64) -> Self {
        self.added = added;
        self
    }

    pub fn with_expires_at(mut self, expires_at: Option<i64>) -> Self {
        self.expires_at = expires_at;
        self
    }

    /// Reject messages that were never populated
    ///
    /// # Errors
    /// Returns `InvalidInput` when the name is blank.
    pub fn validate(&self) -> Result<()> {
        validate_name(&self.name, self.id)
    }

    pub fn added_utc(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.added, 0)
    }

    pub fn expires_at_utc(&self) -> Option<DateTime<Utc>> {
        self.expires_at.and_then(|ts| DateTime::from_timestamp(ts, 0))
    }
}

fn validate_name(name: &str, id: i64) -> Result<()> {
    if name.trim().is_empty() {
        return Err(MailroomError::InvalidInput(format!("message {} has no name", id)));
    }
    Ok(())
}
