//! Monitoring DTOs

use serde::{Deserialize, Serialize};

use crate::types::message::MessageStatus;

/// Which table a monitoring query targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageType {
    /// Published (outbox) messages
    Publish,
    /// Received (inbox) messages
    Subscribe,
}

/// Succeeded/failed totals for both tables
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatisticsSummary {
    pub published_succeeded: i64,
    pub received_succeeded: i64,
    pub published_failed: i64,
    pub received_failed: i64,
}

/// Paged, filtered listing request
///
/// Filters are optional and combined with AND. `group` only applies to
/// received messages. `page` is zero-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageQuery {
    pub message_type: MessageType,
    pub status_name: Option<String>,
    pub name: Option<String>,
    pub group: Option<String>,
    pub content: Option<String>,
    pub page: u32,
    pub page_size: u32,
}

impl MessageQuery {
    pub const DEFAULT_PAGE_SIZE: u32 = 20;

    /// First page of unfiltered results
    pub fn new(message_type: MessageType) -> Self {
        Self {
            message_type,
            status_name: None,
            name: None,
            group: None,
            content: None,
            page: 0,
            page_size: Self::DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status_name = Some(status.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn with_content(mut self, fragment: impl Into<String>) -> Self {
        self.content = Some(fragment.into());
        self
    }

    pub fn with_page(mut self, page: u32, page_size: u32) -> Self {
        self.page = page;
        self.page_size = page_size;
        self
    }

    /// Rows to skip before the requested page
    pub fn offset(&self) -> i64 {
        i64::from(self.page) * i64::from(self.page_size)
    }
}

/// One row of a message listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageView {
    pub id: i64,
    pub version: String,
    /// Set for received messages only
    pub group: Option<String>,
    pub name: String,
    pub content: String,
    pub added: i64,
    pub expires_at: Option<i64>,
    pub retries: i32,
    pub status_name: MessageStatus,
}
