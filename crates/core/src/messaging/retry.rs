//! Retry eligibility
//!
//! The SQL retry query and [`RetryPolicy::admits`] encode the same
//! predicate; the in-memory form is what tests and callers use to reason
//! about a single message.

use std::time::Duration;

use chrono::{DateTime, Utc};
use mailroom_domain::{MessageStatus, MessagingConfig, PublishedMessage, ReceivedMessage};

/// Parameters of the retry-candidate query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Messages with this many retries or more are never selected
    pub max_retries: i32,
    /// Minimum age before a message is selected
    pub grace: Duration,
    /// Only messages written by this release are selected
    pub version: String,
    /// Upper bound on candidates per query
    pub batch_size: u32,
}

impl RetryPolicy {
    pub fn from_config(config: &MessagingConfig) -> Self {
        Self {
            max_retries: config.failed_retry_count,
            grace: config.retry_grace(),
            version: config.version.clone(),
            batch_size: config.retry_batch_size,
        }
    }

    /// Messages must be added strictly before this unix timestamp
    pub fn cutoff(&self, now: DateTime<Utc>) -> i64 {
        let grace = i64::try_from(self.grace.as_secs()).unwrap_or(i64::MAX);
        now.timestamp().saturating_sub(grace)
    }

    /// Statuses the query filters on, as stored text
    pub fn retryable_statuses() -> [&'static str; 2] {
        [MessageStatus::Failed.as_str(), MessageStatus::Scheduled.as_str()]
    }

    /// Whether a message with these fields is a retry candidate at `now`
    pub fn admits(
        &self,
        status: MessageStatus,
        retries: i32,
        added: i64,
        version: &str,
        now: DateTime<Utc>,
    ) -> bool {
        status.is_retryable()
            && retries < self.max_retries
            && added < self.cutoff(now)
            && version == self.version
    }

    pub fn admits_published(&self, message: &PublishedMessage, now: DateTime<Utc>) -> bool {
        self.admits(message.status_name, message.retries, message.added, &message.version, now)
    }

    pub fn admits_received(&self, message: &ReceivedMessage, now: DateTime<Utc>) -> bool {
        self.admits(message.status_name, message.retries, message.added, &message.version, now)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&MessagingConfig::default())
    }
}
