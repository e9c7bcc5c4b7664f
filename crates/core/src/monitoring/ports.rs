//! Monitoring query port
//!
//! Read-only aggregation over both message tables.
//!
//! # Example
//!
//! ```no_run
//! use mailroom_core::MonitoringApi;
//! use mailroom_domain::MessageType;
//!
//! async fn report(api: &impl MonitoringApi) {
//!     let summary = api.statistics().await.unwrap();
//!     println!("published failures: {}", summary.published_failed);
//!
//!     let failed = api.hourly_failed(MessageType::Publish).await.unwrap();
//!     for (hour, count) in failed {
//!         println!("{hour}: {count}");
//!     }
//! }
//! ```

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mailroom_domain::{MessageQuery, MessageStatus, MessageType, MessageView, Result, StatisticsSummary};

/// Port for delivery statistics and message listings
#[async_trait]
pub trait MonitoringApi: Send + Sync {
    /// Succeeded and failed totals for both tables in one round trip
    async fn statistics(&self) -> Result<StatisticsSummary>;

    /// Rows in one table whose status matches `status_name`, ignoring case
    async fn count_by_status(&self, message_type: MessageType, status_name: &str) -> Result<i64>;

    /// Succeeded rows per hour over the last 24 hours
    ///
    /// Always returns exactly 24 hour-truncated keys ending at the current
    /// hour; hours without rows are zero.
    async fn hourly_succeeded(
        &self,
        message_type: MessageType,
    ) -> Result<BTreeMap<DateTime<Utc>, i64>>;

    /// Failed rows per hour over the last 24 hours
    async fn hourly_failed(&self, message_type: MessageType) -> Result<BTreeMap<DateTime<Utc>, i64>>;

    /// One page of messages, newest first
    async fn messages(&self, query: &MessageQuery) -> Result<Vec<MessageView>>;

    async fn published_failed_count(&self) -> Result<i64> {
        self.count_by_status(MessageType::Publish, MessageStatus::Failed.as_str()).await
    }

    async fn published_succeeded_count(&self) -> Result<i64> {
        self.count_by_status(MessageType::Publish, MessageStatus::Succeeded.as_str()).await
    }

    async fn received_failed_count(&self) -> Result<i64> {
        self.count_by_status(MessageType::Subscribe, MessageStatus::Failed.as_str()).await
    }

    async fn received_succeeded_count(&self) -> Result<i64> {
        self.count_by_status(MessageType::Subscribe, MessageStatus::Succeeded.as_str()).await
    }
}
