//! Port interfaces for message persistence

use async_trait::async_trait;
use mailroom_domain::{MessageStatus, PublishedMessage, ReceivedMessage, Result};

/// Durable storage for published and received messages
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Insert a published message in its own transaction
    ///
    /// A duplicate id fails with `MailroomError::Database`.
    async fn insert_published(&self, message: &PublishedMessage) -> Result<()>;

    /// Insert a received message in its own transaction
    ///
    /// The stored version is the running version, not the caller's.
    async fn insert_received(&self, message: &ReceivedMessage) -> Result<()>;

    /// Look up a published message; absent ids return `Ok(None)`
    async fn get_published(&self, id: i64) -> Result<Option<PublishedMessage>>;

    /// Look up a received message; absent ids return `Ok(None)`
    async fn get_received(&self, id: i64) -> Result<Option<ReceivedMessage>>;

    /// Record a delivery outcome
    ///
    /// Sets the status, increments `retries` by one and clears `expires_at`
    /// in a single statement. Returns `false` when no row has this id.
    async fn change_published_state(&self, id: i64, status: MessageStatus) -> Result<bool>;

    /// Received counterpart of [`MessageStore::change_published_state`]
    async fn change_received_state(&self, id: i64, status: MessageStatus) -> Result<bool>;
}

/// Outbox write path without an ambient transaction
///
/// Implementations also offer a synchronous variant bound to a caller's
/// open transaction; that variant is backend specific and lives next to the
/// implementation.
#[async_trait]
pub trait OutboxWriter: Send + Sync {
    /// Persist a message on a private connection and commit immediately
    async fn publish(&self, message: &PublishedMessage) -> Result<()>;
}

/// Bounded selection of messages that should be delivered again
///
/// Candidates are not Succeeded, have retry budget left, were added before
/// the grace cutoff and carry the running version. At most the configured
/// batch size is returned, in no particular order.
#[async_trait]
pub trait RetryCandidateSource: Send + Sync {
    async fn find_published_retry_candidates(&self) -> Result<Vec<PublishedMessage>>;

    async fn find_received_retry_candidates(&self) -> Result<Vec<ReceivedMessage>>;
}
