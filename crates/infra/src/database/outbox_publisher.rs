//! Transactional outbox writer.
//!
//! `publish_within` writes on the caller's transaction so the message and the
//! business change commit or roll back together. `publish` is the fallback
//! for callers without one.

use std::sync::Arc;

use async_trait::async_trait;
use mailroom_core::OutboxWriter;
use mailroom_domain::{MailroomError, MessagingConfig, PublishedMessage, Result as DomainResult};
use tokio::task;
use tracing::{debug, instrument};

use super::manager::DbManager;
use super::message_repository::insert_published_row;
use super::transaction::AmbientTransaction;
use crate::errors::map_join_error;

/// Writes published messages, stamping the running version on each row.
#[derive(Debug, Clone)]
pub struct OutboxPublisher {
    db: Arc<DbManager>,
    table: Arc<str>,
    version: Arc<str>,
}

impl OutboxPublisher {
    pub fn new(db: Arc<DbManager>, messaging: &MessagingConfig) -> Self {
        Self {
            db,
            table: Arc::from(messaging.published_table()),
            version: Arc::from(messaging.version.as_str()),
        }
    }

    /// Insert on the caller's open transaction.
    ///
    /// Blocking. The row becomes visible only when the caller commits.
    ///
    /// # Errors
    /// `InvalidInput` for a message without a name or a connection that is
    /// not inside a transaction; `Database` when the insert fails.
    pub fn publish_within(
        &self,
        tx: &dyn AmbientTransaction,
        message: &PublishedMessage,
    ) -> DomainResult<()> {
        message.validate()?;
        let conn = tx.connection();
        if conn.is_autocommit() {
            return Err(MailroomError::InvalidInput(
                "publish_within requires an open transaction".into(),
            ));
        }
        insert_published_row(conn, &self.table, &self.version, message)?;
        debug!(id = message.id, name = %message.name, "message enlisted in ambient transaction");
        Ok(())
    }
}

#[async_trait]
impl OutboxWriter for OutboxPublisher {
    #[instrument(skip(self, message), fields(id = message.id, name = %message.name))]
    async fn publish(&self, message: &PublishedMessage) -> DomainResult<()> {
        message.validate()?;
        let db = Arc::clone(&self.db);
        let table = Arc::clone(&self.table);
        let version = Arc::clone(&self.version);
        let message = message.clone();

        task::spawn_blocking(move || -> DomainResult<()> {
            let conn = db.get_connection()?;
            insert_published_row(&conn, &table, &version, &message)
        })
        .await
        .map_err(map_join_error)??;

        debug!("message published without ambient transaction");
        Ok(())
    }
}
