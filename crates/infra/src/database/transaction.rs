//! Ambient transactions and owned units of work.
//!
//! [`AmbientTransaction`] is the capability a caller hands to the outbox
//! writer so the message insert joins whatever business change the caller
//! already has open. [`UnitOfWork`] owns a pooled connection with an open
//! `BEGIN IMMEDIATE`; [`StorageTransaction`] is its async face.

use std::sync::Arc;

use mailroom_common::storage::SqliteConnection;
use mailroom_domain::{MailroomError, PublishedMessage, ReceivedMessage, Result};
use parking_lot::Mutex;
use rusqlite::{params, Connection};
use tokio::task;
use tracing::{debug, warn};

use super::manager::DbManager;
use crate::errors::conversions::map_sql_error;
use crate::errors::map_join_error;

/// An open transaction whose connection other writers may borrow
pub trait AmbientTransaction {
    fn connection(&self) -> &Connection;
}

impl AmbientTransaction for rusqlite::Transaction<'_> {
    fn connection(&self) -> &Connection {
        self
    }
}

/// Pooled connection holding an open write transaction
///
/// Dropping it without [`UnitOfWork::commit`] rolls back.
#[derive(Debug)]
pub struct UnitOfWork {
    conn: SqliteConnection,
    finished: bool,
}

impl UnitOfWork {
    /// Check out a connection and open a write transaction on it.
    pub fn begin(db: &DbManager) -> Result<Self> {
        let conn = db.get_connection()?;
        conn.execute_batch("BEGIN IMMEDIATE").map_err(map_sql_error)?;
        Ok(Self { conn, finished: false })
    }

    pub fn commit(mut self) -> Result<()> {
        self.commit_in_place()
    }

    /// Roll back explicitly and surface any error instead of logging it.
    pub fn rollback(mut self) -> Result<()> {
        self.finished = true;
        self.conn.execute_batch("ROLLBACK").map_err(map_sql_error)
    }

    /// A failed COMMIT leaves `finished` unset so drop still rolls back.
    fn commit_in_place(&mut self) -> Result<()> {
        if self.finished {
            return Err(MailroomError::Internal("transaction already finished".into()));
        }
        self.conn.execute_batch("COMMIT").map_err(map_sql_error)?;
        self.finished = true;
        Ok(())
    }
}

impl AmbientTransaction for UnitOfWork {
    fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl Drop for UnitOfWork {
    fn drop(&mut self) {
        if self.finished || self.conn.is_autocommit() {
            return;
        }
        match self.conn.execute_batch("ROLLBACK") {
            Ok(()) => debug!("uncommitted unit of work rolled back"),
            Err(err) => warn!(error = %err, "rollback of dropped unit of work failed"),
        }
    }
}

/// Async handle over a [`UnitOfWork`]
///
/// Obtained from `SqliteMessageStore::create_transaction`. Every call runs on
/// the blocking pool; `commit` consumes the handle and dropping it rolls
/// back.
#[derive(Debug)]
pub struct StorageTransaction {
    inner: Arc<Mutex<UnitOfWork>>,
    published_table: Arc<str>,
    received_table: Arc<str>,
}

impl StorageTransaction {
    pub(crate) fn new(
        unit: UnitOfWork,
        published_table: Arc<str>,
        received_table: Arc<str>,
    ) -> Self {
        Self { inner: Arc::new(Mutex::new(unit)), published_table, received_table }
    }

    /// Overwrite retries, content, expiry and status of a published row.
    ///
    /// Returns `false` when no row has the message's id.
    pub async fn update_published(&self, message: &PublishedMessage) -> Result<bool> {
        message.validate()?;
        let sql = update_sql(&self.published_table);
        let message = message.clone();
        self.with_ambient(move |tx| {
            let changed = tx
                .connection()
                .execute(
                    &sql,
                    params![
                        message.retries,
                        message.content,
                        message.expires_at,
                        message.status_name.as_str(),
                        message.id
                    ],
                )
                .map_err(map_sql_error)?;
            Ok(changed > 0)
        })
        .await
    }

    /// Received counterpart of [`StorageTransaction::update_published`]
    pub async fn update_received(&self, message: &ReceivedMessage) -> Result<bool> {
        message.validate()?;
        let sql = update_sql(&self.received_table);
        let message = message.clone();
        self.with_ambient(move |tx| {
            let changed = tx
                .connection()
                .execute(
                    &sql,
                    params![
                        message.retries,
                        message.content,
                        message.expires_at,
                        message.status_name.as_str(),
                        message.id
                    ],
                )
                .map_err(map_sql_error)?;
            Ok(changed > 0)
        })
        .await
    }

    /// Run blocking work against the open transaction.
    ///
    /// This is how a caller threads its own statements, or
    /// `OutboxPublisher::publish_within`, through the same commit.
    pub async fn with_ambient<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&dyn AmbientTransaction) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        task::spawn_blocking(move || {
            let unit = inner.lock();
            f(&*unit)
        })
        .await
        .map_err(map_join_error)?
    }

    pub async fn commit(self) -> Result<()> {
        let inner = Arc::clone(&self.inner);
        task::spawn_blocking(move || inner.lock().commit_in_place())
            .await
            .map_err(map_join_error)?
    }
}

fn update_sql(table: &str) -> String {
    format!(
        "UPDATE {table} SET Retries = ?1, Content = ?2, ExpiresAt = ?3, StatusName = ?4 \
         WHERE Id = ?5"
    )
}
