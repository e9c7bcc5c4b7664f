//! SQLite-backed message store and retry selector.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use mailroom_core::{MessageStore, RetryCandidateSource, RetryPolicy};
use mailroom_domain::{
    MessageStatus, MessagingConfig, PublishedMessage, ReceivedMessage, Result as DomainResult,
};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tokio::task;
use tracing::{debug, instrument, warn};

use super::manager::DbManager;
use super::transaction::{AmbientTransaction, StorageTransaction, UnitOfWork};
use crate::errors::conversions::map_sql_error;
use crate::errors::map_join_error;

const PUBLISHED_COLUMNS: &str = "Id, Version, Name, Content, Retries, Added, ExpiresAt, StatusName";
const RECEIVED_COLUMNS: &str =
    "Id, Version, \"Group\", Name, Content, Retries, Added, ExpiresAt, StatusName";

/// Message store over the `{prefix}_published` and `{prefix}_received`
/// tables.
#[derive(Debug, Clone)]
pub struct SqliteMessageStore {
    db: Arc<DbManager>,
    published_table: Arc<str>,
    received_table: Arc<str>,
    retry: RetryPolicy,
}

impl SqliteMessageStore {
    pub fn new(db: Arc<DbManager>, messaging: &MessagingConfig) -> Self {
        Self {
            db,
            published_table: Arc::from(messaging.published_table()),
            received_table: Arc::from(messaging.received_table()),
            retry: RetryPolicy::from_config(messaging),
        }
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Open a write transaction for `update_published` / `update_received`.
    pub async fn create_transaction(&self) -> DomainResult<StorageTransaction> {
        let db = Arc::clone(&self.db);
        let unit =
            task::spawn_blocking(move || UnitOfWork::begin(&db)).await.map_err(map_join_error)??;
        Ok(StorageTransaction::new(
            unit,
            Arc::clone(&self.published_table),
            Arc::clone(&self.received_table),
        ))
    }

    /// Insert a received message on the caller's open transaction.
    ///
    /// Blocking; call it from a blocking context such as
    /// `StorageTransaction::with_ambient`.
    pub fn insert_received_within(
        &self,
        tx: &dyn AmbientTransaction,
        message: &ReceivedMessage,
    ) -> DomainResult<()> {
        message.validate()?;
        insert_received_row(tx.connection(), &self.received_table, &self.retry.version, message)
    }

    /// Look up a published message through the caller's open transaction,
    /// seeing its uncommitted writes.
    pub fn get_published_within(
        &self,
        tx: &dyn AmbientTransaction,
        id: i64,
    ) -> DomainResult<Option<PublishedMessage>> {
        let sql = format!("SELECT {PUBLISHED_COLUMNS} FROM {} WHERE Id = ?1", self.published_table);
        tx.connection().query_row(&sql, [id], map_published_row).optional().map_err(map_sql_error)
    }

    pub fn get_received_within(
        &self,
        tx: &dyn AmbientTransaction,
        id: i64,
    ) -> DomainResult<Option<ReceivedMessage>> {
        let sql = format!("SELECT {RECEIVED_COLUMNS} FROM {} WHERE Id = ?1", self.received_table);
        tx.connection().query_row(&sql, [id], map_received_row).optional().map_err(map_sql_error)
    }

    async fn change_state(&self, table: Arc<str>, id: i64, status: MessageStatus) -> DomainResult<bool> {
        let db = Arc::clone(&self.db);
        let sql = format!(
            "UPDATE {table} SET Retries = Retries + 1, ExpiresAt = NULL, StatusName = ?1 \
             WHERE Id = ?2"
        );

        let changed = task::spawn_blocking(move || -> DomainResult<usize> {
            let conn = db.get_connection()?;
            conn.execute(&sql, params![status.as_str(), id]).map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)??;

        if changed == 0 {
            warn!(table = %table, id, status = %status, "state change matched no message");
            return Ok(false);
        }
        debug!(table = %table, id, status = %status, "message state changed");
        Ok(true)
    }
}

#[async_trait]
impl MessageStore for SqliteMessageStore {
    #[instrument(skip(self, message), fields(id = message.id, name = %message.name))]
    async fn insert_published(&self, message: &PublishedMessage) -> DomainResult<()> {
        message.validate()?;
        let db = Arc::clone(&self.db);
        let table = Arc::clone(&self.published_table);
        let version = self.retry.version.clone();
        let message = message.clone();

        task::spawn_blocking(move || -> DomainResult<()> {
            let conn = db.get_connection()?;
            insert_published_row(&conn, &table, &version, &message)
        })
        .await
        .map_err(map_join_error)??;

        debug!("published message stored");
        Ok(())
    }

    #[instrument(skip(self, message), fields(id = message.id, group = %message.group))]
    async fn insert_received(&self, message: &ReceivedMessage) -> DomainResult<()> {
        message.validate()?;
        let db = Arc::clone(&self.db);
        let table = Arc::clone(&self.received_table);
        let version = self.retry.version.clone();
        let message = message.clone();

        task::spawn_blocking(move || -> DomainResult<()> {
            let conn = db.get_connection()?;
            insert_received_row(&conn, &table, &version, &message)
        })
        .await
        .map_err(map_join_error)??;

        debug!("received message stored");
        Ok(())
    }

    async fn get_published(&self, id: i64) -> DomainResult<Option<PublishedMessage>> {
        let db = Arc::clone(&self.db);
        let sql = format!("SELECT {PUBLISHED_COLUMNS} FROM {} WHERE Id = ?1", self.published_table);

        task::spawn_blocking(move || -> DomainResult<Option<PublishedMessage>> {
            let conn = db.get_connection()?;
            conn.query_row(&sql, [id], map_published_row).optional().map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn get_received(&self, id: i64) -> DomainResult<Option<ReceivedMessage>> {
        let db = Arc::clone(&self.db);
        let sql = format!("SELECT {RECEIVED_COLUMNS} FROM {} WHERE Id = ?1", self.received_table);

        task::spawn_blocking(move || -> DomainResult<Option<ReceivedMessage>> {
            let conn = db.get_connection()?;
            conn.query_row(&sql, [id], map_received_row).optional().map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn change_published_state(&self, id: i64, status: MessageStatus) -> DomainResult<bool> {
        self.change_state(Arc::clone(&self.published_table), id, status).await
    }

    async fn change_received_state(&self, id: i64, status: MessageStatus) -> DomainResult<bool> {
        self.change_state(Arc::clone(&self.received_table), id, status).await
    }
}

#[async_trait]
impl RetryCandidateSource for SqliteMessageStore {
    async fn find_published_retry_candidates(&self) -> DomainResult<Vec<PublishedMessage>> {
        let db = Arc::clone(&self.db);
        let sql = retry_sql(PUBLISHED_COLUMNS, &self.published_table);
        let policy = self.retry.clone();

        let candidates = task::spawn_blocking(move || -> DomainResult<Vec<PublishedMessage>> {
            let conn = db.get_connection()?;
            query_retry(&conn, &sql, &policy, map_published_row)
        })
        .await
        .map_err(map_join_error)??;

        debug!(count = candidates.len(), "published retry candidates selected");
        Ok(candidates)
    }

    async fn find_received_retry_candidates(&self) -> DomainResult<Vec<ReceivedMessage>> {
        let db = Arc::clone(&self.db);
        let sql = retry_sql(RECEIVED_COLUMNS, &self.received_table);
        let policy = self.retry.clone();

        let candidates = task::spawn_blocking(move || -> DomainResult<Vec<ReceivedMessage>> {
            let conn = db.get_connection()?;
            query_retry(&conn, &sql, &policy, map_received_row)
        })
        .await
        .map_err(map_join_error)??;

        debug!(count = candidates.len(), "received retry candidates selected");
        Ok(candidates)
    }
}

pub(crate) fn insert_published_row(
    conn: &Connection,
    table: &str,
    version: &str,
    message: &PublishedMessage,
) -> DomainResult<()> {
    let sql = format!(
        "INSERT INTO {table} ({PUBLISHED_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"
    );
    conn.execute(
        &sql,
        params![
            message.id,
            version,
            message.name,
            message.content,
            message.retries,
            message.added,
            message.expires_at,
            message.status_name.as_str(),
        ],
    )
    .map(|_| ())
    .map_err(map_sql_error)
}

pub(crate) fn insert_received_row(
    conn: &Connection,
    table: &str,
    version: &str,
    message: &ReceivedMessage,
) -> DomainResult<()> {
    let sql = format!(
        "INSERT INTO {table} ({RECEIVED_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"
    );
    conn.execute(
        &sql,
        params![
            message.id,
            version,
            message.group,
            message.name,
            message.content,
            message.retries,
            message.added,
            message.expires_at,
            message.status_name.as_str(),
        ],
    )
    .map(|_| ())
    .map_err(map_sql_error)
}

fn retry_sql(columns: &str, table: &str) -> String {
    format!(
        "SELECT {columns} FROM {table} \
         WHERE Retries < ?1 AND Version = ?2 AND Added < ?3 AND StatusName IN (?4, ?5) \
         LIMIT ?6"
    )
}

fn query_retry<T>(
    conn: &Connection,
    sql: &str,
    policy: &RetryPolicy,
    map_row: fn(&Row<'_>) -> rusqlite::Result<T>,
) -> DomainResult<Vec<T>> {
    let [failed, scheduled] = RetryPolicy::retryable_statuses();
    let mut stmt = conn.prepare(sql).map_err(map_sql_error)?;
    let rows = stmt
        .query_map(
            params![
                policy.max_retries,
                policy.version,
                policy.cutoff(Utc::now()),
                failed,
                scheduled,
                i64::from(policy.batch_size),
            ],
            map_row,
        )
        .map_err(map_sql_error)?;
    rows.collect::<rusqlite::Result<Vec<_>>>().map_err(map_sql_error)
}

fn map_published_row(row: &Row<'_>) -> rusqlite::Result<PublishedMessage> {
    let id: i64 = row.get(0)?;
    let status_raw: String = row.get(7)?;
    Ok(PublishedMessage {
        id,
        version: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
        name: row.get(2)?,
        content: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
        retries: row.get(4)?,
        added: row.get(5)?,
        expires_at: row.get(6)?,
        status_name: parse_status(id, &status_raw),
    })
}

fn map_received_row(row: &Row<'_>) -> rusqlite::Result<ReceivedMessage> {
    let id: i64 = row.get(0)?;
    let status_raw: String = row.get(8)?;
    Ok(ReceivedMessage {
        id,
        version: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
        group: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
        name: row.get(3)?,
        content: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
        retries: row.get(5)?,
        added: row.get(6)?,
        expires_at: row.get(7)?,
        status_name: parse_status(id, &status_raw),
    })
}

/// Unknown status text is read as `Scheduled` so one bad row cannot break a
/// listing.
pub(crate) fn parse_status(id: i64, raw: &str) -> MessageStatus {
    match raw.parse::<MessageStatus>() {
        Ok(status) => status,
        Err(err) => {
            warn!(id, status = raw, error = %err, "unknown message status, treating as Scheduled");
            MessageStatus::Scheduled
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_status_ignores_case() {
        assert_eq!(parse_status(1, "FAILED"), MessageStatus::Failed);
        assert_eq!(parse_status(1, "succeeded"), MessageStatus::Succeeded);
    }

    #[test]
    fn parse_status_falls_back_to_scheduled() {
        assert_eq!(parse_status(1, ""), MessageStatus::Scheduled);
        assert_eq!(parse_status(1, "Delayed"), MessageStatus::Scheduled);
    }

    #[test]
    fn retry_sql_bounds_the_batch() {
        let sql = retry_sql(PUBLISHED_COLUMNS, "cap_published");
        assert!(sql.contains("FROM cap_published"));
        assert!(sql.trim_end().ends_with("LIMIT ?6"));
    }
}
