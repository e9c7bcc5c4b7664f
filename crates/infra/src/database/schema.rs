//! Message table provisioning.

use std::sync::Arc;

use mailroom_domain::{MessagingConfig, Result};
use rusqlite::Connection;
use tokio::task;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use super::dialect::{SqlDialect, SqliteDialect};
use super::manager::DbManager;
use crate::errors::conversions::map_sql_error;
use crate::errors::map_join_error;

/// Creates the published and received tables when they are missing.
#[derive(Debug)]
pub struct SchemaInitializer {
    db: Arc<DbManager>,
    dialect: Arc<dyn SqlDialect>,
    published_table: String,
    received_table: String,
}

impl SchemaInitializer {
    pub fn new(db: Arc<DbManager>, messaging: &MessagingConfig) -> Self {
        Self::with_dialect(db, messaging, Arc::new(SqliteDialect))
    }

    pub fn with_dialect(
        db: Arc<DbManager>,
        messaging: &MessagingConfig,
        dialect: Arc<dyn SqlDialect>,
    ) -> Self {
        Self {
            db,
            dialect,
            published_table: messaging.published_table(),
            received_table: messaging.received_table(),
        }
    }

    /// Ensure both tables and their expiry indexes exist.
    ///
    /// Does nothing when `cancel` is already triggered. Safe to call
    /// repeatedly.
    ///
    /// # Errors
    /// DDL failures are returned as `MailroomError::Database`.
    #[instrument(skip(self, cancel), fields(published = %self.published_table, received = %self.received_table))]
    pub async fn initialize(&self, cancel: &CancellationToken) -> Result<()> {
        if cancel.is_cancelled() {
            debug!("schema initialisation skipped, already cancelled");
            return Ok(());
        }

        let db = Arc::clone(&self.db);
        let dialect = Arc::clone(&self.dialect);
        let published = self.published_table.clone();
        let received = self.received_table.clone();

        let created = task::spawn_blocking(move || -> Result<usize> {
            let conn = db.get_connection()?;
            let mut created = 0;
            if ensure_table(&conn, dialect.as_ref(), &published, |d, t| {
                d.create_published_table(t)
            })? {
                created += 1;
            }
            if ensure_table(&conn, dialect.as_ref(), &received, |d, t| {
                d.create_received_table(t)
            })? {
                created += 1;
            }
            Ok(created)
        })
        .await
        .map_err(map_join_error)??;

        if created > 0 {
            info!(tables_created = created, "message schema created");
        }
        debug!("message schema ensured");
        Ok(())
    }
}

/// Returns `true` when the table had to be created.
fn ensure_table(
    conn: &Connection,
    dialect: &dyn SqlDialect,
    table: &str,
    ddl: impl Fn(&dyn SqlDialect, &str) -> String,
) -> Result<bool> {
    if table_exists(conn, dialect, table)? {
        return Ok(false);
    }
    conn.execute_batch(&ddl(dialect, table)).map_err(map_sql_error)?;
    Ok(true)
}

pub(crate) fn table_exists(conn: &Connection, dialect: &dyn SqlDialect, table: &str) -> Result<bool> {
    let count: i64 = conn
        .query_row(dialect.table_exists_sql(), [table], |row| row.get(0))
        .map_err(map_sql_error)?;
    Ok(count > 0)
}
