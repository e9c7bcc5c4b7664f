//! Expired message sweeper
//!
//! Deletes rows whose `ExpiresAt` has passed from both message tables, in
//! bounded batches so no single statement holds the write lock for long.
//!
//! # Features
//!
//! - Batch deletion with a pause after every batch that removed rows
//! - Cancellation observed after each pause and during the idle wait
//! - Dry-run mode reporting what a sweep would delete
//! - Explicit start/stop lifecycle with join handle tracking

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use mailroom_common::error::{CommonError, CommonResult};
use mailroom_domain::{CleanupConfig, MessagingConfig, Result as DomainResult};
use rusqlite::params;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::errors::CleanupError;
use crate::database::DbManager;
use crate::errors::conversions::map_sql_error;
use crate::errors::map_join_error;

type TaskHandle = Arc<Mutex<Option<JoinHandle<()>>>>;

const STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// Rows removed by one sweep
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CleanupStats {
    pub published_deleted: usize,
    pub received_deleted: usize,
    pub duration_secs: f64,
}

impl CleanupStats {
    pub fn total_deleted(&self) -> usize {
        self.published_deleted + self.received_deleted
    }
}

/// Rows a sweep would remove right now
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DryRunResult {
    pub published: usize,
    pub received: usize,
}

/// Everything one sweep needs; cloned into the background task.
#[derive(Debug, Clone)]
struct Sweep {
    db: Arc<DbManager>,
    published_table: Arc<str>,
    received_table: Arc<str>,
    batch_size: i64,
    batch_pause: Duration,
}

impl Sweep {
    async fn run(&self, cancel: &CancellationToken) -> Result<CleanupStats, CleanupError> {
        if cancel.is_cancelled() {
            return Err(CleanupError::Stopped);
        }

        let start = Instant::now();
        let now = Utc::now().timestamp();

        let published_deleted =
            self.sweep_table(Arc::clone(&self.published_table), now, cancel).await?;
        let received_deleted =
            self.sweep_table(Arc::clone(&self.received_table), now, cancel).await?;

        Ok(CleanupStats {
            published_deleted,
            received_deleted,
            duration_secs: start.elapsed().as_secs_f64(),
        })
    }

    async fn sweep_table(
        &self,
        table: Arc<str>,
        now: i64,
        cancel: &CancellationToken,
    ) -> Result<usize, CleanupError> {
        let mut total = 0;
        loop {
            let deleted = self.delete_batch(Arc::clone(&table), now).await?;
            if deleted == 0 {
                break;
            }
            total += deleted;
            debug!(table = %table, deleted, "expired batch deleted");

            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = tokio::time::sleep(self.batch_pause) => {}
            }
            if cancel.is_cancelled() {
                info!(table = %table, deleted = total, "cleanup stopped between batches");
                return Err(CleanupError::Stopped);
            }
        }
        Ok(total)
    }

    async fn delete_batch(&self, table: Arc<str>, now: i64) -> DomainResult<usize> {
        let db = Arc::clone(&self.db);
        let batch_size = self.batch_size;
        let sql = format!(
            "DELETE FROM {table} WHERE Id IN \
             (SELECT Id FROM {table} WHERE ExpiresAt < ?1 LIMIT ?2)"
        );

        tokio::task::spawn_blocking(move || -> DomainResult<usize> {
            let conn = db.get_connection()?;
            conn.execute(&sql, params![now, batch_size]).map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn count_expired(&self, now: i64) -> DomainResult<DryRunResult> {
        let db = Arc::clone(&self.db);
        let published_sql =
            format!("SELECT COUNT(*) FROM {} WHERE ExpiresAt < ?1", self.published_table);
        let received_sql =
            format!("SELECT COUNT(*) FROM {} WHERE ExpiresAt < ?1", self.received_table);

        tokio::task::spawn_blocking(move || -> DomainResult<DryRunResult> {
            let conn = db.get_connection()?;
            let published: i64 =
                conn.query_row(&published_sql, [now], |r| r.get(0)).map_err(map_sql_error)?;
            let received: i64 =
                conn.query_row(&received_sql, [now], |r| r.get(0)).map_err(map_sql_error)?;
            Ok(DryRunResult {
                published: usize::try_from(published).unwrap_or_default(),
                received: usize::try_from(received).unwrap_or_default(),
            })
        })
        .await
        .map_err(map_join_error)?
    }
}

/// Background sweeper for settled, expired messages
pub struct ExpiredMessageCollector {
    sweep: Sweep,
    config: CleanupConfig,
    cancellation_token: CancellationToken,
    task_handle: TaskHandle,
}

impl ExpiredMessageCollector {
    pub fn new(db: Arc<DbManager>, messaging: &MessagingConfig, config: CleanupConfig) -> Self {
        let sweep = Sweep {
            db,
            published_table: Arc::from(messaging.published_table()),
            received_table: Arc::from(messaging.received_table()),
            batch_size: i64::from(config.batch_size.max(1)),
            batch_pause: config.batch_pause(),
        };
        Self {
            sweep,
            config,
            cancellation_token: CancellationToken::new(),
            task_handle: Arc::new(Mutex::new(None)),
        }
    }

    /// Start the periodic sweep.
    ///
    /// A disabled collector logs and returns without spawning.
    ///
    /// # Errors
    ///
    /// Returns error if the collector is already running
    #[instrument(skip(self))]
    pub async fn start(&mut self) -> CommonResult<()> {
        if self.is_running().await {
            return Err(CommonError::config("Expired message collector already running"));
        }

        if !self.config.enabled {
            info!("Expired message collector disabled, not starting");
            return Ok(());
        }

        // Fresh token so the collector can restart after stop
        self.cancellation_token = CancellationToken::new();

        let sweep = self.sweep.clone();
        let idle_interval = self.config.idle_interval();
        let cancel = self.cancellation_token.clone();

        let handle = tokio::spawn(async move {
            Self::collect_loop(sweep, idle_interval, cancel).await;
        });

        *self.task_handle.lock().await = Some(handle);

        info!(
            batch_size = self.config.batch_size,
            idle_interval_secs = idle_interval.as_secs(),
            "Expired message collector started"
        );

        Ok(())
    }

    /// Cancel the background task and await it.
    ///
    /// # Errors
    ///
    /// Returns error if the collector is not running, the task panicked or
    /// it did not finish within five seconds
    #[instrument(skip(self))]
    pub async fn stop(&mut self) -> CommonResult<()> {
        if !self.is_running().await {
            return Err(CommonError::config("Expired message collector not running"));
        }

        self.cancellation_token.cancel();

        if let Some(handle) = self.task_handle.lock().await.take() {
            match tokio::time::timeout(STOP_TIMEOUT, handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    warn!("Collector task panicked: {}", e);
                    return Err(CommonError::internal(format!("Collector task panicked: {}", e)));
                }
                Err(_) => {
                    warn!("Collector task did not complete within timeout");
                    return Err(CommonError::timeout("expired_message_collector", STOP_TIMEOUT));
                }
            }
        }

        info!("Expired message collector stopped");

        Ok(())
    }

    pub async fn is_running(&self) -> bool {
        let guard = self.task_handle.lock().await;
        guard.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    /// Run one full sweep over both tables.
    ///
    /// # Errors
    ///
    /// `CleanupError::Stopped` when `cancel` fires between batches;
    /// `CleanupError::Storage` when a delete fails.
    #[instrument(skip(self, cancel))]
    pub async fn collect_once(
        &self,
        cancel: &CancellationToken,
    ) -> Result<CleanupStats, CleanupError> {
        let stats = self.sweep.run(cancel).await?;
        info!(
            published = stats.published_deleted,
            received = stats.received_deleted,
            duration_secs = stats.duration_secs,
            "Expired message sweep completed"
        );
        Ok(stats)
    }

    /// Count what a sweep would delete without deleting it.
    #[instrument(skip(self))]
    pub async fn dry_run(&self) -> DomainResult<DryRunResult> {
        self.sweep.count_expired(Utc::now().timestamp()).await
    }

    async fn collect_loop(sweep: Sweep, idle_interval: Duration, cancel: CancellationToken) {
        loop {
            match sweep.run(&cancel).await {
                Ok(stats) => {
                    info!(
                        published = stats.published_deleted,
                        received = stats.received_deleted,
                        duration_secs = stats.duration_secs,
                        "Periodic sweep completed"
                    );
                }
                Err(CleanupError::Stopped) => {
                    info!("Collector loop stopped");
                    break;
                }
                Err(e) => {
                    warn!(error = %e, "Periodic sweep failed");
                }
            }

            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Collector loop cancelled");
                    break;
                }
                _ = tokio::time::sleep(idle_interval) => {}
            }
        }
    }
}

impl Drop for ExpiredMessageCollector {
    fn drop(&mut self) {
        self.cancellation_token.cancel();
    }
}
