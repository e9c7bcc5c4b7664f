//! Delivery statistics and message listings over both message tables.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mailroom_core::{HourlyWindow, MonitoringApi};
use mailroom_domain::{
    MessageQuery, MessageStatus, MessageType, MessageView, MessagingConfig,
    Result as DomainResult, StatisticsSummary,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Row};
use tokio::task;
use tracing::{debug, instrument};

use super::dialect::{SqlDialect, SqliteDialect};
use super::manager::DbManager;
use super::message_repository::parse_status;
use crate::errors::conversions::map_sql_error;
use crate::errors::map_join_error;

/// SQLite implementation of [`MonitoringApi`]
#[derive(Debug, Clone)]
pub struct SqliteMonitoringApi {
    db: Arc<DbManager>,
    dialect: Arc<dyn SqlDialect>,
    published_table: Arc<str>,
    received_table: Arc<str>,
}

impl SqliteMonitoringApi {
    pub fn new(db: Arc<DbManager>, messaging: &MessagingConfig) -> Self {
        Self {
            db,
            dialect: Arc::new(SqliteDialect),
            published_table: Arc::from(messaging.published_table()),
            received_table: Arc::from(messaging.received_table()),
        }
    }

    fn table(&self, message_type: MessageType) -> Arc<str> {
        match message_type {
            MessageType::Publish => Arc::clone(&self.published_table),
            MessageType::Subscribe => Arc::clone(&self.received_table),
        }
    }

    async fn hourly(
        &self,
        message_type: MessageType,
        status: MessageStatus,
    ) -> DomainResult<BTreeMap<DateTime<Utc>, i64>> {
        let window = HourlyWindow::ending_at(Utc::now());
        let since = window.start_timestamp();
        let db = Arc::clone(&self.db);
        let sql = format!(
            "SELECT {bucket} AS Hour, COUNT(*) FROM {table} \
             WHERE lower(StatusName) = lower(?1) AND Added >= ?2 GROUP BY Hour",
            bucket = self.dialect.hour_bucket("Added"),
            table = self.table(message_type),
        );

        let counts = task::spawn_blocking(move || -> DomainResult<HashMap<String, i64>> {
            let conn = db.get_connection()?;
            let mut stmt = conn.prepare(&sql).map_err(map_sql_error)?;
            let rows = stmt
                .query_map(params![status.as_str(), since], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
                })
                .map_err(map_sql_error)?;
            rows.collect::<rusqlite::Result<HashMap<_, _>>>().map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)??;

        Ok(window.fill(&counts))
    }
}

#[async_trait]
impl MonitoringApi for SqliteMonitoringApi {
    #[instrument(skip(self))]
    async fn statistics(&self) -> DomainResult<StatisticsSummary> {
        let db = Arc::clone(&self.db);
        let sql = format!(
            "SELECT \
             (SELECT COUNT(*) FROM {p} WHERE StatusName = ?1), \
             (SELECT COUNT(*) FROM {r} WHERE StatusName = ?1), \
             (SELECT COUNT(*) FROM {p} WHERE StatusName = ?2), \
             (SELECT COUNT(*) FROM {r} WHERE StatusName = ?2)",
            p = self.published_table,
            r = self.received_table,
        );

        let summary = task::spawn_blocking(move || -> DomainResult<StatisticsSummary> {
            let conn = db.get_connection()?;
            conn.query_row(
                &sql,
                params![MessageStatus::Succeeded.as_str(), MessageStatus::Failed.as_str()],
                |row| {
                    Ok(StatisticsSummary {
                        published_succeeded: row.get(0)?,
                        received_succeeded: row.get(1)?,
                        published_failed: row.get(2)?,
                        received_failed: row.get(3)?,
                    })
                },
            )
            .map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)??;

        debug!(?summary, "statistics computed");
        Ok(summary)
    }

    async fn count_by_status(
        &self,
        message_type: MessageType,
        status_name: &str,
    ) -> DomainResult<i64> {
        let db = Arc::clone(&self.db);
        let sql = format!(
            "SELECT COUNT(*) FROM {} WHERE lower(StatusName) = lower(?1)",
            self.table(message_type)
        );
        let status_name = status_name.to_owned();

        task::spawn_blocking(move || -> DomainResult<i64> {
            let conn = db.get_connection()?;
            conn.query_row(&sql, [status_name], |row| row.get(0)).map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn hourly_succeeded(
        &self,
        message_type: MessageType,
    ) -> DomainResult<BTreeMap<DateTime<Utc>, i64>> {
        self.hourly(message_type, MessageStatus::Succeeded).await
    }

    async fn hourly_failed(
        &self,
        message_type: MessageType,
    ) -> DomainResult<BTreeMap<DateTime<Utc>, i64>> {
        self.hourly(message_type, MessageStatus::Failed).await
    }

    #[instrument(skip(self, query), fields(message_type = ?query.message_type, page = query.page))]
    async fn messages(&self, query: &MessageQuery) -> DomainResult<Vec<MessageView>> {
        let db = Arc::clone(&self.db);
        let (sql, values) = listing_sql(&self.table(query.message_type), query);

        let views = task::spawn_blocking(move || -> DomainResult<Vec<MessageView>> {
            let conn = db.get_connection()?;
            let mut stmt = conn.prepare(&sql).map_err(map_sql_error)?;
            let rows =
                stmt.query_map(params_from_iter(values), map_view_row).map_err(map_sql_error)?;
            rows.collect::<rusqlite::Result<Vec<_>>>().map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)??;

        debug!(returned = views.len(), "message page loaded");
        Ok(views)
    }
}

/// Build the filtered page query and its positional values.
fn listing_sql(table: &str, query: &MessageQuery) -> (String, Vec<Value>) {
    let group_column = match query.message_type {
        MessageType::Publish => "NULL",
        MessageType::Subscribe => "\"Group\"",
    };

    let mut conditions = Vec::new();
    let mut values = Vec::new();

    if let Some(status) = non_empty(query.status_name.as_deref()) {
        conditions.push("lower(StatusName) = lower(?)");
        values.push(Value::Text(status.to_owned()));
    }
    if let Some(name) = non_empty(query.name.as_deref()) {
        conditions.push("Name = ?");
        values.push(Value::Text(name.to_owned()));
    }
    if let (MessageType::Subscribe, Some(group)) = (query.message_type, non_empty(query.group.as_deref())) {
        conditions.push("\"Group\" = ?");
        values.push(Value::Text(group.to_owned()));
    }
    if let Some(fragment) = non_empty(query.content.as_deref()) {
        conditions.push("instr(Content, ?) > 0");
        values.push(Value::Text(fragment.to_owned()));
    }

    let filter = if conditions.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", conditions.join(" AND "))
    };

    values.push(Value::Integer(i64::from(query.page_size)));
    values.push(Value::Integer(query.offset()));

    let sql = format!(
        "SELECT Id, Version, {group_column}, Name, Content, Added, ExpiresAt, Retries, StatusName \
         FROM {table}{filter} ORDER BY Added DESC, Id DESC LIMIT ? OFFSET ?"
    );
    (sql, values)
}

/// Blank filter values count as absent.
fn non_empty(filter: Option<&str>) -> Option<&str> {
    filter.filter(|value| !value.is_empty())
}

fn map_view_row(row: &Row<'_>) -> rusqlite::Result<MessageView> {
    let id: i64 = row.get(0)?;
    let status_raw: String = row.get(8)?;
    Ok(MessageView {
        id,
        version: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
        group: row.get(2)?,
        name: row.get(3)?,
        content: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
        added: row.get(5)?,
        expires_at: row.get(6)?,
        retries: row.get(7)?,
        status_name: parse_status(id, &status_raw),
    })
}
