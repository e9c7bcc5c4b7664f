//! Shared helpers for infra integration tests.

use std::sync::{Arc, Mutex, OnceLock};

use mailroom_domain::{MessageStatus, MessagingConfig, PublishedMessage, ReceivedMessage};
use mailroom_infra::database::{DbManager, SchemaInitializer};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::Layer;

type LogRecord = (Level, String);
type LogBuffer = Vec<LogRecord>;

/// Temporary database wrapper that keeps the underlying file alive for the
/// duration of a test run.
pub struct TestDatabase {
    pub manager: Arc<DbManager>,
    pub messaging: MessagingConfig,
    _temp_dir: TempDir,
}

impl TestDatabase {
    /// Create a new temporary database with the message schema in place.
    pub async fn new() -> Self {
        Self::with_messaging(MessagingConfig::default()).await
    }

    pub async fn with_messaging(messaging: MessagingConfig) -> Self {
        init_tracing();
        let temp_dir = TempDir::new().expect("temp dir should be created");
        let db_path = temp_dir.path().join("test.db");

        let manager = Arc::new(DbManager::new(&db_path, 4, None).expect("db manager should be created"));
        SchemaInitializer::new(Arc::clone(&manager), &messaging)
            .initialize(&CancellationToken::new())
            .await
            .expect("schema should initialize");

        Self { manager, messaging, _temp_dir: temp_dir }
    }

    /// Execute a batch of SQL statements against the database.
    pub fn execute_batch(&self, sql: &str) {
        let conn = self
            .manager
            .get_connection()
            .expect("connection should be available for execute_batch");
        conn.execute_batch(sql).expect("SQL batch execution should succeed");
    }

    /// Single integer result of `sql`.
    pub fn scalar(&self, sql: &str) -> i64 {
        let conn = self.manager.get_connection().expect("connection should be available");
        conn.query_row(sql, [], |row| row.get(0)).expect("scalar query should succeed")
    }
}

pub fn published(id: i64, status: MessageStatus, added: i64) -> PublishedMessage {
    PublishedMessage::new(id, "orders.created", format!("{{\"order\":{id}}}"))
        .with_status(status)
        .with_added(added)
}

pub fn received(id: i64, status: MessageStatus, added: i64) -> ReceivedMessage {
    ReceivedMessage::new(id, "billing", "orders.created", format!("{{\"order\":{id}}}"))
        .with_status(status)
        .with_added(added)
}

/// Captures events emitted while the returned guard's subscriber is active.
#[derive(Clone, Default)]
pub struct LogHandle {
    records: Arc<Mutex<LogBuffer>>,
}

impl LogHandle {
    pub fn entries(&self) -> LogBuffer {
        self.records.lock().expect("log buffer lock").clone()
    }

    pub fn count(&self, level: Level) -> usize {
        self.entries().iter().filter(|(l, _)| *l == level).count()
    }
}

struct CaptureLayer {
    records: Arc<Mutex<LogBuffer>>,
}

struct MessageVisitor(String);

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.0 = format!("{value:?}");
        }
    }
}

impl<S: Subscriber> Layer<S> for CaptureLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = MessageVisitor(String::new());
        event.record(&mut visitor);
        if let Ok(mut records) = self.records.lock() {
            records.push((*event.metadata().level(), visitor.0));
        }
    }
}

/// Install a capturing subscriber for the current thread.
///
/// Use with `#[tokio::test]` (current-thread runtime) so events from the
/// test body land on the same thread. Events from `spawn_blocking` workers
/// are not captured.
pub fn capture_logs() -> (LogHandle, tracing::subscriber::DefaultGuard) {
    let handle = LogHandle::default();
    let subscriber =
        tracing_subscriber::registry().with(CaptureLayer { records: Arc::clone(&handle.records) });
    let guard = tracing::subscriber::set_default(subscriber);
    (handle, guard)
}

/// Route test logs to stderr once per process, honouring `RUST_LOG`.
pub fn init_tracing() {
    static INIT: OnceLock<()> = OnceLock::new();
    INIT.get_or_init(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}
