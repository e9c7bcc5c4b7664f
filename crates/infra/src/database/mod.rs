//! Database implementations

pub mod dialect;
pub mod manager;
pub mod message_repository;
pub mod monitoring_repository;
pub mod outbox_publisher;
pub mod schema;
pub mod transaction;

pub use dialect::{SqlDialect, SqliteDialect};
pub use manager::DbManager;
pub use message_repository::SqliteMessageStore;
pub use monitoring_repository::SqliteMonitoringApi;
pub use outbox_publisher::OutboxPublisher;
pub use schema::SchemaInitializer;
pub use transaction::{AmbientTransaction, StorageTransaction, UnitOfWork};
