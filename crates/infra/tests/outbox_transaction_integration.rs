//! The outbox row commits or rolls back with the caller's business change.

#![allow(dead_code)]

#[path = "support.rs"]
mod support;

use chrono::Utc;
use mailroom_core::{MessageStore, OutboxWriter};
use mailroom_domain::{MailroomError, MessageStatus};
use mailroom_infra::database::{AmbientTransaction, OutboxPublisher, SqliteMessageStore};

const ORDERS_DDL: &str = "CREATE TABLE orders (id INTEGER PRIMARY KEY, total INTEGER NOT NULL)";

#[tokio::test(flavor = "multi_thread")]
async fn rolled_back_business_change_discards_outbox_row() {
    let db = support::TestDatabase::new().await;
    db.execute_batch(ORDERS_DDL);
    let store = SqliteMessageStore::new(db.manager.clone(), &db.messaging);
    let publisher = OutboxPublisher::new(db.manager.clone(), &db.messaging);
    let message = support::published(1, MessageStatus::Scheduled, Utc::now().timestamp());

    {
        let tx = store.create_transaction().await.expect("begin");
        let writer = publisher.clone();
        tx.with_ambient(move |ambient| {
            ambient
                .connection()
                .execute("INSERT INTO orders (id, total) VALUES (1, 100)", [])
                .map_err(|e| MailroomError::Database(e.to_string()))?;
            writer.publish_within(ambient, &message)
        })
        .await
        .expect("business change and outbox write");
        // dropped without commit
    }

    assert_eq!(db.scalar("SELECT COUNT(*) FROM orders"), 0);
    assert!(store.get_published(1).await.expect("lookup").is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn uncommitted_outbox_row_is_readable_inside_its_transaction() {
    let db = support::TestDatabase::new().await;
    let store = SqliteMessageStore::new(db.manager.clone(), &db.messaging);
    let publisher = OutboxPublisher::new(db.manager.clone(), &db.messaging);
    let message = support::published(5, MessageStatus::Scheduled, Utc::now().timestamp());

    {
        let tx = store.create_transaction().await.expect("begin");
        let writer = publisher.clone();
        let reader = store.clone();
        let enlisted = message.clone();
        let seen = tx
            .with_ambient(move |ambient| {
                writer.publish_within(ambient, &enlisted)?;
                reader.get_published_within(ambient, enlisted.id)
            })
            .await
            .expect("write then read")
            .expect("row visible to its own transaction");

        assert_eq!(seen.name, message.name);
        assert_eq!(seen.content, message.content);
        assert_eq!(seen.added, message.added);
        assert_eq!(seen.status_name, MessageStatus::Scheduled);
        assert_eq!(seen.version, "v1");
    }

    assert!(store.get_published(5).await.expect("lookup").is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn committed_business_change_keeps_outbox_row() {
    let db = support::TestDatabase::new().await;
    db.execute_batch(ORDERS_DDL);
    let store = SqliteMessageStore::new(db.manager.clone(), &db.messaging);
    let publisher = OutboxPublisher::new(db.manager.clone(), &db.messaging);
    let message = support::published(2, MessageStatus::Scheduled, Utc::now().timestamp());

    let tx = store.create_transaction().await.expect("begin");
    let writer = publisher.clone();
    let enlisted = message.clone();
    tx.with_ambient(move |ambient| {
        ambient
            .connection()
            .execute("INSERT INTO orders (id, total) VALUES (2, 250)", [])
            .map_err(|e| MailroomError::Database(e.to_string()))?;
        writer.publish_within(ambient, &enlisted)
    })
    .await
    .expect("business change and outbox write");
    tx.commit().await.expect("commit");

    assert_eq!(db.scalar("SELECT COUNT(*) FROM orders"), 1);
    let stored = store.get_published(2).await.expect("lookup").expect("row exists");
    assert_eq!(stored.name, message.name);
    assert_eq!(stored.version, "v1");
}

#[tokio::test(flavor = "multi_thread")]
async fn rusqlite_transaction_can_carry_the_outbox_write() {
    let db = support::TestDatabase::new().await;
    let publisher = OutboxPublisher::new(db.manager.clone(), &db.messaging);
    let now = Utc::now().timestamp();

    let mut conn = db.manager.get_connection().expect("connection");
    let tx = conn.transaction().expect("begin");
    publisher.publish_within(&tx, &support::published(3, MessageStatus::Scheduled, now)).expect("enlist");
    tx.rollback().expect("rollback");

    let tx = conn.transaction().expect("begin");
    publisher.publish_within(&tx, &support::published(4, MessageStatus::Scheduled, now)).expect("enlist");
    tx.commit().expect("commit");
    drop(conn);

    assert_eq!(db.scalar("SELECT COUNT(*) FROM cap_published WHERE Id = 3"), 0);
    assert_eq!(db.scalar("SELECT COUNT(*) FROM cap_published WHERE Id = 4"), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn publish_without_transaction_commits_immediately() {
    let db = support::TestDatabase::new().await;
    let publisher = OutboxPublisher::new(db.manager.clone(), &db.messaging);

    publisher
        .publish(&support::published(5, MessageStatus::Scheduled, Utc::now().timestamp()))
        .await
        .expect("publish");

    assert_eq!(db.scalar("SELECT COUNT(*) FROM cap_published WHERE Id = 5"), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn duplicate_publish_fails_without_touching_the_first_row() {
    let db = support::TestDatabase::new().await;
    let publisher = OutboxPublisher::new(db.manager.clone(), &db.messaging);
    let message = support::published(6, MessageStatus::Scheduled, Utc::now().timestamp());

    publisher.publish(&message).await.expect("first publish");
    let err = publisher.publish(&message).await.expect_err("duplicate must fail");

    assert!(matches!(err, MailroomError::Database(_)));
    assert_eq!(db.scalar("SELECT COUNT(*) FROM cap_published"), 1);
}
