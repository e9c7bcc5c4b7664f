//! Message store round trips, state transitions and explicit transactions.

#![allow(dead_code)]

#[path = "support.rs"]
mod support;

use chrono::Utc;
use mailroom_core::MessageStore;
use mailroom_domain::{MailroomError, MessageStatus, PublishedMessage};
use mailroom_infra::database::{SqliteMessageStore, UnitOfWork};
use tracing::Level;

#[tokio::test(flavor = "multi_thread")]
async fn inserted_published_message_reads_back_with_running_version() {
    let db = support::TestDatabase::new().await;
    let store = SqliteMessageStore::new(db.manager.clone(), &db.messaging);
    let now = Utc::now().timestamp();

    let mut message = support::published(1, MessageStatus::Scheduled, now).with_expires_at(Some(now + 60));
    message.version = "caller-supplied".into();
    store.insert_published(&message).await.expect("insert should succeed");

    let loaded = store.get_published(1).await.expect("lookup should succeed").expect("row exists");
    assert_eq!(loaded.version, "v1");
    assert_eq!(PublishedMessage { version: "caller-supplied".into(), ..loaded }, message);
}

#[tokio::test(flavor = "multi_thread")]
async fn inserted_received_message_keeps_group() {
    let db = support::TestDatabase::new().await;
    let store = SqliteMessageStore::new(db.manager.clone(), &db.messaging);

    let message = support::received(9, MessageStatus::Failed, Utc::now().timestamp());
    store.insert_received(&message).await.expect("insert should succeed");

    let loaded = store.get_received(9).await.expect("lookup should succeed").expect("row exists");
    assert_eq!(loaded.group, "billing");
    assert_eq!(loaded.status_name, MessageStatus::Failed);
    assert_eq!(loaded.version, "v1");
}

#[tokio::test(flavor = "multi_thread")]
async fn absent_ids_return_none() {
    let db = support::TestDatabase::new().await;
    let store = SqliteMessageStore::new(db.manager.clone(), &db.messaging);

    assert!(store.get_published(404).await.expect("lookup").is_none());
    assert!(store.get_received(404).await.expect("lookup").is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn duplicate_id_is_a_database_error() {
    let db = support::TestDatabase::new().await;
    let store = SqliteMessageStore::new(db.manager.clone(), &db.messaging);
    let message = support::published(3, MessageStatus::Scheduled, Utc::now().timestamp());

    store.insert_published(&message).await.expect("first insert");
    let err = store.insert_published(&message).await.expect_err("duplicate must fail");

    assert_eq!(err, MailroomError::Database("unique constraint violation".into()));
}

#[tokio::test(flavor = "multi_thread")]
async fn unnamed_message_is_rejected() {
    let db = support::TestDatabase::new().await;
    let store = SqliteMessageStore::new(db.manager.clone(), &db.messaging);
    let message = PublishedMessage::new(4, "", "{}");

    let err = store.insert_published(&message).await.expect_err("blank name must fail");
    assert!(matches!(err, MailroomError::InvalidInput(_)));
    assert_eq!(db.scalar("SELECT COUNT(*) FROM cap_published"), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn change_state_increments_retries_and_clears_expiry() {
    let db = support::TestDatabase::new().await;
    let store = SqliteMessageStore::new(db.manager.clone(), &db.messaging);
    let now = Utc::now().timestamp();
    let message = support::published(5, MessageStatus::Scheduled, now).with_expires_at(Some(now + 600));
    store.insert_published(&message).await.expect("insert");

    assert!(store.change_published_state(5, MessageStatus::Failed).await.expect("change state"));
    assert!(store.change_published_state(5, MessageStatus::Succeeded).await.expect("change state"));

    let loaded = store.get_published(5).await.expect("lookup").expect("row exists");
    assert_eq!(loaded.retries, 2);
    assert_eq!(loaded.expires_at, None);
    assert_eq!(loaded.status_name, MessageStatus::Succeeded);
}

#[tokio::test]
async fn change_state_on_missing_id_returns_false_and_warns() {
    let db = support::TestDatabase::new().await;
    let store = SqliteMessageStore::new(db.manager.clone(), &db.messaging);
    let (logs, _guard) = support::capture_logs();

    let changed = store.change_received_state(77, MessageStatus::Failed).await.expect("no error");

    assert!(!changed);
    assert!(logs.count(Level::WARN) >= 1, "missing row should warn: {:?}", logs.entries());
}

#[tokio::test(flavor = "multi_thread")]
async fn unknown_status_text_reads_as_scheduled() {
    let db = support::TestDatabase::new().await;
    let store = SqliteMessageStore::new(db.manager.clone(), &db.messaging);
    store
        .insert_published(&support::published(6, MessageStatus::Failed, Utc::now().timestamp()))
        .await
        .expect("insert");

    db.execute_batch("UPDATE cap_published SET StatusName = 'Delayed' WHERE Id = 6");
    let loaded = store.get_published(6).await.expect("lookup").expect("row exists");
    assert_eq!(loaded.status_name, MessageStatus::Scheduled);

    db.execute_batch("UPDATE cap_published SET StatusName = 'FAILED' WHERE Id = 6");
    let loaded = store.get_published(6).await.expect("lookup").expect("row exists");
    assert_eq!(loaded.status_name, MessageStatus::Failed);
}

#[tokio::test(flavor = "multi_thread")]
async fn update_full_is_visible_only_after_commit() {
    let db = support::TestDatabase::new().await;
    let store = SqliteMessageStore::new(db.manager.clone(), &db.messaging);
    let now = Utc::now().timestamp();
    store.insert_published(&support::published(7, MessageStatus::Scheduled, now)).await.expect("insert");

    let mut updated = store.get_published(7).await.expect("lookup").expect("row exists");
    updated.retries = 4;
    updated.content = "{\"order\":7,\"patched\":true}".into();
    updated.expires_at = Some(now + 3600);
    updated.status_name = MessageStatus::Succeeded;

    let tx = store.create_transaction().await.expect("begin");
    assert!(tx.update_published(&updated).await.expect("update"));
    tx.commit().await.expect("commit");

    let loaded = store.get_published(7).await.expect("lookup").expect("row exists");
    assert_eq!(loaded, updated);
}

#[tokio::test(flavor = "multi_thread")]
async fn dropped_transaction_discards_update() {
    let db = support::TestDatabase::new().await;
    let store = SqliteMessageStore::new(db.manager.clone(), &db.messaging);
    store
        .insert_received(&support::received(8, MessageStatus::Scheduled, Utc::now().timestamp()))
        .await
        .expect("insert");

    let mut updated = store.get_received(8).await.expect("lookup").expect("row exists");
    updated.status_name = MessageStatus::Failed;
    updated.retries = 9;

    {
        let tx = store.create_transaction().await.expect("begin");
        assert!(tx.update_received(&updated).await.expect("update"));
    }

    let loaded = store.get_received(8).await.expect("lookup").expect("row exists");
    assert_eq!(loaded.status_name, MessageStatus::Scheduled);
    assert_eq!(loaded.retries, 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn update_rejects_unset_message_and_reports_missing_rows() {
    let db = support::TestDatabase::new().await;
    let store = SqliteMessageStore::new(db.manager.clone(), &db.messaging);
    let tx = store.create_transaction().await.expect("begin");

    let err = tx
        .update_published(&PublishedMessage::new(1, "", "{}"))
        .await
        .expect_err("unset message must be rejected");
    assert!(matches!(err, MailroomError::InvalidInput(_)));

    let missing = support::published(999, MessageStatus::Failed, 0);
    assert!(!tx.update_published(&missing).await.expect("update runs"));
}

#[tokio::test(flavor = "multi_thread")]
async fn received_insert_joins_unit_of_work() {
    let db = support::TestDatabase::new().await;
    let store = SqliteMessageStore::new(db.manager.clone(), &db.messaging);
    let now = Utc::now().timestamp();

    let unit = UnitOfWork::begin(&db.manager).expect("begin");
    store.insert_received_within(&unit, &support::received(10, MessageStatus::Scheduled, now)).expect("insert");
    let pending = store.get_received_within(&unit, 10).expect("lookup").expect("visible before rollback");
    assert_eq!(pending.group, "billing");
    assert_eq!(pending.added, now);
    drop(unit);
    assert!(store.get_received(10).await.expect("lookup").is_none());

    let unit = UnitOfWork::begin(&db.manager).expect("begin");
    store.insert_received_within(&unit, &support::received(11, MessageStatus::Scheduled, now)).expect("insert");
    unit.commit().expect("commit");
    assert!(store.get_received(11).await.expect("lookup").is_some());
}
