//! Inbound message persistence against `PostgreSQL`.

use std::sync::Arc;

use rstest::rstest;
use tasklink::clock::FixedClock;
use tasklink::integration::domain::IntegrationId;
use tasklink::message::{
    adapters::postgres::PostgresMessageRepository,
    domain::{InboundMessage, IntentType, NewInboundMessage, PlatformMessageId},
    ports::{InsertOutcome, MessageRepository},
};
use tasklink::task::domain::TaskId;

use crate::postgres::helpers::{TestDatabase, clock, database, noon, stored_integration};

fn message(integration_id: IntegrationId, platform_id: &str, clock: &FixedClock) -> InboundMessage {
    InboundMessage::new(
        NewInboundMessage {
            integration_id,
            platform_message_id: PlatformMessageId::new(platform_id).expect("valid id"),
            group_ref: Some("G-crew".to_owned()),
            sender_id: Some("U-aki".to_owned()),
            text: "タスク: 会場設営をする".to_owned(),
            sent_at: noon(),
        },
        clock,
    )
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn second_insert_returns_the_stored_message(
    database: Option<TestDatabase>,
    clock: Arc<FixedClock>,
) {
    let Some(db) = database else { return };
    let integration = stored_integration(&db, &clock).await.expect("integration stored");
    let repository = PostgresMessageRepository::new(db.pool.clone());
    let first = message(integration.id(), "468789577898262530", &clock);

    let inserted = repository.insert_new(&first).await.expect("insert succeeds");
    let replay = repository
        .insert_new(&message(integration.id(), "468789577898262530", &clock))
        .await
        .expect("insert succeeds");

    assert!(matches!(inserted, InsertOutcome::Inserted));
    assert!(matches!(replay, InsertOutcome::AlreadyExists(existing) if existing == first));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn processing_outcome_is_persisted(database: Option<TestDatabase>, clock: Arc<FixedClock>) {
    let Some(db) = database else { return };
    let integration = stored_integration(&db, &clock).await.expect("integration stored");
    let repository = PostgresMessageRepository::new(db.pool.clone());
    let mut stored = message(integration.id(), "m-1", &clock);
    repository.insert_new(&stored).await.expect("insert succeeds");

    stored.record_failure("connection reset");
    let task_id = TaskId::new();
    stored
        .record_outcome(IntentType::TaskCreation, Some(task_id))
        .expect("first outcome");
    repository.update(&stored).await.expect("update succeeds");

    let loaded = repository
        .find_by_id(stored.id())
        .await
        .expect("lookup succeeds")
        .expect("message stored");
    assert!(loaded.is_processed());
    assert_eq!(loaded.intent_type(), Some(IntentType::TaskCreation));
    assert_eq!(loaded.task_ref(), Some(task_id));
    assert_eq!(loaded.processing_attempts(), 1);
    assert_eq!(loaded.last_error(), None);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn failed_messages_are_listed_per_integration(
    database: Option<TestDatabase>,
    clock: Arc<FixedClock>,
) {
    let Some(db) = database else { return };
    let integration = stored_integration(&db, &clock).await.expect("integration stored");
    let other = stored_integration(&db, &clock).await.expect("integration stored");
    let repository = PostgresMessageRepository::new(db.pool.clone());

    let mut failed = message(integration.id(), "m-1", &clock);
    repository.insert_new(&failed).await.expect("insert succeeds");
    failed.record_failure("task store unavailable");
    failed.mark_permanently_failed();
    repository.update(&failed).await.expect("update succeeds");
    repository
        .insert_new(&message(integration.id(), "m-2", &clock))
        .await
        .expect("insert succeeds");
    let mut foreign = message(other.id(), "m-1", &clock);
    repository.insert_new(&foreign).await.expect("insert succeeds");
    foreign.mark_permanently_failed();
    repository.update(&foreign).await.expect("update succeeds");

    let listed = repository
        .list_failed(integration.id())
        .await
        .expect("list succeeds");

    assert_eq!(listed, vec![failed]);
}
