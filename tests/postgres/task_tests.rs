//! Task persistence against `PostgreSQL`.

use std::sync::Arc;

use chrono::Duration;
use mockable::Clock;
use rstest::rstest;
use tasklink::clock::FixedClock;
use tasklink::message::domain::MessageId;
use tasklink::task::{
    adapters::postgres::PostgresTaskRepository,
    domain::{FestivalId, NewTask, Task, TaskTitle},
    ports::{TaskRepository, TaskRepositoryError},
};

use crate::postgres::helpers::{TestDatabase, clock, database};

fn chat_task(scope: FestivalId, title: &str, origin: MessageId, clock: &FixedClock) -> Task {
    Task::new(
        NewTask::new(scope, TaskTitle::new(title).expect("valid title")).with_origin_message(origin),
        clock,
    )
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn open_tasks_are_listed_newest_first(database: Option<TestDatabase>, clock: Arc<FixedClock>) {
    let Some(db) = database else { return };
    let repository = PostgresTaskRepository::new(db.pool.clone());
    let scope = FestivalId::new();

    let older = chat_task(scope, "会場設営をする", MessageId::new(), &clock);
    repository.store(&older).await.expect("stored");
    clock.advance(Duration::minutes(5));
    let newer = chat_task(scope, "音響チェック", MessageId::new(), &clock);
    repository.store(&newer).await.expect("stored");
    clock.advance(Duration::minutes(5));
    let mut done = chat_task(scope, "チラシ印刷", MessageId::new(), &clock);
    repository.store(&done).await.expect("stored");
    done.complete(&*clock).expect("completable");
    repository.update(&done).await.expect("updated");
    repository
        .store(&chat_task(FestivalId::new(), "別の祭り", MessageId::new(), &clock))
        .await
        .expect("stored");

    let open = repository
        .find_open_by_scope(scope)
        .await
        .expect("list succeeds");

    assert_eq!(open, vec![newer, older]);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn task_is_found_by_any_linked_message(database: Option<TestDatabase>, clock: Arc<FixedClock>) {
    let Some(db) = database else { return };
    let repository = PostgresTaskRepository::new(db.pool.clone());
    let origin = MessageId::new();
    let completing = MessageId::new();
    let mut task = chat_task(FestivalId::new(), "音響チェック", origin, &clock);
    repository.store(&task).await.expect("stored");

    clock.advance(Duration::hours(1));
    task.complete(&*clock).expect("completable");
    task.link_message(completing, &*clock);
    repository.update(&task).await.expect("updated");

    for message_id in [origin, completing] {
        let found = repository
            .find_by_source_message(message_id)
            .await
            .expect("lookup succeeds");
        assert_eq!(found.as_ref(), Some(&task));
    }
    assert_eq!(task.completed_at(), Some(clock.utc()));
    assert!(
        repository
            .find_by_source_message(MessageId::new())
            .await
            .expect("lookup succeeds")
            .is_none()
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn origin_message_creates_at_most_one_task(
    database: Option<TestDatabase>,
    clock: Arc<FixedClock>,
) {
    let Some(db) = database else { return };
    let repository = PostgresTaskRepository::new(db.pool.clone());
    let scope = FestivalId::new();
    let origin = MessageId::new();
    repository
        .store(&chat_task(scope, "会場設営をする", origin, &clock))
        .await
        .expect("stored");

    let duplicate = chat_task(scope, "会場設営をする", origin, &clock);
    let result = repository.store(&duplicate).await;

    assert!(matches!(
        result,
        Err(TaskRepositoryError::DuplicateTask(id)) if id == duplicate.id()
    ));
}
