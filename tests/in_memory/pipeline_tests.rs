//! Chat messages flowing from the webhook to tasks and group replies.

use crate::in_memory::helpers::{App, GROUP_ID, app, join_envelope};
use axum::http::StatusCode;
use mockable::Clock;
use rstest::rstest;
use tasklink::integration::ports::GroupRepository;
use tasklink::message::{
    domain::{IntentType, PlatformMessageId},
    ports::MessageRepository,
};
use tasklink::queue::domain::JobStatus;
use tasklink::task::domain::TaskStatus;

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn creation_message_becomes_task_and_confirmation(#[future(awt)] app: App) {
    let status = app
        .say("468789577898262530", "タスク: 会場設営をする")
        .await
        .expect("webhook served");
    assert_eq!(status, StatusCode::OK);

    let handled = app.drain().await.expect("queue drained");
    assert_eq!(handled, 2, "message job then notification job");

    let tasks = app.all_tasks().expect("tasks readable");
    assert_eq!(tasks.len(), 1);
    let task = tasks.first().expect("one task");
    assert_eq!(task.title().as_str(), "会場設営をする");
    assert_eq!(task.status(), TaskStatus::Pending);
    assert!(task.created_via_messaging());
    assert_eq!(task.scope(), app.integration.scope());

    let sent = app.platform.sent().expect("platform readable");
    assert_eq!(sent.len(), 1);
    let reply = sent.first().expect("one reply");
    assert_eq!(reply.to, GROUP_ID);
    assert_eq!(reply.text, "📝 タスクを登録しました: 会場設営をする");
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn completion_message_completes_open_task(#[future(awt)] app: App) {
    app.say("m-1", "タスク: 音響チェック").await.expect("webhook served");
    app.drain().await.expect("queue drained");

    app.say("m-2", "音響チェック完了しました")
        .await
        .expect("webhook served");
    app.drain().await.expect("queue drained");

    let tasks = app.all_tasks().expect("tasks readable");
    let task = tasks.first().expect("one task");
    assert_eq!(tasks.len(), 1);
    assert_eq!(task.status(), TaskStatus::Completed);
    assert_eq!(task.completed_at(), Some(app.clock.utc()));
    assert_eq!(task.source_messages().len(), 2);

    let completing = app
        .messages
        .find_by_platform_id(
            app.integration.id(),
            &PlatformMessageId::new("m-2").expect("valid id"),
        )
        .await
        .expect("lookup succeeds")
        .expect("message stored");
    assert!(completing.is_processed());
    assert_eq!(completing.intent_type(), Some(IntentType::TaskCompletion));
    assert_eq!(completing.task_ref(), Some(task.id()));

    assert_eq!(
        app.sent_texts().expect("platform readable"),
        vec![
            "📝 タスクを登録しました: 音響チェック".to_owned(),
            "✅ タスクが完了しました: 音響チェック".to_owned(),
        ]
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn completion_without_matching_task_changes_nothing(#[future(awt)] app: App) {
    app.say("m-1", "タスク: 音響チェック").await.expect("webhook served");
    app.say("m-2", "照明の準備終わった").await.expect("webhook served");
    app.drain().await.expect("queue drained");

    let tasks = app.all_tasks().expect("tasks readable");
    assert_eq!(tasks.len(), 1);
    assert!(tasks.iter().all(|task| task.status() == TaskStatus::Pending));
    assert_eq!(app.sent_texts().expect("platform readable").len(), 1);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn chatter_is_stored_without_side_effects(#[future(awt)] app: App) {
    app.say("m-1", "おはようございます").await.expect("webhook served");
    app.drain().await.expect("queue drained");

    assert!(app.all_tasks().expect("tasks readable").is_empty());
    assert!(app.sent_texts().expect("platform readable").is_empty());
    assert_eq!(app.messages.len().expect("messages readable"), 1);
    assert!(
        app.job_statuses()
            .expect("queue readable")
            .iter()
            .all(|status| *status == JobStatus::Done)
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn replayed_webhook_creates_one_task(#[future(awt)] app: App) {
    for _ in 0..3 {
        let status = app
            .say("468789577898262530", "タスク: 会場設営をする")
            .await
            .expect("webhook served");
        assert_eq!(status, StatusCode::OK);
    }
    app.drain().await.expect("queue drained");

    assert_eq!(app.all_tasks().expect("tasks readable").len(), 1);
    assert_eq!(app.messages.len().expect("messages readable"), 1);
    assert_eq!(app.sent_texts().expect("platform readable").len(), 1);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn message_activity_is_recorded_on_the_group(#[future(awt)] app: App) {
    app.platform
        .add_group(GROUP_ID, "実行委員会", 12)
        .expect("group registered");
    app.post_signed(&join_envelope(app.clock.utc()))
        .await
        .expect("webhook served");
    app.say("m-1", "おはようございます").await.expect("webhook served");
    app.drain().await.expect("queue drained");

    let group = app
        .groups
        .find_by_platform_id(app.integration.id(), GROUP_ID)
        .await
        .expect("lookup succeeds")
        .expect("group registered");
    assert!(group.is_active());
    assert_eq!(group.display_name(), Some("実行委員会"));
    assert_eq!(group.member_count(), 12);
    assert_eq!(group.last_activity_at(), Some(app.clock.utc()));
}
