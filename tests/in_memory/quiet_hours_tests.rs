//! Quiet hours hold back routine replies but never deadline reminders.

use crate::in_memory::helpers::{App, GROUP_ID, join_envelope, tokyo_late_evening};
use chrono::{Duration, NaiveTime};
use mockable::Clock;
use rstest::{fixture, rstest};
use tasklink::integration::domain::NotificationPreferences;
use tasklink::queue::domain::JobStatus;
use tasklink::task::services::CreateTaskRequest;

fn quiet_window() -> NotificationPreferences {
    NotificationPreferences::default().with_quiet_hours(
        NaiveTime::from_hms_opt(22, 0, 0).unwrap_or(NaiveTime::MIN),
        NaiveTime::from_hms_opt(8, 0, 0).unwrap_or(NaiveTime::MIN),
    )
}

#[fixture]
async fn late_app() -> App {
    let mut app = App::start(tokyo_late_evening())
        .await
        .expect("application starts");
    app.set_preferences(quiet_window())
        .await
        .expect("preferences stored");
    app.platform
        .add_group(GROUP_ID, "実行委員会", 12)
        .expect("group registered");
    app.post_signed(&join_envelope(app.clock.utc()))
        .await
        .expect("webhook served");
    app.drain().await.expect("queue drained");
    app
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn task_is_created_silently_during_quiet_hours(#[future(awt)] late_app: App) {
    late_app
        .say("m-1", "タスク: 後片付け")
        .await
        .expect("webhook served");
    late_app.drain().await.expect("queue drained");

    assert_eq!(late_app.all_tasks().expect("tasks readable").len(), 1);
    assert!(late_app.sent_texts().expect("platform readable").is_empty());
    assert!(
        late_app
            .job_statuses()
            .expect("queue readable")
            .iter()
            .all(|status| *status == JobStatus::Done)
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn replies_resume_when_quiet_hours_are_off(#[future(awt)] late_app: App) {
    let mut app = late_app;
    app.set_preferences(NotificationPreferences::default())
        .await
        .expect("preferences stored");

    app.say("m-1", "タスク: 後片付け").await.expect("webhook served");
    app.drain().await.expect("queue drained");

    assert_eq!(
        app.sent_texts().expect("platform readable"),
        vec!["📝 タスクを登録しました: 後片付け".to_owned()]
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn deadline_reminder_breaks_through_quiet_hours(#[future(awt)] late_app: App) {
    let due_at = late_app.clock.utc() + Duration::minutes(45);
    late_app
        .tasks
        .create_task(
            CreateTaskRequest::new(late_app.integration.scope(), "備品返却").with_due_at(due_at),
        )
        .await
        .expect("task created");
    late_app
        .tasks
        .create_task(
            CreateTaskRequest::new(late_app.integration.scope(), "打ち上げ予約")
                .with_due_at(late_app.clock.utc() + Duration::days(2)),
        )
        .await
        .expect("task created");

    let enqueued = late_app
        .reminders
        .enqueue_due_reminders(&late_app.integration, Duration::hours(1))
        .await
        .expect("reminders enqueued");
    late_app.drain().await.expect("queue drained");

    assert_eq!(enqueued, 1);
    let sent = late_app.platform.sent().expect("platform readable");
    assert_eq!(sent.len(), 1);
    let reminder = sent.first().expect("one reminder");
    assert_eq!(reminder.to, GROUP_ID);
    assert_eq!(
        reminder.text,
        "⏰ 期限が近づいています: 備品返却（07/10 23:45 まで）"
    );
}
