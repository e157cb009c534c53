//! Spawned workers racing over redelivered webhooks.

use std::time::Duration;

use crate::in_memory::helpers::{App, app};
use rstest::rstest;
use tasklink::queue::domain::JobStatus;
use tokio::sync::watch;

async fn wait_until_settled(app: &App) {
    let settled = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let statuses = app.job_statuses().expect("queue readable");
            if statuses
                .iter()
                .all(|status| matches!(status, JobStatus::Done | JobStatus::Failed))
            {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    assert!(settled.is_ok(), "jobs did not settle in time");
}

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_workers_create_one_task_per_message(#[future(awt)] app: App) {
    for _ in 0..2 {
        app.say("m-setup", "タスク: 会場設営をする")
            .await
            .expect("webhook served");
        app.say("m-sound", "タスク: 音響チェック")
            .await
            .expect("webhook served");
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = app.workers.spawn(&shutdown_rx);
    wait_until_settled(&app).await;
    shutdown_tx.send_replace(true);
    handle.join().await;

    let mut titles: Vec<String> = app
        .all_tasks()
        .expect("tasks readable")
        .iter()
        .map(|task| task.title().as_str().to_owned())
        .collect();
    titles.sort();
    assert_eq!(titles, vec!["会場設営をする".to_owned(), "音響チェック".to_owned()]);
    assert_eq!(app.messages.len().expect("messages readable"), 2);
    assert_eq!(app.sent_texts().expect("platform readable").len(), 2);
    assert!(
        app.job_statuses()
            .expect("queue readable")
            .iter()
            .all(|status| *status == JobStatus::Done)
    );
}
