//! Leased job queue against `PostgreSQL`.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::Duration;
use rstest::rstest;
use tasklink::clock::FixedClock;
use tasklink::integration::domain::IntegrationId;
use tasklink::notification::domain::{NotificationEvent, NotificationTarget, OutboundNotification};
use tasklink::queue::{
    adapters::postgres::PostgresJobQueue,
    domain::{BackoffPolicy, FailureDisposition, Job, JobStatus, QueueSettings},
    ports::JobQueue,
};
use tasklink::task::domain::TaskId;

use crate::postgres::helpers::{TestDatabase, clock, database};

fn settings() -> QueueSettings {
    QueueSettings {
        lease: Duration::seconds(60),
        max_attempts: 2,
        backoff: BackoffPolicy::new(StdDuration::from_secs(5), StdDuration::from_secs(300)),
    }
}

fn notification_job(title: &str) -> Job {
    Job::DispatchNotification(OutboundNotification::new(
        IntegrationId::new(),
        NotificationEvent::TaskCreated {
            task_id: TaskId::new(),
            title: title.to_owned(),
        },
        NotificationTarget::Recipient("G-crew".to_owned()),
    ))
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn claimed_job_completes_with_its_payload(
    database: Option<TestDatabase>,
    clock: Arc<FixedClock>,
) {
    let Some(db) = database else { return };
    let queue = PostgresJobQueue::new(db.pool.clone(), Arc::clone(&clock), settings());
    let job = notification_job("会場設営をする");
    let id = queue.enqueue(&job).await.expect("enqueued");

    let claimed = queue
        .claim("worker-0")
        .await
        .expect("claim succeeds")
        .expect("job claimable");
    assert_eq!(claimed.id, id);
    assert_eq!(claimed.job, job);
    assert_eq!(claimed.attempt, 1);
    assert!(queue.claim("worker-1").await.expect("claim succeeds").is_none());

    queue.complete(id).await.expect("completed");
    let record = queue.find(id).await.expect("lookup succeeds").expect("job stored");
    assert_eq!(record.status, JobStatus::Done);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn failed_job_waits_out_backoff_then_exhausts(
    database: Option<TestDatabase>,
    clock: Arc<FixedClock>,
) {
    let Some(db) = database else { return };
    let queue = PostgresJobQueue::new(db.pool.clone(), Arc::clone(&clock), settings());
    let id = queue
        .enqueue(&notification_job("音響チェック"))
        .await
        .expect("enqueued");

    queue.claim("worker-0").await.expect("claim succeeds");
    let first = queue.fail(id, "platform unavailable").await.expect("recorded");
    assert!(matches!(first, FailureDisposition::Retrying { attempt: 1, .. }));
    assert!(queue.claim("worker-0").await.expect("claim succeeds").is_none());

    clock.advance(Duration::seconds(5));
    let retry = queue
        .claim("worker-0")
        .await
        .expect("claim succeeds")
        .expect("job claimable after backoff");
    assert_eq!(retry.attempt, 2);
    let second = queue.fail(id, "platform unavailable").await.expect("recorded");
    assert_eq!(second, FailureDisposition::Exhausted { attempt: 2 });

    let failed = queue
        .list_by_status(JobStatus::Failed)
        .await
        .expect("list succeeds");
    assert_eq!(failed.len(), 1);
    assert_eq!(
        failed.first().and_then(|record| record.last_error.as_deref()),
        Some("platform unavailable")
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn expired_lease_is_reclaimed(database: Option<TestDatabase>, clock: Arc<FixedClock>) {
    let Some(db) = database else { return };
    let queue = PostgresJobQueue::new(db.pool.clone(), Arc::clone(&clock), settings());
    let id = queue
        .enqueue(&notification_job("チラシ印刷"))
        .await
        .expect("enqueued");
    queue.claim("worker-0").await.expect("claim succeeds");

    clock.advance(Duration::seconds(61));
    let reclaimed = queue
        .claim("worker-1")
        .await
        .expect("claim succeeds")
        .expect("lease expired");

    assert_eq!(reclaimed.id, id);
    assert_eq!(reclaimed.attempt, 2);
    let record = queue.find(id).await.expect("lookup succeeds").expect("job stored");
    assert_eq!(record.locked_by.as_deref(), Some("worker-1"));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn expired_final_lease_is_reaped_once(database: Option<TestDatabase>, clock: Arc<FixedClock>) {
    let Some(db) = database else { return };
    let queue = PostgresJobQueue::new(db.pool.clone(), Arc::clone(&clock), settings());
    let id = queue
        .enqueue(&notification_job("撤収"))
        .await
        .expect("enqueued");
    for _ in 0..2 {
        queue
            .claim("worker-0")
            .await
            .expect("claim succeeds")
            .expect("job claimable");
        clock.advance(Duration::seconds(61));
    }

    assert!(queue.claim("worker-1").await.expect("claim succeeds").is_none());
    let reaped = queue.reap_expired().await.expect("reap succeeds");
    assert_eq!(reaped.len(), 1);
    assert_eq!(reaped.first().map(|record| record.id), Some(id));
    assert_eq!(reaped.first().map(|record| record.status), Some(JobStatus::Failed));
    assert!(queue.reap_expired().await.expect("reap succeeds").is_empty());
}

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_claims_never_share_a_job(
    database: Option<TestDatabase>,
    clock: Arc<FixedClock>,
) {
    let Some(db) = database else { return };
    let queue = Arc::new(PostgresJobQueue::new(
        db.pool.clone(),
        Arc::clone(&clock),
        settings(),
    ));
    for index in 0..8 {
        queue
            .enqueue(&notification_job(&format!("タスク{index}")))
            .await
            .expect("enqueued");
    }

    let mut claimers = tokio::task::JoinSet::new();
    for worker in 0..4 {
        let shared = Arc::clone(&queue);
        claimers.spawn(async move {
            let mut ids = Vec::new();
            while let Some(claimed) = shared
                .claim(&format!("worker-{worker}"))
                .await
                .expect("claim succeeds")
            {
                ids.push(claimed.id);
            }
            ids
        });
    }
    let mut seen = HashSet::new();
    let mut total = 0;
    while let Some(result) = claimers.join_next().await {
        for id in result.expect("claimer finished") {
            total += 1;
            seen.insert(id);
        }
    }

    assert_eq!(total, 8);
    assert_eq!(seen.len(), 8);
}
