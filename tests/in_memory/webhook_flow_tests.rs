//! Authentication at the HTTP edge, checked end to end.

use crate::in_memory::helpers::{App, SECRET, app, message_envelope};
use axum::http::StatusCode;
use mockable::Clock;
use rstest::rstest;
use tasklink::integration::domain::SecretValue;
use tasklink::webhook::sign;

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn tampered_body_is_rejected_and_never_processed(#[future(awt)] app: App) {
    let original = message_envelope(app.clock.utc(), "m-1", "タスク: 会場設営をする");
    let signature = sign(&SecretValue::new(SECRET), original.as_bytes());
    let tampered = original.replace("会場設営", "後片付け");

    let status = app
        .post(&tampered, Some(signature))
        .await
        .expect("webhook served");
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    assert_eq!(app.drain().await.expect("queue drained"), 0);
    assert!(app.messages.is_empty().expect("messages readable"));
    assert!(app.all_tasks().expect("tasks readable").is_empty());
}

#[rstest]
#[case::missing(None)]
#[case::foreign_secret(Some(sign(&SecretValue::new("another-secret"), b"{}")))]
#[tokio::test(flavor = "multi_thread")]
async fn unsigned_or_foreign_signature_is_rejected(
    #[future(awt)] app: App,
    #[case] signature: Option<String>,
) {
    let body = message_envelope(app.clock.utc(), "m-1", "タスク: 会場設営をする");

    let status = app.post(&body, signature).await.expect("webhook served");

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(app.job_statuses().expect("queue readable").is_empty());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn accepted_webhook_stamps_the_integration(#[future(awt)] app: App) {
    assert_eq!(app.integration.last_webhook_received_at(), None);

    app.say("m-1", "おはようございます").await.expect("webhook served");

    let stored = app
        .lifecycle
        .get(app.integration.id())
        .await
        .expect("integration stored");
    assert_eq!(stored.last_webhook_received_at(), Some(app.clock.utc()));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn disconnected_integration_still_authenticates_webhooks(#[future(awt)] app: App) {
    app.lifecycle
        .disconnect(app.integration.id())
        .await
        .expect("integration disconnected");

    let status = app
        .say("m-1", "タスク: 会場設営をする")
        .await
        .expect("webhook served");
    app.drain().await.expect("queue drained");

    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.all_tasks().expect("tasks readable").len(), 1);
    assert!(app.sent_texts().expect("platform readable").is_empty());
}
