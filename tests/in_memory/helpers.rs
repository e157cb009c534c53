//! Full application wiring over in-memory adapters.
//!
//! [`App`] owns the webhook router, the worker pool and every store, so a
//! test can post a signed webhook, drain the queue and inspect the outcome.

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use chrono::{DateTime, TimeZone, Utc};
use eyre::{WrapErr, eyre};
use mockable::Clock;
use rstest::fixture;
use serde_json::json;
use tasklink::clock::FixedClock;
use tasklink::integration::{
    adapters::{
        memory::{InMemoryGroupRepository, InMemoryIntegrationRepository},
        runtime::InMemoryMessagingPlatform,
    },
    domain::{AccountId, Integration, NotificationPreferences, SecretValue},
    services::{CreateIntegrationRequest, GroupSyncService, IntegrationLifecycleService},
};
use tasklink::message::adapters::memory::InMemoryMessageRepository;
use tasklink::notification::services::{
    DispatchSettings, MessageFormatter, NotificationDispatcher, ReminderService,
};
use tasklink::pipeline::{JobProcessor, MessageSynchronizer, SyncSettings};
use tasklink::queue::{
    adapters::memory::InMemoryJobQueue,
    domain::{BackoffPolicy, JobStatus, QueueSettings},
    services::{WorkerPool, WorkerPoolConfig},
};
use tasklink::task::{
    adapters::memory::InMemoryTaskRepository,
    domain::{FestivalId, Task},
    services::TaskLifecycleService,
};
use tasklink::webhook::{SIGNATURE_HEADER, WebhookState, router, sign};
use tower::ServiceExt;

/// Channel secret of the test integration.
pub const SECRET: &str = "channel-secret";
/// Channel identifier the webhook destination resolves.
pub const CHANNEL_ID: &str = "1650000000";
/// The committee group every test message comes from.
pub const GROUP_ID: &str = "G-crew";

pub type TestQueue = InMemoryJobQueue<FixedClock>;
pub type TestLifecycle =
    IntegrationLifecycleService<InMemoryIntegrationRepository, InMemoryMessagingPlatform, FixedClock>;
pub type TestProcessor = JobProcessor<
    InMemoryIntegrationRepository,
    InMemoryGroupRepository,
    InMemoryMessagingPlatform,
    InMemoryMessageRepository,
    InMemoryTaskRepository,
    TestQueue,
    FixedClock,
>;

/// 2026-07-10 12:00 in Tokyo.
#[must_use]
pub fn tokyo_noon() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 7, 10, 3, 0, 0)
        .single()
        .unwrap_or_default()
}

/// 2026-07-10 23:00 in Tokyo.
#[must_use]
pub fn tokyo_late_evening() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 7, 10, 14, 0, 0)
        .single()
        .unwrap_or_default()
}

/// Running application over in-memory adapters.
pub struct App {
    pub clock: Arc<FixedClock>,
    pub router: Router,
    pub workers: WorkerPool<TestQueue, TestProcessor>,
    pub queue: Arc<TestQueue>,
    pub lifecycle: TestLifecycle,
    pub tasks: TaskLifecycleService<InMemoryTaskRepository, FixedClock>,
    pub reminders: ReminderService<InMemoryTaskRepository, TestQueue, FixedClock>,
    pub messages: Arc<InMemoryMessageRepository>,
    pub task_store: Arc<InMemoryTaskRepository>,
    pub groups: Arc<InMemoryGroupRepository>,
    pub platform: Arc<InMemoryMessagingPlatform>,
    pub integration: Integration,
}

impl App {
    /// Wires the application at `now` with one connected integration.
    ///
    /// # Errors
    ///
    /// Returns an error when the integration cannot be created or
    /// authenticated.
    pub async fn start(now: DateTime<Utc>) -> eyre::Result<Self> {
        let clock = Arc::new(FixedClock::new(now));
        let integrations = Arc::new(InMemoryIntegrationRepository::new());
        let groups = Arc::new(InMemoryGroupRepository::new());
        let messages = Arc::new(InMemoryMessageRepository::new());
        let task_store = Arc::new(InMemoryTaskRepository::new());
        let platform = Arc::new(InMemoryMessagingPlatform::new());
        let queue = Arc::new(InMemoryJobQueue::new(
            Arc::clone(&clock),
            QueueSettings {
                backoff: BackoffPolicy::immediate(),
                ..QueueSettings::default()
            },
        ));

        let lifecycle = IntegrationLifecycleService::new(
            Arc::clone(&integrations),
            Arc::clone(&platform),
            Arc::clone(&clock),
        );
        let synchronizer = MessageSynchronizer::new(
            Arc::clone(&messages),
            TaskLifecycleService::new(Arc::clone(&task_store), Arc::clone(&clock)),
            Arc::clone(&queue),
            Arc::clone(&clock),
            SyncSettings::default(),
        );
        let dispatcher = NotificationDispatcher::new(
            lifecycle.clone(),
            Arc::clone(&groups),
            Arc::clone(&platform),
            Arc::clone(&clock),
            MessageFormatter::default(),
            DispatchSettings {
                backoff: BackoffPolicy::immediate(),
                ..DispatchSettings::default()
            },
        );
        let processor = JobProcessor::new(
            lifecycle.clone(),
            GroupSyncService::new(Arc::clone(&groups), Arc::clone(&platform), Arc::clone(&clock)),
            synchronizer,
            dispatcher,
        );
        let workers = WorkerPool::new(
            Arc::clone(&queue),
            Arc::new(processor),
            WorkerPoolConfig {
                workers: 2,
                poll_interval: std::time::Duration::from_millis(10),
            },
        );

        let draft = lifecycle
            .create(CreateIntegrationRequest::new(
                AccountId::new(),
                FestivalId::new(),
                CHANNEL_ID,
                SECRET,
            ))
            .await
            .wrap_err("create integration")?;
        let integration = lifecycle
            .authenticate(draft.id())
            .await
            .wrap_err("authenticate integration")?;

        Ok(Self {
            router: router(WebhookState::new(
                integrations,
                Arc::clone(&queue),
                Arc::clone(&clock),
                64 * 1024,
            )),
            tasks: TaskLifecycleService::new(Arc::clone(&task_store), Arc::clone(&clock)),
            reminders: ReminderService::new(
                TaskLifecycleService::new(Arc::clone(&task_store), Arc::clone(&clock)),
                Arc::clone(&queue),
                Arc::clone(&clock),
            ),
            clock,
            workers,
            queue,
            lifecycle,
            messages,
            task_store,
            groups,
            platform,
            integration,
        })
    }

    /// Replaces the integration's notification preferences.
    ///
    /// # Errors
    ///
    /// Returns an error when the integration cannot be updated.
    pub async fn set_preferences(&mut self, preferences: NotificationPreferences) -> eyre::Result<()> {
        self.integration = self
            .lifecycle
            .update_preferences(self.integration.id(), preferences)
            .await
            .wrap_err("update preferences")?;
        Ok(())
    }

    /// Posts `body` signed with the channel secret.
    ///
    /// # Errors
    ///
    /// Returns an error when the request cannot be served.
    pub async fn post_signed(&self, body: &str) -> eyre::Result<StatusCode> {
        let signature = sign(&SecretValue::new(SECRET), body.as_bytes());
        self.post(body, Some(signature)).await
    }

    /// Posts `body` with an arbitrary signature header.
    ///
    /// # Errors
    ///
    /// Returns an error when the request cannot be built or served.
    pub async fn post(&self, body: &str, signature: Option<String>) -> eyre::Result<StatusCode> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/webhook")
            .header("content-type", "application/json");
        if let Some(value) = signature {
            builder = builder.header(SIGNATURE_HEADER, value);
        }
        let request = builder
            .body(Body::from(body.to_owned()))
            .wrap_err("build request")?;
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .map_err(|err| eyre!("router failed: {err}"))?;
        Ok(response.status())
    }

    /// Posts a signed text message from the committee group.
    ///
    /// # Errors
    ///
    /// Returns an error when the request cannot be served.
    pub async fn say(&self, platform_message_id: &str, text: &str) -> eyre::Result<StatusCode> {
        let body = message_envelope(self.clock.utc(), platform_message_id, text);
        self.post_signed(&body).await
    }

    /// Runs queued jobs until none is claimable.
    ///
    /// # Errors
    ///
    /// Returns an error when the queue fails.
    pub async fn drain(&self) -> eyre::Result<usize> {
        self.workers
            .drain("test-worker")
            .await
            .wrap_err("drain queue")
    }

    /// Returns every stored task.
    ///
    /// # Errors
    ///
    /// Returns an error when the store is unreadable.
    pub fn all_tasks(&self) -> eyre::Result<Vec<Task>> {
        self.task_store.all().wrap_err("read tasks")
    }

    /// Returns the texts pushed to the platform, in order.
    ///
    /// # Errors
    ///
    /// Returns an error when the platform state is unreadable.
    pub fn sent_texts(&self) -> eyre::Result<Vec<String>> {
        Ok(self
            .platform
            .sent()
            .wrap_err("read sent messages")?
            .into_iter()
            .map(|message| message.text)
            .collect())
    }

    /// Returns the status of every job in enqueue order.
    ///
    /// # Errors
    ///
    /// Returns an error when the queue is unreadable.
    pub fn job_statuses(&self) -> eyre::Result<Vec<JobStatus>> {
        Ok(self
            .queue
            .snapshot()
            .wrap_err("read queue")?
            .into_iter()
            .map(|record| record.status)
            .collect())
    }
}

/// Builds a webhook body carrying one group text message.
#[must_use]
pub fn message_envelope(sent_at: DateTime<Utc>, platform_message_id: &str, text: &str) -> String {
    json!({
        "destination": CHANNEL_ID,
        "events": [{
            "type": "message",
            "timestamp": sent_at.timestamp_millis(),
            "source": { "type": "group", "groupId": GROUP_ID, "userId": "U-aki" },
            "message": { "id": platform_message_id, "type": "text", "text": text },
        }],
    })
    .to_string()
}

/// Builds a webhook body announcing the bot joined the committee group.
#[must_use]
pub fn join_envelope(at: DateTime<Utc>) -> String {
    json!({
        "destination": CHANNEL_ID,
        "events": [{
            "type": "join",
            "timestamp": at.timestamp_millis(),
            "source": { "type": "group", "groupId": GROUP_ID },
        }],
    })
    .to_string()
}

/// Application pinned at Tokyo noon.
#[fixture]
pub async fn app() -> App {
    App::start(tokyo_noon()).await.expect("application starts")
}
