//! `tasklink` server and maintenance commands.
//!
//! ```text
//! tasklink [--config tasklink.toml] serve
//! tasklink [--config tasklink.toml] remind --window-minutes 60
//! ```
//!
//! `serve` runs the webhook listener and the worker pool until interrupted.
//! `remind` enqueues deadline reminders for every connected integration and
//! exits; schedule it externally.

use clap::{Parser, Subcommand};
use diesel::r2d2::PoolError;
use mockable::DefaultClock;
use std::path::PathBuf;
use std::sync::Arc;
use tasklink::config::{AppConfig, ConfigError};
use tasklink::integration::{
    adapters::{
        http::HttpMessagingPlatform,
        postgres::{PostgresGroupRepository, PostgresIntegrationRepository},
    },
    domain::IntegrationStatus,
    ports::{IntegrationRepository, IntegrationRepositoryError},
    services::{GroupSyncService, IntegrationLifecycleService},
};
use tasklink::message::adapters::postgres::PostgresMessageRepository;
use tasklink::notification::services::{MessageFormatter, NotificationDispatcher, ReminderService};
use tasklink::persistence::{PgPool, build_pool};
use tasklink::pipeline::{JobProcessor, MessageSynchronizer};
use tasklink::queue::{adapters::postgres::PostgresJobQueue, services::WorkerPool};
use tasklink::task::{adapters::postgres::PostgresTaskRepository, services::TaskLifecycleService};
use tasklink::telemetry::{TelemetryError, init_tracing};
use tasklink::webhook::{WebhookState, router};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info, warn};

#[derive(Debug, Parser)]
#[command(name = "tasklink", version, about = "Chat webhook to task pipeline")]
struct Cli {
    /// TOML configuration file; `TASKLINK_*` variables override it.
    #[arg(long, short)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Serve webhooks and process queued jobs (default).
    Serve,
    /// Enqueue reminders for open tasks due within the window.
    Remind {
        /// Look-ahead window in minutes.
        #[arg(long, default_value_t = 60)]
        window_minutes: i64,
    },
}

#[derive(Debug, Error)]
enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    #[error("database pool: {0}")]
    Pool(#[from] PoolError),
    #[error("platform client: {0}")]
    Platform(#[from] reqwest::Error),
    #[error("integration lookup: {0}")]
    Integrations(#[from] IntegrationRepositoryError),
    #[error("server: {0}")]
    Io(#[from] std::io::Error),
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref())?;
    init_tracing(&config.log.filter)?;

    let pool = build_pool(&config.database.url, config.database.pool_size)?;
    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(&config, pool).await,
        Command::Remind { window_minutes } => {
            remind(&config, pool, chrono::Duration::minutes(window_minutes)).await
        }
    }
}

async fn serve(config: &AppConfig, pool: PgPool) -> Result<(), AppError> {
    let clock = Arc::new(DefaultClock);
    let integrations = Arc::new(PostgresIntegrationRepository::new(pool.clone()));
    let groups = Arc::new(PostgresGroupRepository::new(pool.clone()));
    let messages = Arc::new(PostgresMessageRepository::new(pool.clone()));
    let tasks = Arc::new(PostgresTaskRepository::new(pool.clone()));
    let queue = Arc::new(PostgresJobQueue::new(
        pool,
        Arc::clone(&clock),
        config.queue.settings(),
    ));
    let platform = Arc::new(HttpMessagingPlatform::new(
        &config.platform.api_base_url,
        config.platform.request_timeout(),
    )?);

    let lifecycle = || {
        IntegrationLifecycleService::new(
            Arc::clone(&integrations),
            Arc::clone(&platform),
            Arc::clone(&clock),
        )
    };
    let synchronizer = MessageSynchronizer::new(
        messages,
        TaskLifecycleService::new(tasks, Arc::clone(&clock)),
        Arc::clone(&queue),
        Arc::clone(&clock),
        config.pipeline.sync_settings(),
    );
    let dispatcher = NotificationDispatcher::new(
        lifecycle(),
        Arc::clone(&groups),
        Arc::clone(&platform),
        Arc::clone(&clock),
        MessageFormatter::new(),
        config.notification.dispatch_settings(),
    );
    let processor = JobProcessor::new(
        lifecycle(),
        GroupSyncService::new(groups, Arc::clone(&platform), Arc::clone(&clock)),
        synchronizer,
        dispatcher,
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let workers = WorkerPool::new(
        Arc::clone(&queue),
        Arc::new(processor),
        config.queue.worker_pool(),
    )
    .spawn(&shutdown_rx);

    let app = router(WebhookState::new(
        Arc::clone(&integrations),
        queue,
        Arc::clone(&clock),
        config.server.max_body_bytes,
    ));
    let listener = TcpListener::bind(&config.server.bind_address).await?;
    info!(address = %config.server.bind_address, "webhook listener started");

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;
    shutdown_tx.send_replace(true);
    workers.join().await;
    info!("shutdown complete");
    Ok(served?)
}

async fn remind(
    config: &AppConfig,
    pool: PgPool,
    window: chrono::Duration,
) -> Result<(), AppError> {
    let clock = Arc::new(DefaultClock);
    let integrations = PostgresIntegrationRepository::new(pool.clone());
    let queue = Arc::new(PostgresJobQueue::new(
        pool.clone(),
        Arc::clone(&clock),
        config.queue.settings(),
    ));
    let reminders = ReminderService::new(
        TaskLifecycleService::new(
            Arc::new(PostgresTaskRepository::new(pool)),
            Arc::clone(&clock),
        ),
        queue,
        clock,
    );

    let mut enqueued = 0;
    for integration in integrations
        .list_by_status(IntegrationStatus::Connected)
        .await?
    {
        match reminders.enqueue_due_reminders(&integration, window).await {
            Ok(count) => enqueued += count,
            Err(err) => warn!(
                integration_id = %integration.id(),
                error = %err,
                "reminder scheduling failed"
            ),
        }
    }
    info!(enqueued, window_minutes = window.num_minutes(), "reminder run finished");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
