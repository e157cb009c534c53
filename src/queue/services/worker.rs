//! A fixed-size pool of tokio tasks claiming and handling jobs.

use crate::queue::{
    domain::{ClaimedJob, FailureDisposition, Job},
    ports::{JobQueue, QueueResult},
};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Failure reported by a [`JobHandler`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HandlerError {
    /// The job may succeed if tried again later.
    #[error("retryable: {0}")]
    Retryable(String),
    /// The job can never succeed; it is failed without retry.
    #[error("permanent: {0}")]
    Permanent(String),
}

/// Handles one claimed job.
///
/// Handlers must be idempotent: a job may run again after a crash or an
/// expired lease.
#[async_trait]
pub trait JobHandler: Send + Sync {
    /// Handles the job.
    async fn handle(&self, job: &ClaimedJob) -> Result<(), HandlerError>;

    /// Called once the queue has given up on a job: its attempts are spent,
    /// it was discarded, or its final lease expired.
    async fn on_failed(&self, job: &Job, reason: &str);
}

/// Worker pool sizing and pacing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerPoolConfig {
    /// Number of concurrent workers.
    pub workers: usize,
    /// Sleep between polls of an empty queue.
    pub poll_interval: Duration,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            poll_interval: Duration::from_millis(500),
        }
    }
}

/// Workers claiming jobs from `Q` and running them through `H`.
pub struct WorkerPool<Q, H>
where
    Q: JobQueue + 'static,
    H: JobHandler + 'static,
{
    queue: Arc<Q>,
    handler: Arc<H>,
    config: WorkerPoolConfig,
}

impl<Q, H> Clone for WorkerPool<Q, H>
where
    Q: JobQueue + 'static,
    H: JobHandler + 'static,
{
    fn clone(&self) -> Self {
        Self {
            queue: Arc::clone(&self.queue),
            handler: Arc::clone(&self.handler),
            config: self.config,
        }
    }
}

/// Running workers; join after signalling shutdown.
#[derive(Debug)]
pub struct WorkerPoolHandle {
    tasks: JoinSet<()>,
}

impl WorkerPoolHandle {
    /// Waits for every worker to stop.
    pub async fn join(mut self) {
        while let Some(result) = self.tasks.join_next().await {
            if let Err(err) = result {
                error!(error = %err, "worker task panicked");
            }
        }
    }
}

impl<Q, H> WorkerPool<Q, H>
where
    Q: JobQueue + 'static,
    H: JobHandler + 'static,
{
    /// Creates a pool; nothing runs until [`Self::spawn`].
    #[must_use]
    pub const fn new(queue: Arc<Q>, handler: Arc<H>, config: WorkerPoolConfig) -> Self {
        Self {
            queue,
            handler,
            config,
        }
    }

    /// Starts the workers. They stop once `shutdown` turns `true` or its
    /// sender is dropped, finishing the job in hand first.
    #[must_use]
    pub fn spawn(&self, shutdown: &watch::Receiver<bool>) -> WorkerPoolHandle {
        let mut tasks = JoinSet::new();
        for index in 0..self.config.workers.max(1) {
            let pool = self.clone();
            let receiver = shutdown.clone();
            tasks.spawn(async move {
                pool.run_worker(format!("worker-{index}"), receiver).await;
            });
        }
        info!(workers = self.config.workers.max(1), "worker pool started");
        WorkerPoolHandle { tasks }
    }

    /// Claims and handles at most one job.
    ///
    /// Returns `true` when a job was claimed.
    ///
    /// # Errors
    ///
    /// Returns a queue error when claiming or recording the result fails.
    pub async fn run_once(&self, worker_id: &str) -> QueueResult<bool> {
        for record in self.queue.reap_expired().await? {
            let reason = record.last_error.as_deref().unwrap_or("lease expired");
            error!(job_id = %record.id, kind = record.job.kind(), attempt = record.attempts, reason, "job lease expired on its final attempt");
            self.handler.on_failed(&record.job, reason).await;
        }

        let Some(claimed) = self.queue.claim(worker_id).await? else {
            return Ok(false);
        };
        debug!(worker_id, job_id = %claimed.id, kind = claimed.job.kind(), attempt = claimed.attempt, "job claimed");

        match self.handler.handle(&claimed).await {
            Ok(()) => self.queue.complete(claimed.id).await?,
            Err(HandlerError::Permanent(reason)) => {
                warn!(job_id = %claimed.id, kind = claimed.job.kind(), %reason, "job discarded");
                self.queue.discard(claimed.id, &reason).await?;
                self.handler.on_failed(&claimed.job, &reason).await;
            }
            Err(HandlerError::Retryable(reason)) => {
                match self.queue.fail(claimed.id, &reason).await? {
                    FailureDisposition::Retrying {
                        attempt,
                        available_at,
                    } => warn!(
                        job_id = %claimed.id,
                        kind = claimed.job.kind(),
                        attempt,
                        %available_at,
                        %reason,
                        "job failed, retry scheduled"
                    ),
                    FailureDisposition::Exhausted { attempt } => {
                        error!(
                            job_id = %claimed.id,
                            kind = claimed.job.kind(),
                            attempt,
                            %reason,
                            "job failed permanently"
                        );
                        self.handler.on_failed(&claimed.job, &reason).await;
                    }
                }
            }
        }
        Ok(true)
    }

    /// Handles jobs until none is claimable. Used by tests and one-shot
    /// runs.
    ///
    /// # Errors
    ///
    /// Returns the first queue error.
    pub async fn drain(&self, worker_id: &str) -> QueueResult<usize> {
        let mut handled = 0;
        while self.run_once(worker_id).await? {
            handled += 1;
        }
        Ok(handled)
    }

    async fn run_worker(&self, worker_id: String, mut shutdown: watch::Receiver<bool>) {
        debug!(%worker_id, "worker started");
        loop {
            if *shutdown.borrow() {
                break;
            }
            match self.run_once(&worker_id).await {
                Ok(true) => continue,
                Ok(false) => {}
                Err(err) => warn!(%worker_id, error = %err, "queue operation failed"),
            }
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                () = tokio::time::sleep(self.config.poll_interval) => {}
            }
        }
        debug!(%worker_id, "worker stopped");
    }
}
