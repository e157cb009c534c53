//! In-memory work queue for tests and single-process runs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockable::Clock;
use std::sync::{Arc, RwLock};

use crate::queue::{
    domain::{
        ClaimedJob, FailureDisposition, Job, JobId, JobRecord, JobStatus, QueueSettings,
    },
    ports::{JobQueue, QueueError, QueueResult},
};

const LEASE_EXHAUSTED: &str = "lease expired after the final attempt";

#[derive(Debug, Clone)]
struct StoredJob {
    record: JobRecord,
    locked_at: Option<DateTime<Utc>>,
}

/// Thread-safe in-memory job queue with the same lease and retry rules as
/// the `PostgreSQL` adapter.
#[derive(Debug, Clone)]
pub struct InMemoryJobQueue<C>
where
    C: Clock + Send + Sync,
{
    state: Arc<RwLock<Vec<StoredJob>>>,
    clock: Arc<C>,
    settings: QueueSettings,
}

impl<C> InMemoryJobQueue<C>
where
    C: Clock + Send + Sync,
{
    /// Creates an empty queue.
    #[must_use]
    pub fn new(clock: Arc<C>, settings: QueueSettings) -> Self {
        Self {
            state: Arc::new(RwLock::new(Vec::new())),
            clock,
            settings,
        }
    }

    /// Returns snapshots of every job in enqueue order.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Persistence`] when the lock is poisoned.
    pub fn snapshot(&self) -> QueueResult<Vec<JobRecord>> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(state.iter().map(|stored| stored.record.clone()).collect())
    }

    fn is_claimable(&self, stored: &StoredJob, now: DateTime<Utc>) -> bool {
        if stored.record.attempts >= self.settings.max_attempts {
            return false;
        }
        match stored.record.status {
            JobStatus::Pending => stored.record.available_at <= now,
            JobStatus::Running => self.lease_expired(stored, now),
            JobStatus::Done | JobStatus::Failed => false,
        }
    }

    fn lease_expired(&self, stored: &StoredJob, now: DateTime<Utc>) -> bool {
        stored
            .locked_at
            .is_some_and(|locked_at| locked_at + self.settings.lease <= now)
    }
}

fn poisoned<T>(err: std::sync::PoisonError<T>) -> QueueError {
    QueueError::persistence(std::io::Error::other(err.to_string()))
}

fn release(stored: &mut StoredJob, status: JobStatus, error: Option<&str>) {
    stored.record.status = status;
    stored.record.locked_by = None;
    stored.locked_at = None;
    if let Some(message) = error {
        stored.record.last_error = Some(message.to_owned());
    }
}

#[async_trait]
impl<C> JobQueue for InMemoryJobQueue<C>
where
    C: Clock + Send + Sync,
{
    async fn enqueue(&self, job: &Job) -> QueueResult<JobId> {
        let now = self.clock.utc();
        let id = JobId::new();
        let mut state = self.state.write().map_err(poisoned)?;
        state.push(StoredJob {
            record: JobRecord {
                id,
                job: job.clone(),
                status: JobStatus::Pending,
                attempts: 0,
                available_at: now,
                locked_by: None,
                last_error: None,
                created_at: now,
            },
            locked_at: None,
        });
        Ok(id)
    }

    async fn claim(&self, worker_id: &str) -> QueueResult<Option<ClaimedJob>> {
        let now = self.clock.utc();
        let mut state = self.state.write().map_err(poisoned)?;
        let Some(stored) = state
            .iter_mut()
            .filter(|stored| self.is_claimable(stored, now))
            .min_by_key(|stored| stored.record.created_at)
        else {
            return Ok(None);
        };

        stored.record.status = JobStatus::Running;
        stored.record.attempts = stored.record.attempts.saturating_add(1);
        stored.record.locked_by = Some(worker_id.to_owned());
        stored.locked_at = Some(now);
        Ok(Some(ClaimedJob {
            id: stored.record.id,
            job: stored.record.job.clone(),
            attempt: stored.record.attempts,
        }))
    }

    async fn reap_expired(&self) -> QueueResult<Vec<JobRecord>> {
        let now = self.clock.utc();
        let mut state = self.state.write().map_err(poisoned)?;
        let mut reaped = Vec::new();
        for stored in state.iter_mut().filter(|stored| {
            stored.record.status == JobStatus::Running
                && stored.record.attempts >= self.settings.max_attempts
                && self.lease_expired(stored, now)
        }) {
            release(stored, JobStatus::Failed, Some(LEASE_EXHAUSTED));
            reaped.push(stored.record.clone());
        }
        Ok(reaped)
    }

    async fn complete(&self, id: JobId) -> QueueResult<()> {
        let mut state = self.state.write().map_err(poisoned)?;
        let stored = find_mut(&mut state, id)?;
        release(stored, JobStatus::Done, None);
        Ok(())
    }

    async fn fail(&self, id: JobId, error: &str) -> QueueResult<FailureDisposition> {
        let now = self.clock.utc();
        let mut state = self.state.write().map_err(poisoned)?;
        let stored = find_mut(&mut state, id)?;
        let disposition = self.settings.disposition(stored.record.attempts, now);
        match disposition {
            FailureDisposition::Retrying { available_at, .. } => {
                release(stored, JobStatus::Pending, Some(error));
                stored.record.available_at = available_at;
            }
            FailureDisposition::Exhausted { .. } => {
                release(stored, JobStatus::Failed, Some(error));
            }
        }
        Ok(disposition)
    }

    async fn discard(&self, id: JobId, error: &str) -> QueueResult<()> {
        let mut state = self.state.write().map_err(poisoned)?;
        let stored = find_mut(&mut state, id)?;
        release(stored, JobStatus::Failed, Some(error));
        Ok(())
    }

    async fn find(&self, id: JobId) -> QueueResult<Option<JobRecord>> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(state
            .iter()
            .find(|stored| stored.record.id == id)
            .map(|stored| stored.record.clone()))
    }

    async fn list_by_status(&self, status: JobStatus) -> QueueResult<Vec<JobRecord>> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(state
            .iter()
            .filter(|stored| stored.record.status == status)
            .map(|stored| stored.record.clone())
            .collect())
    }
}

fn find_mut(state: &mut [StoredJob], id: JobId) -> QueueResult<&mut StoredJob> {
    state
        .iter_mut()
        .find(|stored| stored.record.id == id)
        .ok_or(QueueError::NotFound(id))
}
