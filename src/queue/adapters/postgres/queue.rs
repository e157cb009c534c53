//! `PostgreSQL` job queue with `FOR UPDATE SKIP LOCKED` claims.

use super::{models::JobRow, schema::jobs};
use crate::persistence::{PgPool, get_conn_with, run_blocking_with};
use crate::queue::{
    domain::{
        ClaimedJob, FailureDisposition, Job, JobId, JobRecord, JobStatus, QueueSettings,
    },
    ports::{JobQueue, QueueError, QueueResult},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use mockable::Clock;
use std::sync::Arc;

const LEASE_EXHAUSTED: &str = "lease expired after the final attempt";

/// `PostgreSQL`-backed job queue.
#[derive(Clone)]
pub struct PostgresJobQueue<C>
where
    C: Clock + Send + Sync,
{
    pool: PgPool,
    clock: Arc<C>,
    settings: QueueSettings,
}

impl<C> PostgresJobQueue<C>
where
    C: Clock + Send + Sync,
{
    /// Creates a queue over `pool`.
    #[must_use]
    pub const fn new(pool: PgPool, clock: Arc<C>, settings: QueueSettings) -> Self {
        Self {
            pool,
            clock,
            settings,
        }
    }

    async fn run_blocking<F, T>(&self, f: F) -> QueueResult<T>
    where
        F: FnOnce(&mut PgConnection) -> QueueResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        run_blocking_with(
            move || {
                let mut connection = get_conn_with(&pool, QueueError::persistence)?;
                f(&mut connection)
            },
            QueueError::persistence,
        )
        .await
    }

    fn max_attempts(&self) -> i32 {
        i32::try_from(self.settings.max_attempts).unwrap_or(i32::MAX)
    }
}

#[async_trait]
impl<C> JobQueue for PostgresJobQueue<C>
where
    C: Clock + Send + Sync + 'static,
{
    async fn enqueue(&self, job: &Job) -> QueueResult<JobId> {
        let id = JobId::new();
        let now = self.clock.utc();
        let payload = serde_json::to_value(job).map_err(|err| QueueError::InvalidPayload {
            id,
            message: err.to_string(),
        })?;
        let row = JobRow {
            id: id.into_inner(),
            kind: job.kind().to_owned(),
            payload,
            status: JobStatus::Pending.as_str().to_owned(),
            attempts: 0,
            available_at: now,
            locked_at: None,
            locked_by: None,
            last_error: None,
            created_at: now,
            updated_at: now,
        };

        self.run_blocking(move |connection| {
            diesel::insert_into(jobs::table)
                .values(&row)
                .execute(connection)
                .map_err(QueueError::persistence)?;
            Ok(id)
        })
        .await
    }

    async fn claim(&self, worker_id: &str) -> QueueResult<Option<ClaimedJob>> {
        let now = self.clock.utc();
        let lease_cutoff = now - self.settings.lease;
        let max_attempts = self.max_attempts();
        let worker = worker_id.to_owned();

        let claimed = self
            .run_blocking(move |connection| {
                connection
                    .transaction::<_, diesel::result::Error, _>(|tx| {
                        let candidate = jobs::table
                            .filter(jobs::attempts.lt(max_attempts))
                            .filter(
                                jobs::status
                                    .eq(JobStatus::Pending.as_str())
                                    .and(jobs::available_at.le(now))
                                    .or(jobs::status
                                        .eq(JobStatus::Running.as_str())
                                        .and(jobs::locked_at.le(lease_cutoff))),
                            )
                            .order(jobs::created_at.asc())
                            .select(JobRow::as_select())
                            .for_update()
                            .skip_locked()
                            .first::<JobRow>(tx)
                            .optional()?;
                        let Some(row) = candidate else {
                            return Ok(None);
                        };

                        diesel::update(jobs::table.find(row.id))
                            .set((
                                jobs::status.eq(JobStatus::Running.as_str()),
                                jobs::attempts.eq(row.attempts.saturating_add(1)),
                                jobs::locked_at.eq(Some(now)),
                                jobs::locked_by.eq(Some(worker)),
                                jobs::updated_at.eq(now),
                            ))
                            .returning(JobRow::as_returning())
                            .get_result::<JobRow>(tx)
                            .map(Some)
                    })
                    .map_err(QueueError::persistence)
            })
            .await?;

        claimed
            .map(|row| {
                let record = row_to_record(row)?;
                Ok(ClaimedJob {
                    id: record.id,
                    job: record.job,
                    attempt: record.attempts,
                })
            })
            .transpose()
    }

    async fn reap_expired(&self) -> QueueResult<Vec<JobRecord>> {
        let now = self.clock.utc();
        let lease_cutoff = now - self.settings.lease;
        let max_attempts = self.max_attempts();

        let rows = self
            .run_blocking(move |connection| {
                diesel::update(
                    jobs::table
                        .filter(jobs::status.eq(JobStatus::Running.as_str()))
                        .filter(jobs::attempts.ge(max_attempts))
                        .filter(jobs::locked_at.le(lease_cutoff)),
                )
                .set((
                    jobs::status.eq(JobStatus::Failed.as_str()),
                    jobs::locked_at.eq(None::<DateTime<Utc>>),
                    jobs::locked_by.eq(None::<String>),
                    jobs::last_error.eq(LEASE_EXHAUSTED),
                    jobs::updated_at.eq(now),
                ))
                .returning(JobRow::as_returning())
                .get_results::<JobRow>(connection)
                .map_err(QueueError::persistence)
            })
            .await?;
        rows.into_iter().map(row_to_record).collect()
    }

    async fn complete(&self, id: JobId) -> QueueResult<()> {
        let now = self.clock.utc();
        self.run_blocking(move |connection| {
            let updated = diesel::update(jobs::table.find(id.into_inner()))
                .set((
                    jobs::status.eq(JobStatus::Done.as_str()),
                    jobs::locked_at.eq(None::<DateTime<Utc>>),
                    jobs::locked_by.eq(None::<String>),
                    jobs::updated_at.eq(now),
                ))
                .execute(connection)
                .map_err(QueueError::persistence)?;
            if updated == 0 {
                return Err(QueueError::NotFound(id));
            }
            Ok(())
        })
        .await
    }

    async fn fail(&self, id: JobId, error: &str) -> QueueResult<FailureDisposition> {
        let now = self.clock.utc();
        let settings = self.settings;
        let message = error.to_owned();

        let disposition = self
            .run_blocking(move |connection| {
                connection
                    .transaction::<_, diesel::result::Error, _>(|tx| {
                        let Some(attempts) = jobs::table
                            .find(id.into_inner())
                            .select(jobs::attempts)
                            .for_update()
                            .first::<i32>(tx)
                            .optional()?
                        else {
                            return Ok(None);
                        };
                        let disposition = settings
                            .disposition(u32::try_from(attempts).unwrap_or_default(), now);
                        let (status, available_at) = match disposition {
                            FailureDisposition::Retrying { available_at, .. } => {
                                (JobStatus::Pending, available_at)
                            }
                            FailureDisposition::Exhausted { .. } => (JobStatus::Failed, now),
                        };

                        diesel::update(jobs::table.find(id.into_inner()))
                            .set((
                                jobs::status.eq(status.as_str()),
                                jobs::available_at.eq(available_at),
                                jobs::locked_at.eq(None::<DateTime<Utc>>),
                                jobs::locked_by.eq(None::<String>),
                                jobs::last_error.eq(Some(message)),
                                jobs::updated_at.eq(now),
                            ))
                            .execute(tx)?;
                        Ok(Some(disposition))
                    })
                    .map_err(QueueError::persistence)
            })
            .await?;
        disposition.ok_or(QueueError::NotFound(id))
    }

    async fn discard(&self, id: JobId, error: &str) -> QueueResult<()> {
        let now = self.clock.utc();
        let message = error.to_owned();
        self.run_blocking(move |connection| {
            let updated = diesel::update(jobs::table.find(id.into_inner()))
                .set((
                    jobs::status.eq(JobStatus::Failed.as_str()),
                    jobs::locked_at.eq(None::<DateTime<Utc>>),
                    jobs::locked_by.eq(None::<String>),
                    jobs::last_error.eq(Some(message)),
                    jobs::updated_at.eq(now),
                ))
                .execute(connection)
                .map_err(QueueError::persistence)?;
            if updated == 0 {
                return Err(QueueError::NotFound(id));
            }
            Ok(())
        })
        .await
    }

    async fn find(&self, id: JobId) -> QueueResult<Option<JobRecord>> {
        self.run_blocking(move |connection| {
            let row = jobs::table
                .find(id.into_inner())
                .select(JobRow::as_select())
                .first::<JobRow>(connection)
                .optional()
                .map_err(QueueError::persistence)?;
            row.map(row_to_record).transpose()
        })
        .await
    }

    async fn list_by_status(&self, status: JobStatus) -> QueueResult<Vec<JobRecord>> {
        self.run_blocking(move |connection| {
            let rows = jobs::table
                .filter(jobs::status.eq(status.as_str()))
                .order(jobs::created_at.asc())
                .select(JobRow::as_select())
                .load::<JobRow>(connection)
                .map_err(QueueError::persistence)?;
            rows.into_iter().map(row_to_record).collect()
        })
        .await
    }
}

fn row_to_record(row: JobRow) -> QueueResult<JobRecord> {
    let id = JobId::from_uuid(row.id);
    let job: Job = serde_json::from_value(row.payload).map_err(|err| QueueError::InvalidPayload {
        id,
        message: err.to_string(),
    })?;
    let status = JobStatus::try_from(row.status.as_str()).map_err(QueueError::persistence)?;
    let attempts = u32::try_from(row.attempts).map_err(QueueError::persistence)?;
    Ok(JobRecord {
        id,
        job,
        status,
        attempts,
        available_at: row.available_at,
        locked_by: row.locked_by,
        last_error: row.last_error,
        created_at: row.created_at,
    })
}
