//! `PostgreSQL` repository implementation for inbound messages.
//!
//! Idempotent inserts rely on `ON CONFLICT DO NOTHING` against the
//! `(integration_id, platform_message_id)` unique constraint, followed by a
//! lookup of the row that won.

use super::{
    models::{MessageProcessingChangeset, MessageRow},
    schema::messages,
};
use crate::integration::domain::IntegrationId;
use crate::message::{
    domain::{InboundMessage, IntentType, MessageId, PersistedInboundMessage, PlatformMessageId},
    ports::{InsertOutcome, MessageRepository, MessageRepositoryError, MessageRepositoryResult},
};
use crate::persistence::{PgPool, get_conn_with, run_blocking_with};
use crate::task::domain::TaskId;
use async_trait::async_trait;
use diesel::pg::PgConnection;
use diesel::prelude::*;

/// `PostgreSQL`-backed message repository.
#[derive(Debug, Clone)]
pub struct PostgresMessageRepository {
    pool: PgPool,
}

impl PostgresMessageRepository {
    /// Creates a new repository from a `PostgreSQL` connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn run_blocking<F, T>(&self, f: F) -> MessageRepositoryResult<T>
    where
        F: FnOnce(&mut PgConnection) -> MessageRepositoryResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        run_blocking_with(
            move || {
                let mut connection = get_conn_with(&pool, MessageRepositoryError::persistence)?;
                f(&mut connection)
            },
            MessageRepositoryError::persistence,
        )
        .await
    }
}

#[async_trait]
impl MessageRepository for PostgresMessageRepository {
    async fn insert_new(&self, message: &InboundMessage) -> MessageRepositoryResult<InsertOutcome> {
        let row = to_row(message)?;
        let integration_id = message.integration_id().into_inner();
        let platform_message_id = message.platform_message_id().as_str().to_owned();

        self.run_blocking(move |connection| {
            let inserted = diesel::insert_into(messages::table)
                .values(&row)
                .on_conflict((messages::integration_id, messages::platform_message_id))
                .do_nothing()
                .execute(connection)
                .map_err(MessageRepositoryError::persistence)?;
            if inserted == 1 {
                return Ok(InsertOutcome::Inserted);
            }

            let existing = messages::table
                .filter(messages::integration_id.eq(integration_id))
                .filter(messages::platform_message_id.eq(&platform_message_id))
                .select(MessageRow::as_select())
                .first::<MessageRow>(connection)
                .map_err(MessageRepositoryError::persistence)?;
            Ok(InsertOutcome::AlreadyExists(row_to_message(existing)?))
        })
        .await
    }

    async fn update(&self, message: &InboundMessage) -> MessageRepositoryResult<()> {
        let message_id = message.id();
        let changeset = MessageProcessingChangeset {
            is_processed: message.is_processed(),
            intent_type: message.intent_type().map(|intent| intent.as_str().to_owned()),
            task_ref: message.task_ref().map(TaskId::into_inner),
            processing_attempts: attempts_to_column(message.processing_attempts())?,
            last_error: message.last_error().map(str::to_owned),
            permanently_failed: message.is_permanently_failed(),
        };

        self.run_blocking(move |connection| {
            let updated =
                diesel::update(messages::table.filter(messages::id.eq(message_id.into_inner())))
                    .set(&changeset)
                    .execute(connection)
                    .map_err(MessageRepositoryError::persistence)?;
            if updated == 0 {
                return Err(MessageRepositoryError::NotFound(message_id));
            }
            Ok(())
        })
        .await
    }

    async fn find_by_id(&self, id: MessageId) -> MessageRepositoryResult<Option<InboundMessage>> {
        self.run_blocking(move |connection| {
            messages::table
                .filter(messages::id.eq(id.into_inner()))
                .select(MessageRow::as_select())
                .first::<MessageRow>(connection)
                .optional()
                .map_err(MessageRepositoryError::persistence)?
                .map(row_to_message)
                .transpose()
        })
        .await
    }

    async fn find_by_platform_id(
        &self,
        integration_id: IntegrationId,
        platform_message_id: &PlatformMessageId,
    ) -> MessageRepositoryResult<Option<InboundMessage>> {
        let platform_message_id = platform_message_id.as_str().to_owned();
        self.run_blocking(move |connection| {
            messages::table
                .filter(messages::integration_id.eq(integration_id.into_inner()))
                .filter(messages::platform_message_id.eq(platform_message_id))
                .select(MessageRow::as_select())
                .first::<MessageRow>(connection)
                .optional()
                .map_err(MessageRepositoryError::persistence)?
                .map(row_to_message)
                .transpose()
        })
        .await
    }

    async fn list_failed(
        &self,
        integration_id: IntegrationId,
    ) -> MessageRepositoryResult<Vec<InboundMessage>> {
        self.run_blocking(move |connection| {
            messages::table
                .filter(messages::integration_id.eq(integration_id.into_inner()))
                .filter(messages::permanently_failed.eq(true))
                .order((messages::received_at.asc(), messages::id.asc()))
                .select(MessageRow::as_select())
                .load::<MessageRow>(connection)
                .map_err(MessageRepositoryError::persistence)?
                .into_iter()
                .map(row_to_message)
                .collect()
        })
        .await
    }
}

fn attempts_to_column(attempts: u32) -> MessageRepositoryResult<i32> {
    i32::try_from(attempts).map_err(MessageRepositoryError::persistence)
}

fn to_row(message: &InboundMessage) -> MessageRepositoryResult<MessageRow> {
    Ok(MessageRow {
        id: message.id().into_inner(),
        integration_id: message.integration_id().into_inner(),
        platform_message_id: message.platform_message_id().as_str().to_owned(),
        group_ref: message.group_ref().map(str::to_owned),
        sender_id: message.sender_id().map(str::to_owned),
        text: message.text().to_owned(),
        sent_at: message.sent_at(),
        received_at: message.received_at(),
        is_processed: message.is_processed(),
        intent_type: message.intent_type().map(|intent| intent.as_str().to_owned()),
        task_ref: message.task_ref().map(TaskId::into_inner),
        processing_attempts: attempts_to_column(message.processing_attempts())?,
        last_error: message.last_error().map(str::to_owned),
        permanently_failed: message.is_permanently_failed(),
    })
}

fn row_to_message(row: MessageRow) -> MessageRepositoryResult<InboundMessage> {
    let platform_message_id = PlatformMessageId::new(row.platform_message_id)
        .map_err(MessageRepositoryError::persistence)?;
    let intent_type = row
        .intent_type
        .as_deref()
        .map(IntentType::try_from)
        .transpose()
        .map_err(MessageRepositoryError::persistence)?;
    let processing_attempts =
        u32::try_from(row.processing_attempts).map_err(MessageRepositoryError::persistence)?;

    Ok(InboundMessage::from_persisted(PersistedInboundMessage {
        id: MessageId::from_uuid(row.id),
        integration_id: IntegrationId::from_uuid(row.integration_id),
        platform_message_id,
        group_ref: row.group_ref,
        sender_id: row.sender_id,
        text: row.text,
        sent_at: row.sent_at,
        received_at: row.received_at,
        is_processed: row.is_processed,
        intent_type,
        task_ref: row.task_ref.map(TaskId::from_uuid),
        processing_attempts,
        last_error: row.last_error,
        permanently_failed: row.permanently_failed,
    }))
}
