//! `PostgreSQL` repository implementation for integrations.

use super::{
    models::{IntegrationChanges, IntegrationRow},
    schema::integrations,
};
use crate::integration::{
    domain::{
        AccountId, Credentials, Integration, IntegrationId, IntegrationStatus,
        NotificationPreferences, PersistedIntegrationData, SecretValue,
    },
    ports::{IntegrationRepository, IntegrationRepositoryError, IntegrationRepositoryResult},
};
use crate::persistence::{PgPool, get_conn_with, run_blocking_with, unique_violation_constraint};
use crate::task::domain::FestivalId;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;

const OWNER_SCOPE_CONSTRAINT: &str = "integrations_owner_festival_key";
const CHANNEL_CONSTRAINT: &str = "integrations_channel_id_key";

/// `PostgreSQL`-backed integration repository.
#[derive(Debug, Clone)]
pub struct PostgresIntegrationRepository {
    pool: PgPool,
}

impl PostgresIntegrationRepository {
    /// Creates a new repository from a `PostgreSQL` connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn run_blocking<F, T>(&self, f: F) -> IntegrationRepositoryResult<T>
    where
        F: FnOnce(&mut PgConnection) -> IntegrationRepositoryResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        run_blocking_with(
            move || {
                let mut connection =
                    get_conn_with(&pool, IntegrationRepositoryError::persistence)?;
                f(&mut connection)
            },
            IntegrationRepositoryError::persistence,
        )
        .await
    }
}

#[async_trait]
impl IntegrationRepository for PostgresIntegrationRepository {
    async fn store(&self, integration: &Integration) -> IntegrationRepositoryResult<()> {
        let row = to_row(integration)?;
        let scope = integration.scope();
        let channel_id = integration.channel_id().to_owned();

        self.run_blocking(move |connection| {
            diesel::insert_into(integrations::table)
                .values(&row)
                .execute(connection)
                .map_err(|err| {
                    let constraint = unique_violation_constraint(&err).map(str::to_owned);
                    match constraint.as_deref() {
                        Some(OWNER_SCOPE_CONSTRAINT) => {
                            IntegrationRepositoryError::DuplicateScope(scope)
                        }
                        Some(CHANNEL_CONSTRAINT) => {
                            IntegrationRepositoryError::DuplicateChannel(channel_id)
                        }
                        _ => IntegrationRepositoryError::persistence(err),
                    }
                })?;
            Ok(())
        })
        .await
    }

    async fn update(&self, integration: &Integration) -> IntegrationRepositoryResult<Integration> {
        let integration_id = integration.id();
        let expected_version = integration.version();
        let changes = to_changes(integration)?;

        let row = self
            .run_blocking(move |connection| {
                let stored = diesel::update(
                    integrations::table
                        .filter(integrations::id.eq(integration_id.into_inner()))
                        .filter(integrations::version.eq(expected_version)),
                )
                .set((
                    &changes,
                    integrations::version.eq(expected_version.saturating_add(1)),
                ))
                .returning(IntegrationRow::as_returning())
                .get_result::<IntegrationRow>(connection)
                .optional()
                .map_err(IntegrationRepositoryError::persistence)?;
                if let Some(row) = stored {
                    return Ok(row);
                }
                let exists = integrations::table
                    .find(integration_id.into_inner())
                    .select(integrations::id)
                    .first::<uuid::Uuid>(connection)
                    .optional()
                    .map_err(IntegrationRepositoryError::persistence)?
                    .is_some();
                if exists {
                    Err(IntegrationRepositoryError::Conflict(integration_id))
                } else {
                    Err(IntegrationRepositoryError::NotFound(integration_id))
                }
            })
            .await?;
        row_to_integration(row)
    }

    async fn record_webhook_received(
        &self,
        id: IntegrationId,
        at: DateTime<Utc>,
    ) -> IntegrationRepositoryResult<()> {
        self.run_blocking(move |connection| {
            let updated = diesel::update(integrations::table.find(id.into_inner()))
                .set(integrations::last_webhook_received_at.eq(Some(at)))
                .execute(connection)
                .map_err(IntegrationRepositoryError::persistence)?;
            if updated == 0 {
                return Err(IntegrationRepositoryError::NotFound(id));
            }
            Ok(())
        })
        .await
    }

    async fn find_by_id(
        &self,
        id: IntegrationId,
    ) -> IntegrationRepositoryResult<Option<Integration>> {
        self.run_blocking(move |connection| {
            integrations::table
                .filter(integrations::id.eq(id.into_inner()))
                .select(IntegrationRow::as_select())
                .first::<IntegrationRow>(connection)
                .optional()
                .map_err(IntegrationRepositoryError::persistence)?
                .map(row_to_integration)
                .transpose()
        })
        .await
    }

    async fn find_by_channel_id(
        &self,
        channel_id: &str,
    ) -> IntegrationRepositoryResult<Option<Integration>> {
        let channel = channel_id.to_owned();
        self.run_blocking(move |connection| {
            integrations::table
                .filter(integrations::channel_id.eq(channel))
                .select(IntegrationRow::as_select())
                .first::<IntegrationRow>(connection)
                .optional()
                .map_err(IntegrationRepositoryError::persistence)?
                .map(row_to_integration)
                .transpose()
        })
        .await
    }

    async fn list_by_status(
        &self,
        status: IntegrationStatus,
    ) -> IntegrationRepositoryResult<Vec<Integration>> {
        self.run_blocking(move |connection| {
            integrations::table
                .filter(integrations::status.eq(status.as_str()))
                .order((integrations::created_at.asc(), integrations::id.asc()))
                .select(IntegrationRow::as_select())
                .load::<IntegrationRow>(connection)
                .map_err(IntegrationRepositoryError::persistence)?
                .into_iter()
                .map(row_to_integration)
                .collect()
        })
        .await
    }
}

fn to_row(integration: &Integration) -> IntegrationRepositoryResult<IntegrationRow> {
    let credentials = integration.credentials();
    let preferences = serde_json::to_value(integration.notification_preferences())
        .map_err(IntegrationRepositoryError::persistence)?;
    Ok(IntegrationRow {
        id: integration.id().into_inner(),
        owner_id: integration.owner().into_inner(),
        festival_id: integration.scope().into_inner(),
        channel_id: credentials.channel_id().to_owned(),
        channel_secret: credentials.channel_secret().expose().to_owned(),
        access_token: credentials
            .access_token()
            .map(|token| token.expose().to_owned()),
        refresh_token: credentials
            .refresh_token()
            .map(|token| token.expose().to_owned()),
        token_expires_at: credentials.token_expires_at(),
        status: integration.status().as_str().to_owned(),
        webhook_url: integration.webhook_url().map(str::to_owned),
        last_error: integration.last_error().map(str::to_owned),
        last_error_at: integration.last_error_at(),
        last_webhook_received_at: integration.last_webhook_received_at(),
        last_sync_at: integration.last_sync_at(),
        notification_preferences: preferences,
        created_at: integration.created_at(),
        updated_at: integration.updated_at(),
        version: integration.version(),
    })
}

fn to_changes(integration: &Integration) -> IntegrationRepositoryResult<IntegrationChanges> {
    let row = to_row(integration)?;
    Ok(IntegrationChanges {
        channel_secret: row.channel_secret,
        access_token: row.access_token,
        refresh_token: row.refresh_token,
        token_expires_at: row.token_expires_at,
        status: row.status,
        webhook_url: row.webhook_url,
        last_error: row.last_error,
        last_error_at: row.last_error_at,
        last_sync_at: row.last_sync_at,
        notification_preferences: row.notification_preferences,
        updated_at: row.updated_at,
    })
}

fn row_to_integration(row: IntegrationRow) -> IntegrationRepositoryResult<Integration> {
    let status = IntegrationStatus::try_from(row.status.as_str())
        .map_err(IntegrationRepositoryError::persistence)?;
    let notification_preferences: NotificationPreferences =
        serde_json::from_value(row.notification_preferences)
            .map_err(IntegrationRepositoryError::persistence)?;
    let credentials = Credentials::from_parts(
        row.channel_id,
        SecretValue::new(row.channel_secret),
        row.access_token.map(SecretValue::new),
        row.refresh_token.map(SecretValue::new),
        row.token_expires_at,
    );

    Ok(Integration::from_persisted(PersistedIntegrationData {
        id: IntegrationId::from_uuid(row.id),
        owner: AccountId::from_uuid(row.owner_id),
        scope: FestivalId::from_uuid(row.festival_id),
        credentials,
        status,
        webhook_url: row.webhook_url,
        last_error: row.last_error,
        last_error_at: row.last_error_at,
        last_webhook_received_at: row.last_webhook_received_at,
        last_sync_at: row.last_sync_at,
        notification_preferences,
        created_at: row.created_at,
        updated_at: row.updated_at,
        version: row.version,
    }))
}
