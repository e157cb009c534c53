//! Per-test databases created from the repository migrations.

use chrono::{DateTime, TimeZone, Utc};
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use eyre::WrapErr;
use rstest::fixture;
use std::sync::Arc;
use tasklink::clock::FixedClock;
use tasklink::integration::{
    adapters::postgres::PostgresIntegrationRepository,
    domain::{AccountId, Integration, NewIntegration, NotificationPreferences, SecretValue},
    ports::IntegrationRepository,
};
use tasklink::persistence::{PgPool, build_pool};
use tasklink::task::domain::FestivalId;

/// Variable naming the server the tests may create databases on.
pub const DATABASE_URL_ENV: &str = "TASKLINK_TEST_DATABASE_URL";

const MIGRATIONS: [&str; 3] = [
    include_str!("../../migrations/2026-07-01-000000_create_integrations/up.sql"),
    include_str!("../../migrations/2026-07-01-000001_create_messages_and_tasks/up.sql"),
    include_str!("../../migrations/2026-07-01-000002_create_jobs/up.sql"),
];

/// A migrated database dropped when the value goes out of scope.
pub struct TestDatabase {
    admin_url: String,
    name: String,
    pub pool: PgPool,
}

impl TestDatabase {
    /// Creates and migrates a fresh database, or returns `None` when no
    /// server is configured.
    ///
    /// # Errors
    ///
    /// Returns an error when the database cannot be created or migrated.
    pub fn create() -> eyre::Result<Option<Self>> {
        let Ok(admin_url) = std::env::var(DATABASE_URL_ENV) else {
            return Ok(None);
        };
        let name = format!("tasklink_test_{}", uuid::Uuid::new_v4().simple());
        let mut admin = PgConnection::establish(&admin_url).wrap_err("connect to admin database")?;
        diesel::sql_query(format!("CREATE DATABASE \"{name}\""))
            .execute(&mut admin)
            .wrap_err("create test database")?;

        let url = database_url(&admin_url, &name);
        let mut connection = PgConnection::establish(&url).wrap_err("connect to test database")?;
        for migration in MIGRATIONS {
            connection
                .batch_execute(migration)
                .wrap_err("apply migration")?;
        }
        let pool = build_pool(&url, 4).wrap_err("build pool")?;
        Ok(Some(Self {
            admin_url,
            name,
            pool,
        }))
    }
}

impl Drop for TestDatabase {
    fn drop(&mut self) {
        if let Ok(mut admin) = PgConnection::establish(&self.admin_url) {
            let dropped = diesel::sql_query(format!(
                "DROP DATABASE IF EXISTS \"{}\" WITH (FORCE)",
                self.name
            ))
            .execute(&mut admin);
            drop(dropped);
        }
    }
}

/// Swaps the database name in a `postgres://` URL.
fn database_url(base: &str, name: &str) -> String {
    let (without_query, query) = base
        .split_once('?')
        .map_or((base, None), |(head, tail)| (head, Some(tail)));
    let server = without_query
        .rsplit_once('/')
        .map_or(without_query, |(head, _)| head);
    match query {
        Some(params) => format!("{server}/{name}?{params}"),
        None => format!("{server}/{name}"),
    }
}

/// Fresh database, when a server is configured.
#[fixture]
pub fn database() -> Option<TestDatabase> {
    TestDatabase::create().expect("test database created")
}

/// 2026-07-10 12:00 in Tokyo; microsecond precision matches `timestamptz`.
#[must_use]
pub fn noon() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 7, 10, 3, 0, 0)
        .single()
        .unwrap_or_default()
}

/// Clock pinned at [`noon`].
#[fixture]
pub fn clock() -> Arc<FixedClock> {
    Arc::new(FixedClock::new(noon()))
}

/// Stores a draft integration for rows that reference one.
///
/// # Errors
///
/// Returns an error when the integration cannot be stored.
pub async fn stored_integration(db: &TestDatabase, clock: &FixedClock) -> eyre::Result<Integration> {
    let integration = Integration::new(
        NewIntegration {
            owner: AccountId::new(),
            scope: FestivalId::new(),
            channel_id: format!("channel-{}", uuid::Uuid::new_v4().simple()),
            channel_secret: SecretValue::new("channel-secret"),
            webhook_url: None,
            preferences: NotificationPreferences::default(),
        },
        clock,
    )?;
    PostgresIntegrationRepository::new(db.pool.clone())
        .store(&integration)
        .await?;
    Ok(integration)
}

#[cfg(test)]
mod tests {
    use super::database_url;
    use rstest::rstest;

    #[rstest]
    #[case("postgres://u:p@localhost:5432/postgres", "postgres://u:p@localhost:5432/t1")]
    #[case(
        "postgres://localhost/postgres?sslmode=disable",
        "postgres://localhost/t1?sslmode=disable"
    )]
    fn database_name_is_replaced(#[case] base: &str, #[case] expected: &str) {
        assert_eq!(database_url(base, "t1"), expected);
    }
}
