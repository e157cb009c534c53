//! Integration and group persistence against `PostgreSQL`.

use std::sync::Arc;

use chrono::NaiveTime;
use mockable::Clock;
use rstest::rstest;
use tasklink::clock::FixedClock;
use tasklink::integration::{
    adapters::postgres::{PostgresGroupRepository, PostgresIntegrationRepository},
    domain::{
        AccountId, Group, Integration, IntegrationStatus, MembershipChange, NewIntegration,
        NotificationPreferences, SecretValue, TokenGrant,
    },
    ports::{GroupRepository, IntegrationRepository, IntegrationRepositoryError},
};
use tasklink::task::domain::FestivalId;

use crate::postgres::helpers::{TestDatabase, clock, database};

fn new_integration(
    owner: AccountId,
    scope: FestivalId,
    channel_id: &str,
    clock: &FixedClock,
) -> Integration {
    Integration::new(
        NewIntegration {
            owner,
            scope,
            channel_id: channel_id.to_owned(),
            channel_secret: SecretValue::new("channel-secret"),
            webhook_url: Some("https://tasklink.example/webhook".to_owned()),
            preferences: NotificationPreferences::default()
                .with_quiet_hours(
                    NaiveTime::from_hms_opt(21, 30, 0).expect("valid time"),
                    NaiveTime::from_hms_opt(7, 0, 0).expect("valid time"),
                )
                .with_time_zone(chrono_tz::Asia::Seoul),
        },
        clock,
    )
    .expect("valid integration")
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn authenticated_integration_reloads_by_channel(
    database: Option<TestDatabase>,
    clock: Arc<FixedClock>,
) {
    let Some(db) = database else { return };
    let repository = PostgresIntegrationRepository::new(db.pool.clone());
    let mut integration = new_integration(AccountId::new(), FestivalId::new(), "1650000000", &clock);
    repository.store(&integration).await.expect("stored");

    integration
        .authenticate(
            TokenGrant {
                access_token: SecretValue::new("access-123"),
                refresh_token: None,
                expires_in_secs: Some(3_600),
            },
            &*clock,
        )
        .expect("connected");
    let updated = repository.update(&integration).await.expect("updated");
    assert_eq!(updated.version(), integration.version() + 1);

    let loaded = repository
        .find_by_channel_id("1650000000")
        .await
        .expect("lookup succeeds")
        .expect("integration stored");
    assert_eq!(loaded, updated);
    assert_eq!(loaded.status(), IntegrationStatus::Connected);
    assert_eq!(
        loaded.notification_preferences().time_zone,
        chrono_tz::Asia::Seoul
    );
    assert_eq!(
        repository
            .list_by_status(IntegrationStatus::Connected)
            .await
            .expect("list succeeds")
            .len(),
        1
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn stale_write_after_disconnect_is_refused(
    database: Option<TestDatabase>,
    clock: Arc<FixedClock>,
) {
    let Some(db) = database else { return };
    let repository = PostgresIntegrationRepository::new(db.pool.clone());
    let integration = new_integration(AccountId::new(), FestivalId::new(), "1650000000", &clock);
    repository.store(&integration).await.expect("stored");
    let mut stale = integration.clone();
    let mut disconnected = integration.clone();
    disconnected.disconnect(&*clock);
    let stored = repository.update(&disconnected).await.expect("updated");

    stale.record_failure("late timeout", &*clock);
    let result = repository.update(&stale).await;
    repository
        .record_webhook_received(integration.id(), clock.utc())
        .await
        .expect("stamp recorded");

    assert!(matches!(
        result,
        Err(IntegrationRepositoryError::Conflict(id)) if id == integration.id()
    ));
    let loaded = repository
        .find_by_id(integration.id())
        .await
        .expect("lookup succeeds")
        .expect("integration stored");
    assert_eq!(loaded.status(), IntegrationStatus::Inactive);
    assert_eq!(loaded.version(), stored.version());
    assert_eq!(loaded.last_webhook_received_at(), Some(clock.utc()));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn second_integration_for_scope_or_channel_is_refused(
    database: Option<TestDatabase>,
    clock: Arc<FixedClock>,
) {
    let Some(db) = database else { return };
    let repository = PostgresIntegrationRepository::new(db.pool.clone());
    let owner = AccountId::new();
    let scope = FestivalId::new();
    repository
        .store(&new_integration(owner, scope, "1650000000", &clock))
        .await
        .expect("stored");

    let same_scope = repository
        .store(&new_integration(owner, scope, "1650000001", &clock))
        .await;
    let same_channel = repository
        .store(&new_integration(AccountId::new(), FestivalId::new(), "1650000000", &clock))
        .await;

    assert!(matches!(
        same_scope,
        Err(IntegrationRepositoryError::DuplicateScope(found)) if found == scope
    ));
    assert!(matches!(
        same_channel,
        Err(IntegrationRepositoryError::DuplicateChannel(channel)) if channel == "1650000000"
    ));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn group_upsert_keeps_one_row_per_platform_group(
    database: Option<TestDatabase>,
    clock: Arc<FixedClock>,
) {
    let Some(db) = database else { return };
    let integrations = PostgresIntegrationRepository::new(db.pool.clone());
    let groups = PostgresGroupRepository::new(db.pool.clone());
    let integration = new_integration(AccountId::new(), FestivalId::new(), "1650000000", &clock);
    integrations.store(&integration).await.expect("stored");

    let mut group = Group::new(integration.id(), "G-crew", &*clock);
    groups.upsert(&group).await.expect("inserted");
    group.refresh_summary(Some("実行委員会".to_owned()), 12, &*clock);
    group.apply(MembershipChange::BotLeft, &*clock);
    let stored = groups.upsert(&group).await.expect("updated");

    let listed = groups
        .list_by_integration(integration.id())
        .await
        .expect("list succeeds");
    assert_eq!(listed.len(), 1);
    assert_eq!(stored.display_name(), Some("実行委員会"));
    assert!(!stored.is_active());
    assert_eq!(stored.member_count(), 12);
}
