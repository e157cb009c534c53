//! `PostgreSQL` repository implementation for chat groups.

use super::{models::GroupRow, schema::chat_groups};
use crate::integration::{
    domain::{Group, GroupId, IntegrationId, PersistedGroupData},
    ports::{GroupRepository, GroupRepositoryError, GroupRepositoryResult},
};
use crate::persistence::{PgPool, get_conn_with, run_blocking_with};
use async_trait::async_trait;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::upsert::excluded;

/// `PostgreSQL`-backed group repository.
#[derive(Debug, Clone)]
pub struct PostgresGroupRepository {
    pool: PgPool,
}

impl PostgresGroupRepository {
    /// Creates a new repository from a `PostgreSQL` connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn run_blocking<F, T>(&self, f: F) -> GroupRepositoryResult<T>
    where
        F: FnOnce(&mut PgConnection) -> GroupRepositoryResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        run_blocking_with(
            move || {
                let mut connection = get_conn_with(&pool, GroupRepositoryError::persistence)?;
                f(&mut connection)
            },
            GroupRepositoryError::persistence,
        )
        .await
    }
}

#[async_trait]
impl GroupRepository for PostgresGroupRepository {
    async fn upsert(&self, group: &Group) -> GroupRepositoryResult<Group> {
        let row = to_row(group)?;
        self.run_blocking(move |connection| {
            let stored = diesel::insert_into(chat_groups::table)
                .values(&row)
                .on_conflict((chat_groups::integration_id, chat_groups::platform_group_id))
                .do_update()
                .set((
                    chat_groups::display_name.eq(excluded(chat_groups::display_name)),
                    chat_groups::is_active.eq(excluded(chat_groups::is_active)),
                    chat_groups::member_count.eq(excluded(chat_groups::member_count)),
                    chat_groups::last_activity_at.eq(excluded(chat_groups::last_activity_at)),
                    chat_groups::updated_at.eq(excluded(chat_groups::updated_at)),
                ))
                .returning(GroupRow::as_returning())
                .get_result::<GroupRow>(connection)
                .map_err(GroupRepositoryError::persistence)?;
            row_to_group(stored)
        })
        .await
    }

    async fn find_by_platform_id(
        &self,
        integration_id: IntegrationId,
        platform_group_id: &str,
    ) -> GroupRepositoryResult<Option<Group>> {
        let platform_id = platform_group_id.to_owned();
        self.run_blocking(move |connection| {
            chat_groups::table
                .filter(chat_groups::integration_id.eq(integration_id.into_inner()))
                .filter(chat_groups::platform_group_id.eq(platform_id))
                .select(GroupRow::as_select())
                .first::<GroupRow>(connection)
                .optional()
                .map_err(GroupRepositoryError::persistence)?
                .map(row_to_group)
                .transpose()
        })
        .await
    }

    async fn list_by_integration(
        &self,
        integration_id: IntegrationId,
    ) -> GroupRepositoryResult<Vec<Group>> {
        self.run_blocking(move |connection| {
            chat_groups::table
                .filter(chat_groups::integration_id.eq(integration_id.into_inner()))
                .order((chat_groups::created_at.asc(), chat_groups::id.asc()))
                .select(GroupRow::as_select())
                .load::<GroupRow>(connection)
                .map_err(GroupRepositoryError::persistence)?
                .into_iter()
                .map(row_to_group)
                .collect()
        })
        .await
    }
}

fn to_row(group: &Group) -> GroupRepositoryResult<GroupRow> {
    Ok(GroupRow {
        id: group.id().into_inner(),
        integration_id: group.integration_id().into_inner(),
        platform_group_id: group.platform_group_id().to_owned(),
        display_name: group.display_name().map(str::to_owned),
        is_active: group.is_active(),
        member_count: i32::try_from(group.member_count())
            .map_err(GroupRepositoryError::persistence)?,
        last_activity_at: group.last_activity_at(),
        created_at: group.created_at(),
        updated_at: group.updated_at(),
    })
}

fn row_to_group(row: GroupRow) -> GroupRepositoryResult<Group> {
    Ok(Group::from_persisted(PersistedGroupData {
        id: GroupId::from_uuid(row.id),
        integration_id: IntegrationId::from_uuid(row.integration_id),
        platform_group_id: row.platform_group_id,
        display_name: row.display_name,
        is_active: row.is_active,
        member_count: u32::try_from(row.member_count)
            .map_err(GroupRepositoryError::persistence)?,
        last_activity_at: row.last_activity_at,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }))
}
