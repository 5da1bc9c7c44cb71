//! Repository for `meeting_versions` and published meetings.

use async_trait::async_trait;
use pioneer_core::error::CoreError;
use pioneer_core::meeting::MeetingContent;
use pioneer_core::publication::{
    Page, PageRequest, PublicationFilter, PublicationQuery, Published, Visibility,
};
use pioneer_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::filter::{bind_values, bind_values_scalar, BindValue};
use crate::models::meeting::{MeetingVersionRow, PublishedMeetingRow};
use crate::models::versioning::{RootPointerRow, VersionStateRow};
use crate::repositories::version_state_repo::{VersionStateRepo, VersionTables, MEETING_TABLES};
use crate::store::{map_db_error, published_filter, PgEntity, PgVersionStore};

const CONTENT_COLUMNS: &str = "id, name, description, cover_image_url, start_time, end_time";

const PUBLISHED_COLUMNS: &str = "r.id AS root_id, r.uuid AS root_uuid, r.creator_id AS owner_id, \
     v.id AS version_id, v.version, v.name, v.description, v.cover_image_url, \
     v.start_time, v.end_time, COALESCE(r.published_at, v.created_at) AS published_at, \
     r.created_at, r.updated_at";

const SEARCH_COLUMNS: &[&str] = &["name", "description"];

/// Marker selecting the meeting tables for [`PgVersionStore`].
pub struct Meetings;

/// Version store over the meeting tables.
pub type MeetingStore = PgVersionStore<Meetings>;

/// Provides content queries for meeting versions.
pub struct MeetingRepo;

impl MeetingRepo {
    /// Insert a version row inside the caller's transaction.
    pub async fn insert_version(
        conn: &mut PgConnection,
        meeting_id: DbId,
        number: i32,
        content: &MeetingContent,
        creator_id: DbId,
    ) -> Result<VersionStateRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO meeting_versions \
                 (meeting_id, version, name, description, cover_image_url, start_time, end_time, creator_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {}",
            MEETING_TABLES.version_columns()
        );
        sqlx::query_as::<_, VersionStateRow>(&query)
            .bind(meeting_id)
            .bind(number)
            .bind(&content.name)
            .bind(&content.description)
            .bind(&content.cover_image_url)
            .bind(content.start_time)
            .bind(content.end_time)
            .bind(creator_id)
            .fetch_one(conn)
            .await
    }

    /// Content of one version.
    pub async fn find_content(
        pool: &PgPool,
        version_id: DbId,
    ) -> Result<Option<MeetingContent>, sqlx::Error> {
        let query = format!(
            "SELECT {CONTENT_COLUMNS} FROM meeting_versions WHERE id = $1 AND deleted_at IS NULL"
        );
        let row = sqlx::query_as::<_, MeetingVersionRow>(&query)
            .bind(version_id)
            .fetch_optional(pool)
            .await?;
        Ok(row.map(MeetingContent::from))
    }

    /// Published meetings matching `filter`, newest publication first.
    pub async fn list_published(
        pool: &PgPool,
        filter: &PublicationFilter,
        page: PageRequest,
    ) -> Result<(Vec<Published<MeetingContent>>, i64), sqlx::Error> {
        let f = published_filter(&MEETING_TABLES, SEARCH_COLUMNS, false, filter);
        let from = format!(
            "FROM meetings r JOIN meeting_versions v ON v.id = r.current_version_id {}",
            f.where_clause()
        );
        let limit_idx = f.next_index();
        let query = format!(
            "SELECT {PUBLISHED_COLUMNS} {from} \
             ORDER BY COALESCE(r.published_at, v.created_at) DESC, r.id DESC \
             LIMIT ${limit_idx} OFFSET ${}",
            limit_idx + 1
        );
        let rows = bind_values(sqlx::query_as::<_, PublishedMeetingRow>(&query), f.binds())
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(pool)
            .await?;

        let count_query = format!("SELECT COUNT(*) {from}");
        let total = bind_values_scalar(sqlx::query_scalar::<_, i64>(&count_query), f.binds())
            .fetch_one(pool)
            .await?;
        Ok((rows.into_iter().map(Published::from).collect(), total))
    }

    /// One published meeting, or `None` if it has no current version.
    pub async fn find_published(
        pool: &PgPool,
        root_id: DbId,
    ) -> Result<Option<Published<MeetingContent>>, sqlx::Error> {
        let mut f = published_filter(&MEETING_TABLES, SEARCH_COLUMNS, false, &Default::default());
        f.push("r.id = {}", BindValue::BigInt(root_id));
        let query = format!(
            "SELECT {PUBLISHED_COLUMNS} \
             FROM meetings r JOIN meeting_versions v ON v.id = r.current_version_id {}",
            f.where_clause()
        );
        let row = bind_values(sqlx::query_as::<_, PublishedMeetingRow>(&query), f.binds())
            .fetch_optional(pool)
            .await?;
        Ok(row.map(Published::from))
    }
}

#[async_trait]
impl PgEntity for Meetings {
    type Content = MeetingContent;
    type RootInput = ();

    const TABLES: VersionTables = MEETING_TABLES;

    async fn insert_root(
        conn: &mut PgConnection,
        owner_id: DbId,
        _input: &(),
    ) -> Result<RootPointerRow, sqlx::Error> {
        VersionStateRepo::insert_root(conn, &MEETING_TABLES, owner_id).await
    }

    async fn insert_version(
        conn: &mut PgConnection,
        root_id: DbId,
        number: i32,
        content: &MeetingContent,
        author_id: DbId,
    ) -> Result<VersionStateRow, sqlx::Error> {
        MeetingRepo::insert_version(conn, root_id, number, content, author_id).await
    }

    async fn load_content(
        pool: &PgPool,
        version_id: DbId,
    ) -> Result<Option<MeetingContent>, sqlx::Error> {
        MeetingRepo::find_content(pool, version_id).await
    }
}

#[async_trait]
impl PublicationQuery for PgVersionStore<Meetings> {
    type Item = Published<MeetingContent>;

    async fn list_published(
        &self,
        filter: &PublicationFilter,
        page: PageRequest,
    ) -> Result<Page<Self::Item>, CoreError> {
        let (items, total) = MeetingRepo::list_published(self.pool(), filter, page)
            .await
            .map_err(|e| map_db_error(MEETING_TABLES.kind, e))?;
        Ok(Page::new(items, total, page))
    }

    async fn published_detail(
        &self,
        root_id: DbId,
        _visibility: Visibility,
    ) -> Result<Self::Item, CoreError> {
        MeetingRepo::find_published(self.pool(), root_id)
            .await
            .map_err(|e| map_db_error(MEETING_TABLES.kind, e))?
            .ok_or_else(|| CoreError::not_found("meeting", root_id))
    }
}
