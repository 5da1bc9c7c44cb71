//! Repository for `lesson_versions`, `lesson_resources` and published lessons.

use std::collections::HashMap;

use async_trait::async_trait;
use pioneer_core::error::CoreError;
use pioneer_core::lesson::{LessonContent, LessonResource};
use pioneer_core::publication::{
    Page, PageRequest, PublicationFilter, PublicationQuery, Published, Visibility,
};
use pioneer_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::filter::{bind_values, bind_values_scalar, BindValue};
use crate::models::lesson::{LessonResourceRow, LessonVersionRow, PublishedLessonRow};
use crate::models::versioning::{RootPointerRow, VersionStateRow};
use crate::repositories::version_state_repo::{VersionStateRepo, VersionTables, LESSON_TABLES};
use crate::store::{map_db_error, published_filter, PgEntity, PgVersionStore};

const CONTENT_COLUMNS: &str = "id, name, description, image_url, author_name, sort_order";

const RESOURCE_COLUMNS: &str = "id, lesson_version_id, name, url, kind, sort_order";

const PUBLISHED_COLUMNS: &str = "r.id AS root_id, r.uuid AS root_uuid, r.publisher_id AS owner_id, \
     v.id AS version_id, v.version, v.name, v.description, v.image_url, v.author_name, \
     v.sort_order, COALESCE(r.published_at, v.created_at) AS published_at, \
     r.created_at, r.updated_at";

const SEARCH_COLUMNS: &[&str] = &["name", "description", "author_name"];

/// Marker selecting the lesson tables for [`PgVersionStore`].
pub struct Lessons;

/// Version store over the lesson tables.
pub type LessonStore = PgVersionStore<Lessons>;

/// Provides content queries for lesson versions.
pub struct LessonRepo;

impl LessonRepo {
    /// Insert a version row and its resources inside the caller's transaction.
    pub async fn insert_version(
        conn: &mut PgConnection,
        lesson_id: DbId,
        number: i32,
        content: &LessonContent,
        creator_id: DbId,
    ) -> Result<VersionStateRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO lesson_versions \
                 (lesson_id, version, name, description, image_url, author_name, sort_order, creator_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {}",
            LESSON_TABLES.version_columns()
        );
        let row = sqlx::query_as::<_, VersionStateRow>(&query)
            .bind(lesson_id)
            .bind(number)
            .bind(&content.name)
            .bind(&content.description)
            .bind(&content.image_url)
            .bind(&content.author_name)
            .bind(content.sort_order)
            .bind(creator_id)
            .fetch_one(&mut *conn)
            .await?;

        for resource in &content.resources {
            sqlx::query(
                "INSERT INTO lesson_resources (lesson_version_id, name, url, kind, sort_order) \
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(row.id)
            .bind(&resource.name)
            .bind(&resource.url)
            .bind(resource.kind.as_str())
            .bind(resource.sort_order)
            .execute(&mut *conn)
            .await?;
        }
        Ok(row)
    }

    /// Content of one version, resources included.
    pub async fn find_content(
        pool: &PgPool,
        version_id: DbId,
    ) -> Result<Option<LessonContent>, sqlx::Error> {
        let query = format!(
            "SELECT {CONTENT_COLUMNS} FROM lesson_versions WHERE id = $1 AND deleted_at IS NULL"
        );
        let Some(row) = sqlx::query_as::<_, LessonVersionRow>(&query)
            .bind(version_id)
            .fetch_optional(pool)
            .await?
        else {
            return Ok(None);
        };
        let mut resources = Self::resources_for_versions(pool, &[row.id]).await?;
        let resources = resources.remove(&row.id).unwrap_or_default();
        Ok(Some(row.into_content(resources)))
    }

    /// Resources of several versions, grouped by version ID in display order.
    pub async fn resources_for_versions(
        pool: &PgPool,
        version_ids: &[DbId],
    ) -> Result<HashMap<DbId, Vec<LessonResource>>, sqlx::Error> {
        if version_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let query = format!(
            "SELECT {RESOURCE_COLUMNS} FROM lesson_resources \
             WHERE lesson_version_id = ANY($1) \
             ORDER BY lesson_version_id, sort_order, id"
        );
        let rows = sqlx::query_as::<_, LessonResourceRow>(&query)
            .bind(version_ids)
            .fetch_all(pool)
            .await?;

        let mut grouped: HashMap<DbId, Vec<LessonResource>> = HashMap::new();
        for row in rows {
            grouped
                .entry(row.lesson_version_id)
                .or_default()
                .push(row.into());
        }
        Ok(grouped)
    }

    /// Published lessons matching `filter`, newest publication first.
    pub async fn list_published(
        pool: &PgPool,
        filter: &PublicationFilter,
        page: PageRequest,
    ) -> Result<(Vec<Published<LessonContent>>, i64), sqlx::Error> {
        let f = published_filter(&LESSON_TABLES, SEARCH_COLUMNS, false, filter);
        let from = format!(
            "FROM lessons r JOIN lesson_versions v ON v.id = r.current_version_id {}",
            f.where_clause()
        );
        let limit_idx = f.next_index();
        let query = format!(
            "SELECT {PUBLISHED_COLUMNS} {from} \
             ORDER BY COALESCE(r.published_at, v.created_at) DESC, r.id DESC \
             LIMIT ${limit_idx} OFFSET ${}",
            limit_idx + 1
        );
        let rows = bind_values(sqlx::query_as::<_, PublishedLessonRow>(&query), f.binds())
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(pool)
            .await?;

        let count_query = format!("SELECT COUNT(*) {from}");
        let total = bind_values_scalar(sqlx::query_scalar::<_, i64>(&count_query), f.binds())
            .fetch_one(pool)
            .await?;

        Ok((Self::attach_resources(pool, rows).await?, total))
    }

    /// One published lesson, or `None` if it has no current version.
    pub async fn find_published(
        pool: &PgPool,
        root_id: DbId,
    ) -> Result<Option<Published<LessonContent>>, sqlx::Error> {
        let mut f = published_filter(&LESSON_TABLES, SEARCH_COLUMNS, false, &Default::default());
        f.push("r.id = {}", BindValue::BigInt(root_id));
        let query = format!(
            "SELECT {PUBLISHED_COLUMNS} \
             FROM lessons r JOIN lesson_versions v ON v.id = r.current_version_id {}",
            f.where_clause()
        );
        let rows = bind_values(sqlx::query_as::<_, PublishedLessonRow>(&query), f.binds())
            .fetch_all(pool)
            .await?;
        Ok(Self::attach_resources(pool, rows).await?.pop())
    }

    async fn attach_resources(
        pool: &PgPool,
        rows: Vec<PublishedLessonRow>,
    ) -> Result<Vec<Published<LessonContent>>, sqlx::Error> {
        let ids: Vec<DbId> = rows.iter().map(|r| r.version_id).collect();
        let mut resources = Self::resources_for_versions(pool, &ids).await?;
        Ok(rows
            .into_iter()
            .map(|row| {
                let own = resources.remove(&row.version_id).unwrap_or_default();
                row.into_published(own)
            })
            .collect())
    }
}

#[async_trait]
impl PgEntity for Lessons {
    type Content = LessonContent;
    type RootInput = ();

    const TABLES: VersionTables = LESSON_TABLES;

    async fn insert_root(
        conn: &mut PgConnection,
        owner_id: DbId,
        _input: &(),
    ) -> Result<RootPointerRow, sqlx::Error> {
        VersionStateRepo::insert_root(conn, &LESSON_TABLES, owner_id).await
    }

    async fn insert_version(
        conn: &mut PgConnection,
        root_id: DbId,
        number: i32,
        content: &LessonContent,
        author_id: DbId,
    ) -> Result<VersionStateRow, sqlx::Error> {
        LessonRepo::insert_version(conn, root_id, number, content, author_id).await
    }

    async fn load_content(
        pool: &PgPool,
        version_id: DbId,
    ) -> Result<Option<LessonContent>, sqlx::Error> {
        LessonRepo::find_content(pool, version_id).await
    }
}

#[async_trait]
impl PublicationQuery for PgVersionStore<Lessons> {
    type Item = Published<LessonContent>;

    async fn list_published(
        &self,
        filter: &PublicationFilter,
        page: PageRequest,
    ) -> Result<Page<Self::Item>, CoreError> {
        let (items, total) = LessonRepo::list_published(self.pool(), filter, page)
            .await
            .map_err(|e| map_db_error(LESSON_TABLES.kind, e))?;
        Ok(Page::new(items, total, page))
    }

    async fn published_detail(
        &self,
        root_id: DbId,
        _visibility: Visibility,
    ) -> Result<Self::Item, CoreError> {
        LessonRepo::find_published(self.pool(), root_id)
            .await
            .map_err(|e| map_db_error(LESSON_TABLES.kind, e))?
            .ok_or_else(|| CoreError::not_found("lesson", root_id))
    }
}
