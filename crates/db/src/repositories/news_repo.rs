//! Repository for `news`, `news_versions` and published news.
//!
//! News roots carry an optional owning company and a `visible` flag; hidden
//! items are only listed to admins and members of that company.

use async_trait::async_trait;
use pioneer_core::error::CoreError;
use pioneer_core::news::NewsContent;
use pioneer_core::publication::{
    Page, PageRequest, PublicationFilter, PublicationQuery, Visibility,
};
use pioneer_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::filter::{bind_values, bind_values_scalar, BindValue};
use crate::models::news::{CreateNewsRoot, NewsScope, NewsVersionRow, PublishedNews, PublishedNewsRow};
use crate::models::versioning::{RootPointerRow, VersionStateRow};
use crate::repositories::version_state_repo::{VersionTables, NEWS_TABLES};
use crate::store::{map_db_error, published_filter, PgEntity, PgVersionStore};

const CONTENT_COLUMNS: &str = "id, title, summary, cover_image_url, resource_url";

const PUBLISHED_COLUMNS: &str = "r.id AS root_id, r.uuid AS root_uuid, r.publisher_id AS owner_id, \
     r.company_id, r.visible, v.id AS version_id, v.version, v.title, v.summary, \
     v.cover_image_url, v.resource_url, COALESCE(r.published_at, v.created_at) AS published_at, \
     r.created_at, r.updated_at";

const SEARCH_COLUMNS: &[&str] = &["title", "summary"];

/// Marker selecting the news tables for [`PgVersionStore`].
pub struct News;

/// Version store over the news tables.
pub type NewsStore = PgVersionStore<News>;

/// Provides root scoping and content queries for news.
pub struct NewsRepo;

impl NewsRepo {
    /// Insert an empty news root with its scoping columns.
    pub async fn insert_root(
        conn: &mut PgConnection,
        publisher_id: DbId,
        input: &CreateNewsRoot,
    ) -> Result<RootPointerRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO news (publisher_id, company_id, visible) VALUES ($1, $2, $3) \
             RETURNING {}",
            NEWS_TABLES.root_columns()
        );
        sqlx::query_as::<_, RootPointerRow>(&query)
            .bind(publisher_id)
            .bind(input.company_id)
            .bind(input.visible)
            .fetch_one(conn)
            .await
    }

    /// Insert a version row inside the caller's transaction.
    pub async fn insert_version(
        conn: &mut PgConnection,
        news_id: DbId,
        number: i32,
        content: &NewsContent,
        creator_id: DbId,
    ) -> Result<VersionStateRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO news_versions \
                 (news_id, version, title, summary, cover_image_url, resource_url, creator_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {}",
            NEWS_TABLES.version_columns()
        );
        sqlx::query_as::<_, VersionStateRow>(&query)
            .bind(news_id)
            .bind(number)
            .bind(&content.title)
            .bind(&content.summary)
            .bind(&content.cover_image_url)
            .bind(&content.resource_url)
            .bind(creator_id)
            .fetch_one(conn)
            .await
    }

    /// Content of one version.
    pub async fn find_content(
        pool: &PgPool,
        version_id: DbId,
    ) -> Result<Option<NewsContent>, sqlx::Error> {
        let query = format!(
            "SELECT {CONTENT_COLUMNS} FROM news_versions WHERE id = $1 AND deleted_at IS NULL"
        );
        let row = sqlx::query_as::<_, NewsVersionRow>(&query)
            .bind(version_id)
            .fetch_optional(pool)
            .await?;
        Ok(row.map(NewsContent::from))
    }

    /// Scoping columns of a live root.
    pub async fn find_scope(pool: &PgPool, news_id: DbId) -> Result<Option<NewsScope>, sqlx::Error> {
        sqlx::query_as::<_, NewsScope>(
            "SELECT company_id, visible FROM news WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(news_id)
        .fetch_optional(pool)
        .await
    }

    /// Show or hide a live root. Returns `true` if a row was updated.
    pub async fn set_visible(
        pool: &PgPool,
        news_id: DbId,
        visible: bool,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE news SET visible = $2, updated_at = NOW() \
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(news_id)
        .bind(visible)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Published news matching `filter`, newest publication first.
    pub async fn list_published(
        pool: &PgPool,
        filter: &PublicationFilter,
        page: PageRequest,
    ) -> Result<(Vec<PublishedNews>, i64), sqlx::Error> {
        let f = published_filter(&NEWS_TABLES, SEARCH_COLUMNS, true, filter);
        let from = format!(
            "FROM news r JOIN news_versions v ON v.id = r.current_version_id {}",
            f.where_clause()
        );
        let limit_idx = f.next_index();
        let query = format!(
            "SELECT {PUBLISHED_COLUMNS} {from} \
             ORDER BY COALESCE(r.published_at, v.created_at) DESC, r.id DESC \
             LIMIT ${limit_idx} OFFSET ${}",
            limit_idx + 1
        );
        let rows = bind_values(sqlx::query_as::<_, PublishedNewsRow>(&query), f.binds())
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(pool)
            .await?;

        let count_query = format!("SELECT COUNT(*) {from}");
        let total = bind_values_scalar(sqlx::query_scalar::<_, i64>(&count_query), f.binds())
            .fetch_one(pool)
            .await?;
        Ok((rows.into_iter().map(PublishedNews::from).collect(), total))
    }

    /// One published news item visible under `visibility`.
    pub async fn find_published(
        pool: &PgPool,
        news_id: DbId,
        visibility: Visibility,
    ) -> Result<Option<PublishedNews>, sqlx::Error> {
        let filter = PublicationFilter {
            visibility,
            ..Default::default()
        };
        let mut f = published_filter(&NEWS_TABLES, SEARCH_COLUMNS, true, &filter);
        f.push("r.id = {}", BindValue::BigInt(news_id));
        let query = format!(
            "SELECT {PUBLISHED_COLUMNS} \
             FROM news r JOIN news_versions v ON v.id = r.current_version_id {}",
            f.where_clause()
        );
        let row = bind_values(sqlx::query_as::<_, PublishedNewsRow>(&query), f.binds())
            .fetch_optional(pool)
            .await?;
        Ok(row.map(PublishedNews::from))
    }
}

#[async_trait]
impl PgEntity for News {
    type Content = NewsContent;
    type RootInput = CreateNewsRoot;

    const TABLES: VersionTables = NEWS_TABLES;

    async fn insert_root(
        conn: &mut PgConnection,
        owner_id: DbId,
        input: &CreateNewsRoot,
    ) -> Result<RootPointerRow, sqlx::Error> {
        NewsRepo::insert_root(conn, owner_id, input).await
    }

    async fn insert_version(
        conn: &mut PgConnection,
        root_id: DbId,
        number: i32,
        content: &NewsContent,
        author_id: DbId,
    ) -> Result<VersionStateRow, sqlx::Error> {
        NewsRepo::insert_version(conn, root_id, number, content, author_id).await
    }

    async fn load_content(
        pool: &PgPool,
        version_id: DbId,
    ) -> Result<Option<NewsContent>, sqlx::Error> {
        NewsRepo::find_content(pool, version_id).await
    }
}

#[async_trait]
impl PublicationQuery for PgVersionStore<News> {
    type Item = PublishedNews;

    async fn list_published(
        &self,
        filter: &PublicationFilter,
        page: PageRequest,
    ) -> Result<Page<Self::Item>, CoreError> {
        let (items, total) = NewsRepo::list_published(self.pool(), filter, page)
            .await
            .map_err(|e| map_db_error(NEWS_TABLES.kind, e))?;
        Ok(Page::new(items, total, page))
    }

    async fn published_detail(
        &self,
        root_id: DbId,
        visibility: Visibility,
    ) -> Result<Self::Item, CoreError> {
        NewsRepo::find_published(self.pool(), root_id, visibility)
            .await
            .map_err(|e| map_db_error(NEWS_TABLES.kind, e))?
            .ok_or_else(|| CoreError::not_found("news", root_id))
    }
}
