//! News rows and DTOs.

use pioneer_core::news::NewsContent;
use pioneer_core::publication::Published;
use pioneer_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Content columns of a `news_versions` row.
#[derive(Debug, Clone, FromRow)]
pub struct NewsVersionRow {
    pub id: DbId,
    pub title: String,
    pub summary: Option<String>,
    pub cover_image_url: Option<String>,
    pub resource_url: Option<String>,
}

impl From<NewsVersionRow> for NewsContent {
    fn from(row: NewsVersionRow) -> Self {
        NewsContent {
            title: row.title,
            summary: row.summary,
            cover_image_url: row.cover_image_url,
            resource_url: row.resource_url,
        }
    }
}

/// Scoping columns of a `news` root.
#[derive(Debug, Clone, Copy, FromRow, Serialize)]
pub struct NewsScope {
    pub company_id: Option<DbId>,
    pub visible: bool,
}

/// Root-level settings chosen when news is created.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct CreateNewsRoot {
    pub company_id: Option<DbId>,
    #[serde(default = "default_visible")]
    pub visible: bool,
}

fn default_visible() -> bool {
    true
}

/// A published news item: root scoping plus the current version.
#[derive(Debug, Clone, Serialize)]
pub struct PublishedNews {
    #[serde(flatten)]
    pub published: Published<NewsContent>,
    pub company_id: Option<DbId>,
    pub visible: bool,
}

/// A news root joined with its current version.
#[derive(Debug, Clone, FromRow)]
pub struct PublishedNewsRow {
    pub root_id: DbId,
    pub root_uuid: uuid::Uuid,
    pub owner_id: DbId,
    pub company_id: Option<DbId>,
    pub visible: bool,
    pub version_id: DbId,
    pub version: i32,
    pub title: String,
    pub summary: Option<String>,
    pub cover_image_url: Option<String>,
    pub resource_url: Option<String>,
    pub published_at: Timestamp,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<PublishedNewsRow> for PublishedNews {
    fn from(row: PublishedNewsRow) -> Self {
        PublishedNews {
            published: Published {
                root_id: row.root_id,
                root_uuid: row.root_uuid,
                owner_id: row.owner_id,
                version_id: row.version_id,
                version: row.version,
                content: NewsContent {
                    title: row.title,
                    summary: row.summary,
                    cover_image_url: row.cover_image_url,
                    resource_url: row.resource_url,
                },
                published_at: row.published_at,
                created_at: row.created_at,
                updated_at: row.updated_at,
            },
            company_id: row.company_id,
            visible: row.visible,
        }
    }
}
