//! Lesson rows: version content, resources and the published view.

use pioneer_core::lesson::{LessonContent, LessonResource, ResourceKind};
use pioneer_core::publication::Published;
use pioneer_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// Content columns of a `lesson_versions` row.
#[derive(Debug, Clone, FromRow)]
pub struct LessonVersionRow {
    pub id: DbId,
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub author_name: Option<String>,
    pub sort_order: i32,
}

impl LessonVersionRow {
    pub fn into_content(self, resources: Vec<LessonResource>) -> LessonContent {
        LessonContent {
            name: self.name,
            description: self.description,
            image_url: self.image_url,
            author_name: self.author_name,
            sort_order: self.sort_order,
            resources,
        }
    }
}

/// A row from the `lesson_resources` table.
#[derive(Debug, Clone, FromRow)]
pub struct LessonResourceRow {
    pub id: DbId,
    pub lesson_version_id: DbId,
    pub name: String,
    pub url: String,
    #[sqlx(try_from = "String")]
    pub kind: ResourceKind,
    pub sort_order: i32,
}

impl From<LessonResourceRow> for LessonResource {
    fn from(row: LessonResourceRow) -> Self {
        LessonResource {
            name: row.name,
            url: row.url,
            kind: row.kind,
            sort_order: row.sort_order,
        }
    }
}

/// A lesson joined with its current version.
#[derive(Debug, Clone, FromRow)]
pub struct PublishedLessonRow {
    pub root_id: DbId,
    pub root_uuid: uuid::Uuid,
    pub owner_id: DbId,
    pub version_id: DbId,
    pub version: i32,
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub author_name: Option<String>,
    pub sort_order: i32,
    pub published_at: Timestamp,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl PublishedLessonRow {
    pub fn into_published(self, resources: Vec<LessonResource>) -> Published<LessonContent> {
        Published {
            root_id: self.root_id,
            root_uuid: self.root_uuid,
            owner_id: self.owner_id,
            version_id: self.version_id,
            version: self.version,
            content: LessonContent {
                name: self.name,
                description: self.description,
                image_url: self.image_url,
                author_name: self.author_name,
                sort_order: self.sort_order,
                resources,
            },
            published_at: self.published_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}
