//! Meeting rows.

use pioneer_core::meeting::MeetingContent;
use pioneer_core::publication::Published;
use pioneer_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// Content columns of a `meeting_versions` row.
#[derive(Debug, Clone, FromRow)]
pub struct MeetingVersionRow {
    pub id: DbId,
    pub name: String,
    pub description: Option<String>,
    pub cover_image_url: Option<String>,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
}

impl From<MeetingVersionRow> for MeetingContent {
    fn from(row: MeetingVersionRow) -> Self {
        MeetingContent {
            name: row.name,
            description: row.description,
            cover_image_url: row.cover_image_url,
            start_time: row.start_time,
            end_time: row.end_time,
        }
    }
}

/// A meeting joined with its current version.
#[derive(Debug, Clone, FromRow)]
pub struct PublishedMeetingRow {
    pub root_id: DbId,
    pub root_uuid: uuid::Uuid,
    pub owner_id: DbId,
    pub version_id: DbId,
    pub version: i32,
    pub name: String,
    pub description: Option<String>,
    pub cover_image_url: Option<String>,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    pub published_at: Timestamp,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<PublishedMeetingRow> for Published<MeetingContent> {
    fn from(row: PublishedMeetingRow) -> Self {
        Published {
            root_id: row.root_id,
            root_uuid: row.root_uuid,
            owner_id: row.owner_id,
            version_id: row.version_id,
            version: row.version,
            content: MeetingContent {
                name: row.name,
                description: row.description,
                cover_image_url: row.cover_image_url,
                start_time: row.start_time,
                end_time: row.end_time,
            },
            published_at: row.published_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
