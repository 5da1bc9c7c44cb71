//! Notification models.

use pioneer_core::notification::NotificationKind;
use pioneer_core::types::{DbId, Timestamp};
use pioneer_core::versioning::EntityKind;
use serde::Serialize;
use sqlx::postgres::PgRow;
use sqlx::{FromRow, Row};

/// A row from the `notifications` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Notification {
    pub id: DbId,
    pub uuid: uuid::Uuid,
    pub sender_id: Option<DbId>,
    #[sqlx(try_from = "String")]
    pub kind: NotificationKind,
    pub title: String,
    pub body: String,
    pub created_at: Timestamp,
}

/// DTO for inserting a notification.
#[derive(Debug, Clone)]
pub struct CreateNotification {
    pub sender_id: Option<DbId>,
    pub kind: NotificationKind,
    pub title: String,
    pub body: String,
    pub related_type: Option<EntityKind>,
    pub related_id: Option<DbId>,
}

/// A notification as seen in one recipient's inbox.
#[derive(Debug, Clone, Serialize)]
pub struct InboxItem {
    pub id: DbId,
    pub uuid: uuid::Uuid,
    pub sender_id: Option<DbId>,
    pub kind: NotificationKind,
    pub title: String,
    pub body: String,
    pub related_type: Option<EntityKind>,
    pub related_id: Option<DbId>,
    pub is_read: bool,
    pub read_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

fn decode_text<T>(row: &PgRow, column: &str) -> Result<Option<T>, sqlx::Error>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: Option<String> = row.try_get(column)?;
    raw.map(|s| s.parse::<T>())
        .transpose()
        .map_err(|e| sqlx::Error::ColumnDecode {
            index: column.to_string(),
            source: Box::new(e),
        })
}

impl<'r> FromRow<'r, PgRow> for InboxItem {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let kind = decode_text::<NotificationKind>(row, "kind")?.ok_or_else(|| {
            sqlx::Error::ColumnDecode {
                index: "kind".to_string(),
                source: "notification kind is NULL".into(),
            }
        })?;
        let read_at: Option<Timestamp> = row.try_get("read_at")?;
        Ok(InboxItem {
            id: row.try_get("id")?,
            uuid: row.try_get("uuid")?,
            sender_id: row.try_get("sender_id")?,
            kind,
            title: row.try_get("title")?,
            body: row.try_get("body")?,
            related_type: decode_text::<EntityKind>(row, "related_type")?,
            related_id: row.try_get("related_id")?,
            is_read: read_at.is_some(),
            read_at,
            created_at: row.try_get("created_at")?,
        })
    }
}
