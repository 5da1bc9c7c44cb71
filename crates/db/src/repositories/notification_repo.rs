//! Repository for `notifications` and their per-recipient inbox rows.

use pioneer_core::notification::ReadFilter;
use pioneer_core::publication::PageRequest;
use pioneer_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::models::notification::{CreateNotification, InboxItem, Notification};

/// Column list for `notifications` queries.
const COLUMNS: &str = "id, uuid, sender_id, kind, title, body, created_at";

/// Inbox columns: the notification plus the recipient's read state.
const INBOX_COLUMNS: &str = "n.id, n.uuid, n.sender_id, n.kind, n.title, n.body, \
                             n.related_type, n.related_id, nr.read_at, n.created_at";

/// Provides CRUD operations for notifications.
pub struct NotificationRepo;

impl NotificationRepo {
    async fn insert(
        conn: &mut PgConnection,
        input: &CreateNotification,
    ) -> Result<Notification, sqlx::Error> {
        let query = format!(
            "INSERT INTO notifications (sender_id, kind, title, body, related_type, related_id) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Notification>(&query)
            .bind(input.sender_id)
            .bind(input.kind.as_str())
            .bind(&input.title)
            .bind(&input.body)
            .bind(input.related_type.map(|k| k.as_str()))
            .bind(input.related_id)
            .fetch_one(conn)
            .await
    }

    /// Create a notification addressed to a single user.
    pub async fn create_for_recipient(
        pool: &PgPool,
        input: &CreateNotification,
        recipient_id: DbId,
    ) -> Result<Notification, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let notification = Self::insert(&mut tx, input).await?;
        sqlx::query(
            "INSERT INTO notification_recipients (notification_id, recipient_id) VALUES ($1, $2)",
        )
        .bind(notification.id)
        .bind(recipient_id)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(notification)
    }

    /// Create a notification delivered to every active user, or only to the
    /// members of `company_id`. Returns the notification and its recipient IDs.
    pub async fn create_broadcast(
        pool: &PgPool,
        input: &CreateNotification,
        company_id: Option<DbId>,
    ) -> Result<(Notification, Vec<DbId>), sqlx::Error> {
        let mut tx = pool.begin().await?;
        let notification = Self::insert(&mut tx, input).await?;
        let recipients: Vec<DbId> = sqlx::query_scalar(
            "INSERT INTO notification_recipients (notification_id, recipient_id) \
             SELECT $1, id FROM users \
             WHERE deleted_at IS NULL AND is_active = true \
               AND ($2::BIGINT IS NULL OR company_id = $2) \
             RETURNING recipient_id",
        )
        .bind(notification.id)
        .bind(company_id)
        .fetch_all(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok((notification, recipients))
    }

    /// List a user's live inbox, newest first. Returns the page and the total.
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: DbId,
        read: ReadFilter,
        page: PageRequest,
    ) -> Result<(Vec<InboxItem>, i64), sqlx::Error> {
        let filter = match read {
            ReadFilter::All => "",
            ReadFilter::Unread => "AND nr.read_at IS NULL",
            ReadFilter::Read => "AND nr.read_at IS NOT NULL",
        };
        let from = format!(
            "FROM notification_recipients nr \
             JOIN notifications n ON n.id = nr.notification_id \
             WHERE nr.recipient_id = $1 AND nr.deleted_at IS NULL {filter}"
        );
        let query = format!(
            "SELECT {INBOX_COLUMNS} {from} \
             ORDER BY n.created_at DESC, n.id DESC \
             LIMIT $2 OFFSET $3"
        );
        let items = sqlx::query_as::<_, InboxItem>(&query)
            .bind(user_id)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(pool)
            .await?;

        let count_query = format!("SELECT COUNT(*) {from}");
        let total: i64 = sqlx::query_scalar(&count_query)
            .bind(user_id)
            .fetch_one(pool)
            .await?;
        Ok((items, total))
    }

    /// One inbox entry of a user.
    pub async fn find_for_user(
        pool: &PgPool,
        notification_id: DbId,
        user_id: DbId,
    ) -> Result<Option<InboxItem>, sqlx::Error> {
        let query = format!(
            "SELECT {INBOX_COLUMNS} \
             FROM notification_recipients nr \
             JOIN notifications n ON n.id = nr.notification_id \
             WHERE nr.notification_id = $1 AND nr.recipient_id = $2 AND nr.deleted_at IS NULL"
        );
        sqlx::query_as::<_, InboxItem>(&query)
            .bind(notification_id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Mark one notification as read. Already-read entries keep their first
    /// `read_at`. Returns `false` if the user has no such live entry.
    pub async fn mark_read(
        pool: &PgPool,
        notification_id: DbId,
        user_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE notification_recipients \
             SET read_at = COALESCE(read_at, NOW()) \
             WHERE notification_id = $1 AND recipient_id = $2 AND deleted_at IS NULL",
        )
        .bind(notification_id)
        .bind(user_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Mark all unread notifications as read for a user.
    ///
    /// Returns the number of notifications that were marked read.
    pub async fn mark_all_read(pool: &PgPool, user_id: DbId) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE notification_recipients SET read_at = NOW() \
             WHERE recipient_id = $1 AND read_at IS NULL AND deleted_at IS NULL",
        )
        .bind(user_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Get the number of unread notifications for a user.
    pub async fn unread_count(pool: &PgPool, user_id: DbId) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM notification_recipients \
             WHERE recipient_id = $1 AND read_at IS NULL AND deleted_at IS NULL",
        )
        .bind(user_id)
        .fetch_one(pool)
        .await
    }

    /// Remove a notification from one user's inbox.
    pub async fn soft_delete(
        pool: &PgPool,
        notification_id: DbId,
        user_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE notification_recipients SET deleted_at = NOW() \
             WHERE notification_id = $1 AND recipient_id = $2 AND deleted_at IS NULL",
        )
        .bind(notification_id)
        .bind(user_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
