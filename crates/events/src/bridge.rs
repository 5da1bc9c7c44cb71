//! Persistent notification delivery.

use std::sync::Arc;

use async_trait::async_trait;
use pioneer_core::error::CoreError;
use pioneer_core::notification::{
    validate_announcement, validate_audience, Audience, Notice, NotificationBridge,
    NotificationKind,
};
use pioneer_core::types::DbId;
use pioneer_db::models::notification::{CreateNotification, Notification};
use pioneer_db::repositories::NotificationRepo;
use pioneer_db::DbPool;
use serde::Deserialize;

use crate::bus::{EventBus, PlatformEvent, EVENT_NOTIFICATION_CREATED};

fn db_error(err: sqlx::Error) -> CoreError {
    tracing::error!(error = %err, "Notification query failed");
    CoreError::Internal(format!("Database error: {err}"))
}

fn created_event(notification: &Notification, recipients: &[DbId]) -> PlatformEvent {
    let mut event = PlatformEvent::new(EVENT_NOTIFICATION_CREATED).with_payload(serde_json::json!({
        "notification_id": notification.id,
        "kind": notification.kind,
        "title": notification.title,
        "recipients": recipients,
    }));
    if let Some(sender) = notification.sender_id {
        event = event.with_actor(sender);
    }
    event
}

/// Writes review notices to the inbox tables and announces them on the bus.
#[derive(Clone)]
pub struct PgNotificationBridge {
    pool: DbPool,
    bus: Arc<EventBus>,
}

impl PgNotificationBridge {
    pub fn new(pool: DbPool, bus: Arc<EventBus>) -> Self {
        Self { pool, bus }
    }
}

#[async_trait]
impl NotificationBridge for PgNotificationBridge {
    async fn notify(&self, notice: Notice) -> Result<(), CoreError> {
        let input = CreateNotification {
            sender_id: None,
            kind: notice.kind,
            title: notice.title,
            body: notice.body,
            related_type: notice.related_type,
            related_id: notice.related_id,
        };
        let notification =
            NotificationRepo::create_for_recipient(&self.pool, &input, notice.recipient_id)
                .await
                .map_err(db_error)?;

        let mut event = created_event(&notification, &[notice.recipient_id]);
        if let (Some(kind), Some(id)) = (notice.related_type, notice.related_id) {
            event = event.with_source(kind, id);
        }
        self.bus.publish(event);

        tracing::debug!(
            notification_id = notification.id,
            recipient_id = notice.recipient_id,
            kind = %notification.kind,
            "Notification delivered",
        );
        Ok(())
    }
}

/// Request body of an admin announcement.
#[derive(Debug, Clone, Deserialize)]
pub struct Announcement {
    pub title: String,
    pub body: String,
    pub audience: Audience,
    pub company_id: Option<DbId>,
}

/// Sends admin announcements.
#[derive(Clone)]
pub struct Announcer {
    pool: DbPool,
    bus: Arc<EventBus>,
}

impl Announcer {
    pub fn new(pool: DbPool, bus: Arc<EventBus>) -> Self {
        Self { pool, bus }
    }

    /// Deliver `announcement` to its audience. Returns the notification and
    /// how many users received it.
    pub async fn broadcast(
        &self,
        sender_id: DbId,
        announcement: &Announcement,
    ) -> Result<(Notification, usize), CoreError> {
        let title = announcement.title.trim();
        let body = announcement.body.trim();
        validate_announcement(title, body)?;
        validate_audience(announcement.audience, announcement.company_id)?;

        let input = CreateNotification {
            sender_id: Some(sender_id),
            kind: NotificationKind::Announcement,
            title: title.to_string(),
            body: body.to_string(),
            related_type: None,
            related_id: None,
        };
        let company = match announcement.audience {
            Audience::All => None,
            Audience::Company => announcement.company_id,
        };
        let (notification, recipients) =
            NotificationRepo::create_broadcast(&self.pool, &input, company)
                .await
                .map_err(db_error)?;

        self.bus.publish(created_event(&notification, &recipients));
        tracing::info!(
            notification_id = notification.id,
            sender_id,
            audience = %announcement.audience,
            company_id = ?company,
            recipients = recipients.len(),
            "Announcement sent",
        );
        Ok((notification, recipients.len()))
    }
}
