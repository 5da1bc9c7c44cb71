//! Notification vocabulary and the `NotificationBridge` seam.
//!
//! The workflow only knows the bridge trait; persistence and fan-out live in
//! the events crate.

use async_trait::async_trait;
use serde::Serialize;

use crate::error::CoreError;
use crate::types::DbId;
use crate::validation::validate_required;
use crate::versioning::status::{AuditStatus, EntityKind};

pub const MAX_TITLE_LEN: usize = 200;
pub const MAX_BODY_LEN: usize = 5000;

define_text_enum! {
    /// Why a notification was sent.
    NotificationKind {
        ReviewApproved = "review_approved",
        ReviewRejected = "review_rejected",
        Announcement = "announcement",
    }
}

define_text_enum! {
    /// Recipients of an admin announcement.
    Audience {
        All = "all",
        Company = "company",
    }
}

define_text_enum! {
    /// Read-state filter for an inbox listing.
    ReadFilter {
        All = "all",
        Unread = "unread",
        Read = "read",
    }
}

/// A notification addressed to a single recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub recipient_id: DbId,
    pub kind: NotificationKind,
    pub title: String,
    pub body: String,
    pub related_type: Option<EntityKind>,
    pub related_id: Option<DbId>,
}

impl Notice {
    /// Build the notice sent to a version's creator after a review decision.
    pub fn review_decision(
        recipient_id: DbId,
        entity: EntityKind,
        root_id: DbId,
        label: &str,
        status: AuditStatus,
        comments: Option<&str>,
    ) -> Self {
        let name = entity.display_name();
        let (kind, title, body) = match status {
            AuditStatus::Approved => (
                NotificationKind::ReviewApproved,
                format!("{name} approved"),
                format!("Your {} \"{label}\" has passed review.", entity.as_str()),
            ),
            AuditStatus::Rejected => (
                NotificationKind::ReviewRejected,
                format!("{name} not approved"),
                format!(
                    "Your {} \"{label}\" did not pass review. Reason: {}",
                    entity.as_str(),
                    comments.filter(|c| !c.trim().is_empty()).unwrap_or("none")
                ),
            ),
        };
        Self {
            recipient_id,
            kind,
            title,
            body,
            related_type: Some(entity),
            related_id: Some(root_id),
        }
    }
}

/// Validate an announcement title and body.
pub fn validate_announcement(title: &str, body: &str) -> Result<(), CoreError> {
    validate_required("title", title, MAX_TITLE_LEN)?;
    validate_required("body", body, MAX_BODY_LEN)
}

/// Validate the audience/company pairing of an announcement.
pub fn validate_audience(audience: Audience, company_id: Option<DbId>) -> Result<(), CoreError> {
    match (audience, company_id) {
        (Audience::Company, None) => Err(CoreError::Validation(
            "company_id is required for a company announcement".to_string(),
        )),
        (Audience::All, Some(_)) => Err(CoreError::Validation(
            "company_id must be omitted for an announcement to all users".to_string(),
        )),
        _ => Ok(()),
    }
}

/// Delivers notices on behalf of the workflow.
///
/// Delivery is best-effort: callers log a returned error and carry on.
#[async_trait]
pub trait NotificationBridge: Send + Sync {
    async fn notify(&self, notice: Notice) -> Result<(), CoreError>;
}
