//! Applications to attend a published meeting.
//!
//! A user applies once per meeting. The application starts `pending` and is
//! decided exactly once by the meeting's creator (or an admin).

use crate::error::CoreError;
use crate::roles::Actor;
use crate::types::DbId;
use crate::validation::validate_max_len;
use crate::versioning::ReviewDecision;

pub const MAX_JOIN_REASON_LEN: usize = 1000;
pub const MAX_REVIEW_COMMENT_LEN: usize = 1000;

define_text_enum! {
    /// Where an application to attend a meeting stands.
    ParticipationStatus {
        Pending = "pending",
        Approved = "approved",
        Rejected = "rejected",
    }
}

impl From<ReviewDecision> for ParticipationStatus {
    fn from(decision: ReviewDecision) -> Self {
        match decision {
            ReviewDecision::Approve => ParticipationStatus::Approved,
            ReviewDecision::Reject => ParticipationStatus::Rejected,
        }
    }
}

/// Trim an optional free-text field, dropping it when blank.
pub fn clean_note(
    field: &str,
    value: Option<String>,
    max: usize,
) -> Result<Option<String>, CoreError> {
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());
    if let Some(ref text) = value {
        validate_max_len(field, text, max)?;
    }
    Ok(value)
}

/// Only the meeting's creator or an admin sees and decides its applications.
pub fn ensure_can_review(actor: &Actor, creator_id: DbId) -> Result<(), CoreError> {
    if !actor.owns_or_admin(creator_id) {
        return Err(CoreError::Forbidden(
            "Only the meeting's creator may manage its participants".to_string(),
        ));
    }
    Ok(())
}

/// An application is decided once.
pub fn ensure_pending(participant_id: DbId, status: ParticipationStatus) -> Result<(), CoreError> {
    if status != ParticipationStatus::Pending {
        return Err(CoreError::InvalidState(format!(
            "Application {participant_id} was already {status}"
        )));
    }
    Ok(())
}
