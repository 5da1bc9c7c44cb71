//! Meeting participation models.

use pioneer_core::participation::ParticipationStatus;
use pioneer_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `meeting_participants` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MeetingParticipant {
    pub id: DbId,
    pub uuid: uuid::Uuid,
    pub meeting_id: DbId,
    pub user_id: DbId,
    pub join_reason: Option<String>,
    #[sqlx(try_from = "String")]
    pub status: ParticipationStatus,
    pub review_comment: Option<String>,
    pub reviewed_by: Option<DbId>,
    pub reviewed_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for a new application.
#[derive(Debug, Clone)]
pub struct CreateParticipant {
    pub meeting_id: DbId,
    pub user_id: DbId,
    pub join_reason: Option<String>,
}

/// The decision applied to a pending application.
#[derive(Debug, Clone)]
pub struct ParticipantReview {
    pub status: ParticipationStatus,
    pub comment: Option<String>,
    pub reviewer_id: DbId,
}
