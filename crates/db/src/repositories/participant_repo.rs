//! Repository for `meeting_participants`.

use pioneer_core::participation::ParticipationStatus;
use pioneer_core::publication::PageRequest;
use pioneer_core::types::DbId;
use sqlx::PgPool;

use crate::models::participant::{CreateParticipant, MeetingParticipant, ParticipantReview};

const COLUMNS: &str = "p.id, p.uuid, p.meeting_id, p.user_id, p.join_reason, p.status, \
                        p.review_comment, p.reviewed_by, p.reviewed_at, p.created_at, p.updated_at";

/// Whose applications a listing covers.
#[derive(Debug, Clone, Copy)]
pub enum ParticipantScope {
    /// Applications to one meeting.
    Meeting(DbId),
    /// Applications to every live meeting created by this user.
    Creator(DbId),
    /// Applications made by this user.
    Applicant(DbId),
}

impl ParticipantScope {
    fn condition(self) -> (&'static str, DbId) {
        match self {
            ParticipantScope::Meeting(id) => ("p.meeting_id = $1", id),
            ParticipantScope::Creator(id) => ("m.creator_id = $1", id),
            ParticipantScope::Applicant(id) => ("p.user_id = $1", id),
        }
    }
}

pub struct ParticipantRepo;

impl ParticipantRepo {
    /// Record an application. A second application by the same user to the
    /// same meeting violates `uq_meeting_participants_pair`.
    pub async fn create(
        pool: &PgPool,
        input: &CreateParticipant,
    ) -> Result<MeetingParticipant, sqlx::Error> {
        let query = format!(
            "INSERT INTO meeting_participants AS p (meeting_id, user_id, join_reason)
             VALUES ($1, $2, $3)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, MeetingParticipant>(&query)
            .bind(input.meeting_id)
            .bind(input.user_id)
            .bind(&input.join_reason)
            .fetch_one(pool)
            .await
    }

    /// One application to `meeting_id`.
    pub async fn find(
        pool: &PgPool,
        meeting_id: DbId,
        participant_id: DbId,
    ) -> Result<Option<MeetingParticipant>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM meeting_participants p WHERE p.id = $1 AND p.meeting_id = $2"
        );
        sqlx::query_as::<_, MeetingParticipant>(&query)
            .bind(participant_id)
            .bind(meeting_id)
            .fetch_optional(pool)
            .await
    }

    /// Applications in `scope`, optionally of one status, newest first.
    /// Applications to soft-deleted meetings are left out.
    pub async fn list(
        pool: &PgPool,
        scope: ParticipantScope,
        status: Option<ParticipationStatus>,
        page: PageRequest,
    ) -> Result<(Vec<MeetingParticipant>, i64), sqlx::Error> {
        let (condition, id) = scope.condition();
        let from = format!(
            "FROM meeting_participants p \
             JOIN meetings m ON m.id = p.meeting_id \
             WHERE {condition} AND m.deleted_at IS NULL \
               AND ($2::TEXT IS NULL OR p.status = $2)"
        );
        let query = format!(
            "SELECT {COLUMNS} {from} \
             ORDER BY p.created_at DESC, p.id DESC \
             LIMIT $3 OFFSET $4"
        );
        let status = status.map(ParticipationStatus::as_str);
        let items = sqlx::query_as::<_, MeetingParticipant>(&query)
            .bind(id)
            .bind(status)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(pool)
            .await?;

        let count_query = format!("SELECT COUNT(*) {from}");
        let total: i64 = sqlx::query_scalar(&count_query)
            .bind(id)
            .bind(status)
            .fetch_one(pool)
            .await?;
        Ok((items, total))
    }

    /// Decide a pending application. Returns `None` when it is no longer
    /// pending, which is what a second, racing decision observes.
    pub async fn review(
        pool: &PgPool,
        participant_id: DbId,
        review: &ParticipantReview,
    ) -> Result<Option<MeetingParticipant>, sqlx::Error> {
        let query = format!(
            "UPDATE meeting_participants AS p
             SET status = $2, review_comment = $3, reviewed_by = $4,
                 reviewed_at = NOW(), updated_at = NOW()
             WHERE p.id = $1 AND p.status = 'pending'
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, MeetingParticipant>(&query)
            .bind(participant_id)
            .bind(review.status.as_str())
            .bind(&review.comment)
            .bind(review.reviewer_id)
            .fetch_optional(pool)
            .await
    }
}
