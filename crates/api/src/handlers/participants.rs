//! Meeting participation: applying to a published meeting and the creator's
//! review of the applications.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use pioneer_core::error::CoreError;
use pioneer_core::participation::{
    clean_note, ensure_can_review, ensure_pending, ParticipationStatus, MAX_JOIN_REASON_LEN,
    MAX_REVIEW_COMMENT_LEN,
};
use pioneer_core::publication::Page;
use pioneer_core::types::DbId;
use pioneer_core::versioning::{ReviewDecision, RootState, VersionStore};
use pioneer_db::models::participant::{CreateParticipant, MeetingParticipant, ParticipantReview};
use pioneer_db::repositories::{ParticipantRepo, ParticipantScope};
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequirePublisher;
use crate::query::ParticipantParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for `POST /meetings/{id}/participants`.
#[derive(Debug, Default, Deserialize)]
pub struct JoinRequest {
    pub join_reason: Option<String>,
}

/// Request body for `POST /meetings/{id}/participants/{participant_id}/review`.
#[derive(Debug, Deserialize)]
pub struct ParticipantReviewRequest {
    pub decision: ReviewDecision,
    pub comment: Option<String>,
}

/// A live meeting root; `published` additionally requires a current version.
async fn meeting_root(state: &AppState, meeting_id: DbId, published: bool) -> AppResult<RootState> {
    let root = state.meetings.store().find_root(meeting_id).await?;
    if published && root.current_version_id.is_none() {
        return Err(AppError::Core(CoreError::not_found("meeting", meeting_id)));
    }
    Ok(root)
}

/// POST /api/v1/meetings/{id}/participants
///
/// Apply to attend a published meeting. One application per user and meeting.
pub async fn join(
    State(state): State<AppState>,
    user: AuthUser,
    Path(meeting_id): Path<DbId>,
    Json(input): Json<JoinRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<MeetingParticipant>>)> {
    let root = meeting_root(&state, meeting_id, true).await?;
    if root.owner_id == user.user_id {
        return Err(AppError::BadRequest(
            "Meeting creators cannot apply to their own meeting".into(),
        ));
    }
    let join_reason = clean_note("join_reason", input.join_reason, MAX_JOIN_REASON_LEN)?;

    let participant = ParticipantRepo::create(
        &state.pool,
        &CreateParticipant {
            meeting_id,
            user_id: user.user_id,
            join_reason,
        },
    )
    .await?;

    tracing::info!(
        meeting_id,
        participant_id = participant.id,
        user_id = user.user_id,
        "Meeting application submitted",
    );
    Ok((StatusCode::CREATED, Json(DataResponse::new(participant))))
}

/// GET /api/v1/meetings/participations
///
/// The caller's own applications, newest first.
pub async fn list_mine(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<ParticipantParams>,
) -> AppResult<Json<DataResponse<Page<MeetingParticipant>>>> {
    let page = params.request();
    let (items, total) = ParticipantRepo::list(
        &state.pool,
        ParticipantScope::Applicant(user.user_id),
        params.status,
        page,
    )
    .await?;
    Ok(Json(DataResponse::new(Page::new(items, total, page))))
}

/// GET /api/v1/meetings/applications
///
/// Applications to every meeting the caller created, optionally by status.
pub async fn list_for_creator(
    State(state): State<AppState>,
    RequirePublisher(user): RequirePublisher,
    Query(params): Query<ParticipantParams>,
) -> AppResult<Json<DataResponse<Page<MeetingParticipant>>>> {
    let page = params.request();
    let (items, total) = ParticipantRepo::list(
        &state.pool,
        ParticipantScope::Creator(user.user_id),
        params.status,
        page,
    )
    .await?;
    Ok(Json(DataResponse::new(Page::new(items, total, page))))
}

/// GET /api/v1/meetings/{id}/participants
pub async fn list_for_meeting(
    State(state): State<AppState>,
    user: AuthUser,
    Path(meeting_id): Path<DbId>,
    Query(params): Query<ParticipantParams>,
) -> AppResult<Json<DataResponse<Page<MeetingParticipant>>>> {
    let root = meeting_root(&state, meeting_id, false).await?;
    ensure_can_review(&user.actor(), root.owner_id)?;

    let page = params.request();
    let (items, total) = ParticipantRepo::list(
        &state.pool,
        ParticipantScope::Meeting(meeting_id),
        params.status,
        page,
    )
    .await?;
    Ok(Json(DataResponse::new(Page::new(items, total, page))))
}

/// POST /api/v1/meetings/{id}/participants/{participant_id}/review
///
/// Approve or reject a pending application. Creator or admin only.
pub async fn review(
    State(state): State<AppState>,
    user: AuthUser,
    Path((meeting_id, participant_id)): Path<(DbId, DbId)>,
    Json(input): Json<ParticipantReviewRequest>,
) -> AppResult<Json<DataResponse<MeetingParticipant>>> {
    let root = meeting_root(&state, meeting_id, false).await?;
    ensure_can_review(&user.actor(), root.owner_id)?;
    let comment = clean_note("comment", input.comment, MAX_REVIEW_COMMENT_LEN)?;

    let current = ParticipantRepo::find(&state.pool, meeting_id, participant_id)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::not_found("meeting_participant", participant_id)))?;
    ensure_pending(participant_id, current.status)?;

    let status = ParticipationStatus::from(input.decision);
    let decided = ParticipantRepo::review(
        &state.pool,
        participant_id,
        &ParticipantReview {
            status,
            comment,
            reviewer_id: user.user_id,
        },
    )
    .await?
    .ok_or_else(|| {
        AppError::Core(CoreError::Conflict(format!(
            "Application {participant_id} was decided concurrently"
        )))
    })?;

    tracing::info!(
        meeting_id,
        participant_id,
        status = %status,
        reviewer_id = user.user_id,
        "Meeting application reviewed",
    );
    Ok(Json(DataResponse::new(decided)))
}
