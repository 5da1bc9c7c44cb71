//! Handlers for the caller's inbox and admin announcements.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use pioneer_core::error::CoreError;
use pioneer_core::notification::ReadFilter;
use pioneer_core::publication::Page;
use pioneer_core::types::DbId;
use pioneer_db::models::notification::{InboxItem, Notification};
use pioneer_db::repositories::NotificationRepo;
use pioneer_events::Announcement;
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::middleware::rbac::{RequireAdmin, RequireAuth};
use crate::query::InboxParams;
use crate::response::{CountResponse, DataResponse};
use crate::state::AppState;

/// Response of `POST /admin/notifications/announcements`.
#[derive(Debug, Serialize)]
pub struct AnnouncementResponse {
    pub notification: Notification,
    pub recipients: usize,
}

/// Response of `POST /notifications/read-all`.
#[derive(Debug, Serialize)]
pub struct MarkAllReadResponse {
    pub updated: u64,
}

fn notification_not_found(id: DbId) -> AppError {
    AppError::Core(CoreError::not_found("notification", id))
}

/// GET /api/v1/notifications?status=all|unread|read
pub async fn list(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Query(params): Query<InboxParams>,
) -> AppResult<Json<DataResponse<Page<InboxItem>>>> {
    let page = params.request();
    let (items, total) = NotificationRepo::list_for_user(
        &state.pool,
        user.user_id,
        params.status.unwrap_or(ReadFilter::All),
        page,
    )
    .await?;
    Ok(Json(DataResponse::new(Page::new(items, total, page))))
}

/// GET /api/v1/notifications/{id}
pub async fn get(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<InboxItem>>> {
    let item = NotificationRepo::find_for_user(&state.pool, id, user.user_id)
        .await?
        .ok_or_else(|| notification_not_found(id))?;
    Ok(Json(DataResponse::new(item)))
}

/// GET /api/v1/notifications/unread-count
pub async fn unread_count(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> AppResult<Json<DataResponse<CountResponse>>> {
    let count = NotificationRepo::unread_count(&state.pool, user.user_id).await?;
    Ok(Json(DataResponse::new(CountResponse { count })))
}

/// POST /api/v1/notifications/{id}/read
///
/// Idempotent: marking an already-read notification keeps its original `read_at`.
pub async fn mark_read(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    if !NotificationRepo::mark_read(&state.pool, id, user.user_id).await? {
        return Err(notification_not_found(id));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/notifications/read-all
pub async fn mark_all_read(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> AppResult<Json<DataResponse<MarkAllReadResponse>>> {
    let updated = NotificationRepo::mark_all_read(&state.pool, user.user_id).await?;
    Ok(Json(DataResponse::new(MarkAllReadResponse { updated })))
}

/// DELETE /api/v1/notifications/{id}
///
/// Removes the notification from the caller's inbox only.
pub async fn delete(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    if !NotificationRepo::soft_delete(&state.pool, id, user.user_id).await? {
        return Err(notification_not_found(id));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/admin/notifications/announcements
pub async fn announce(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(input): Json<Announcement>,
) -> AppResult<(StatusCode, Json<DataResponse<AnnouncementResponse>>)> {
    let (notification, recipients) = state.announcer.broadcast(admin.user_id, &input).await?;
    Ok((
        StatusCode::CREATED,
        Json(DataResponse::new(AnnouncementResponse {
            notification,
            recipients,
        })),
    ))
}
