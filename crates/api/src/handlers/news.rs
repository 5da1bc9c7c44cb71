//! News-only handlers. The shared version workflow lives in `content`.

use axum::extract::{Path, State};
use axum::Json;
use pioneer_core::error::CoreError;
use pioneer_core::types::DbId;
use pioneer_core::versioning::VersionStore;
use pioneer_db::models::news::NewsScope;
use pioneer_db::repositories::NewsRepo;
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for `PUT /news/{id}/visibility`.
#[derive(Debug, Deserialize)]
pub struct VisibilityRequest {
    pub visible: bool,
}

/// PUT /api/v1/news/{id}/visibility
///
/// Show or hide a news item outside its company. Owner or admin only.
pub async fn set_visibility(
    State(state): State<AppState>,
    user: AuthUser,
    Path(news_id): Path<DbId>,
    Json(input): Json<VisibilityRequest>,
) -> AppResult<Json<DataResponse<NewsScope>>> {
    let root = state.news.store().find_root(news_id).await?;
    if !user.actor().owns_or_admin(root.owner_id) {
        return Err(AppError::Core(CoreError::Forbidden(format!(
            "You do not own news {news_id}"
        ))));
    }

    if !NewsRepo::set_visible(&state.pool, news_id, input.visible).await? {
        return Err(AppError::Core(CoreError::not_found("news", news_id)));
    }
    let scope = NewsRepo::find_scope(&state.pool, news_id)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::not_found("news", news_id)))?;

    tracing::info!(news_id, visible = input.visible, user_id = user.user_id, "News visibility changed");
    Ok(Json(DataResponse::new(scope)))
}
