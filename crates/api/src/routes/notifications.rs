//! Route definitions for the `/notifications` resource.
//!
//! All endpoints require authentication and only touch the caller's inbox.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::notifications;
use crate::state::AppState;

/// Routes mounted at `/notifications`.
///
/// ```text
/// GET    /               -> list (?status=all|unread|read)
/// POST   /read-all       -> mark_all_read
/// GET    /unread-count   -> unread_count
/// GET    /{id}           -> get
/// DELETE /{id}           -> delete
/// POST   /{id}/read      -> mark_read
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(notifications::list))
        .route("/read-all", post(notifications::mark_all_read))
        .route("/unread-count", get(notifications::unread_count))
        .route(
            "/{id}",
            get(notifications::get).delete(notifications::delete),
        )
        .route("/{id}/read", post(notifications::mark_read))
}
