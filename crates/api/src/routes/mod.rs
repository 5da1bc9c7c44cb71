pub mod admin;
pub mod auth;
pub mod company;
pub mod content;
pub mod health;
pub mod notifications;

use axum::routing::get;
use axum::Router;
use pioneer_db::repositories::{Lessons, Meetings, News};

use crate::handlers;
use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /auth/register, /auth/login, /auth/refresh, /auth/logout
///
/// /users/me                                   current user: read, update (auth)
/// /company/users[/{id}[/remove]]              members of the caller's company
///
/// /lessons, /meetings, /news                  published listing + owner workflow
///   /{id}/versions[/{version_id}[/submit]]
///   /{id}/audit-history
/// /news/{id}/visibility                       show/hide (owner/admin)
/// /meetings/{id}/participants[/{pid}/review]  apply, list and decide
/// /meetings/participations, /applications     own applications, creator queue
///
/// /notifications                              caller's inbox
///
/// /admin/users, /admin/companies              administration
/// /admin/notifications/announcements          broadcast
/// /admin/{lessons,meetings,news}              review queue, review, direct
///   /pending                                  publication, audit ledger
///   /{id}/versions/{version_id}/review
///   /{id}/publish
///   /audit-history[/{audit_id}]
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .route(
            "/users/me",
            get(handlers::users::me).put(handlers::users::update_me),
        )
        .nest("/company", company::router())
        .nest("/lessons", content::router::<Lessons>())
        .nest("/meetings", content::meetings_router())
        .nest("/news", content::news_router())
        .nest("/notifications", notifications::router())
        .nest("/admin", admin::router())
        .nest("/admin/lessons", content::admin_router::<Lessons>())
        .nest("/admin/meetings", content::admin_router::<Meetings>())
        .nest("/admin/news", content::admin_router::<News>())
}
