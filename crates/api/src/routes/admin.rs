//! Route definitions for the `/admin` resource.

use axum::routing::{delete, get, post, put};
use axum::Router;

use crate::handlers::{companies, notifications, users};
use crate::state::AppState;

/// Routes mounted at `/admin`.
///
/// All routes require the `admin` role (enforced by handler extractors).
///
/// ```text
/// GET    /users                        -> users::list
/// POST   /users                        -> users::create
/// DELETE /users/{id}                   -> users::delete
/// PUT    /users/{id}/role              -> users::update_role
/// GET    /companies                    -> companies::list
/// POST   /companies                    -> companies::create
/// GET    /companies/{id}               -> companies::get
/// PUT    /companies/{id}               -> companies::update
/// DELETE /companies/{id}               -> companies::delete
/// PUT    /companies/{id}/status        -> companies::set_status
/// POST   /notifications/announcements  -> notifications::announce
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", get(users::list).post(users::create))
        .route("/users/{id}", delete(users::delete))
        .route("/users/{id}/role", put(users::update_role))
        .route("/companies", get(companies::list).post(companies::create))
        .route(
            "/companies/{id}",
            get(companies::get)
                .put(companies::update)
                .delete(companies::delete),
        )
        .route("/companies/{id}/status", put(companies::set_status))
        .route(
            "/notifications/announcements",
            post(notifications::announce),
        )
}
