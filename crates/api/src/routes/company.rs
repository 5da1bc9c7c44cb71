//! Route definitions for the `/company` resource.

use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::company_users;
use crate::state::AppState;

/// Routes mounted at `/company`.
///
/// All routes require a company account (enforced by handler extractors) and
/// only ever touch members of the caller's own company.
///
/// ```text
/// GET    /users              -> company_users::list
/// POST   /users              -> company_users::create
/// PUT    /users/{id}         -> company_users::update
/// DELETE /users/{id}         -> company_users::delete
/// POST   /users/{id}/remove  -> company_users::remove
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", get(company_users::list).post(company_users::create))
        .route(
            "/users/{id}",
            put(company_users::update).delete(company_users::delete),
        )
        .route("/users/{id}/remove", post(company_users::remove))
}
