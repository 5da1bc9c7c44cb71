//! Route definitions shared by `/lessons`, `/meetings` and `/news`.

use axum::routing::{delete, get, post, put};
use axum::Router;
use pioneer_db::repositories::{Meetings, News};

use crate::handlers::content::{self, ContentFamily};
use crate::handlers::{news, participants};
use crate::state::AppState;

/// Public and owner routes for one content family.
///
/// ```text
/// GET    /                                   -> list_published (anonymous ok)
/// POST   /                                   -> create_root (company/admin)
/// GET    /mine                               -> list_mine (company/admin)
/// GET    /{id}                               -> published_detail (anonymous ok)
/// DELETE /{id}                               -> delete_root (owner/admin)
/// GET    /{id}/versions                      -> list_versions (owner/admin)
/// POST   /{id}/versions                      -> create_version (owner/admin)
/// GET    /{id}/versions/{version_id}         -> version_detail (owner/admin)
/// POST   /{id}/versions/{version_id}/submit  -> submit_version (creator/admin)
/// GET    /{id}/audit-history                 -> root_audit_history (owner/admin)
/// ```
pub fn router<E: ContentFamily>() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(content::list_published::<E>).post(content::create_root::<E>),
        )
        .route("/mine", get(content::list_mine::<E>))
        .route(
            "/{id}",
            get(content::published_detail::<E>).delete(content::delete_root::<E>),
        )
        .route(
            "/{id}/versions",
            get(content::list_versions::<E>).post(content::create_version::<E>),
        )
        .route(
            "/{id}/versions/{version_id}",
            get(content::version_detail::<E>),
        )
        .route(
            "/{id}/versions/{version_id}/submit",
            post(content::submit_version::<E>),
        )
        .route("/{id}/audit-history", get(content::root_audit_history::<E>))
}

/// `/news` additionally exposes `PUT /{id}/visibility`.
pub fn news_router() -> Router<AppState> {
    router::<News>().route("/{id}/visibility", put(news::set_visibility))
}

/// `/meetings` additionally handles participation.
///
/// ```text
/// GET  /participations                                  -> list_mine (auth)
/// GET  /applications                                    -> list_for_creator (company/admin)
/// GET  /{id}/participants                               -> list_for_meeting (creator/admin)
/// POST /{id}/participants                               -> join (auth)
/// POST /{id}/participants/{participant_id}/review       -> review (creator/admin)
/// ```
pub fn meetings_router() -> Router<AppState> {
    router::<Meetings>()
        .route("/participations", get(participants::list_mine))
        .route("/applications", get(participants::list_for_creator))
        .route(
            "/{id}/participants",
            get(participants::list_for_meeting).post(participants::join),
        )
        .route(
            "/{id}/participants/{participant_id}/review",
            post(participants::review),
        )
}

/// Review routes for one content family, mounted under `/admin`.
///
/// ```text
/// GET    /pending                                 -> pending_queue
/// POST   /{id}/versions/{version_id}/review       -> review_version
/// POST   /{id}/publish                            -> publish_directly
/// GET    /audit-history                           -> list_audit_history
/// DELETE /audit-history/{audit_id}                -> delete_audit_entry
/// ```
pub fn admin_router<E: ContentFamily>() -> Router<AppState> {
    Router::new()
        .route("/pending", get(content::pending_queue::<E>))
        .route(
            "/{id}/versions/{version_id}/review",
            post(content::review_version::<E>),
        )
        .route("/{id}/publish", post(content::publish_directly::<E>))
        .route("/audit-history", get(content::list_audit_history::<E>))
        .route(
            "/audit-history/{audit_id}",
            delete(content::delete_audit_entry::<E>),
        )
}
