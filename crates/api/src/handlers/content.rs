//! Handlers shared by every versioned content family (lessons, meetings, news).
//!
//! Each handler is generic over a [`ContentFamily`] and is instantiated per
//! family in `routes::content`, e.g. `get(content::list_published::<Lessons>)`.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use pioneer_core::error::CoreError;
use pioneer_core::publication::{Page, PublicationQuery, Visibility};
use pioneer_core::roles::Actor;
use pioneer_core::types::DbId;
use pioneer_core::versioning::{
    AuditRecord, AuditWorkflow, ReviewDecision, ReviewOutcome, RootState, VersionState,
    VersionStore,
};
use pioneer_db::models::news::{CreateNewsRoot, PublishedNews};
use pioneer_db::models::versioning::{
    AuditHistoryEntry, CreatedRoot, RootSummary, VersionDetail,
};
use pioneer_db::repositories::{Lessons, Meetings, News};
use pioneer_db::store::{PgEntity, PgVersionStore};
use pioneer_events::{PlatformEvent, EVENT_VERSION_REVIEWED};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::{RequireAdmin, RequirePublisher};
use crate::query::{AuditListParams, PageParams, PublishedListParams};
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Family binding
// ---------------------------------------------------------------------------

/// Binds a database entity family to its workflow in [`AppState`].
pub trait ContentFamily: PgEntity + Sized {
    /// Public projection of a published root.
    type Published: Serialize + Send + 'static;

    fn workflow(state: &AppState) -> &AuditWorkflow<PgVersionStore<Self>>;

    fn publications(state: &AppState) -> &dyn PublicationQuery<Item = Self::Published>;

    /// Build the family-specific root columns from the create request.
    fn root_input(actor: &Actor, scope: &RootScope) -> Result<Self::RootInput, CoreError>;
}

fn reject_news_scope(scope: &RootScope) -> Result<(), CoreError> {
    if scope.company_id.is_some() || scope.visible.is_some() {
        return Err(CoreError::Validation(
            "company_id and visible only apply to news".to_string(),
        ));
    }
    Ok(())
}

impl ContentFamily for Lessons {
    type Published = pioneer_core::publication::Published<pioneer_core::lesson::LessonContent>;

    fn workflow(state: &AppState) -> &AuditWorkflow<PgVersionStore<Self>> {
        &state.lessons
    }

    fn publications(state: &AppState) -> &dyn PublicationQuery<Item = Self::Published> {
        state.lessons.store()
    }

    fn root_input(_actor: &Actor, scope: &RootScope) -> Result<(), CoreError> {
        reject_news_scope(scope)
    }
}

impl ContentFamily for Meetings {
    type Published = pioneer_core::publication::Published<pioneer_core::meeting::MeetingContent>;

    fn workflow(state: &AppState) -> &AuditWorkflow<PgVersionStore<Self>> {
        &state.meetings
    }

    fn publications(state: &AppState) -> &dyn PublicationQuery<Item = Self::Published> {
        state.meetings.store()
    }

    fn root_input(_actor: &Actor, scope: &RootScope) -> Result<(), CoreError> {
        reject_news_scope(scope)
    }
}

impl ContentFamily for News {
    type Published = PublishedNews;

    fn workflow(state: &AppState) -> &AuditWorkflow<PgVersionStore<Self>> {
        &state.news
    }

    fn publications(state: &AppState) -> &dyn PublicationQuery<Item = Self::Published> {
        state.news.store()
    }

    /// Company users publish into their own company; admins may target any
    /// company or none (platform-wide news).
    fn root_input(actor: &Actor, scope: &RootScope) -> Result<CreateNewsRoot, CoreError> {
        let company_id = match (scope.company_id, actor.role.is_admin()) {
            (requested, true) => requested,
            (None, false) => actor.company_id,
            (Some(requested), false) if actor.company_id == Some(requested) => Some(requested),
            (Some(_), false) => {
                return Err(CoreError::Forbidden(
                    "News can only be published for your own company".to_string(),
                ))
            }
        };
        Ok(CreateNewsRoot {
            company_id,
            visible: scope.visible.unwrap_or(true),
        })
    }
}

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// Root-level options accepted on creation. Only news uses them.
#[derive(Debug, Default, Deserialize)]
pub struct RootScope {
    pub company_id: Option<DbId>,
    pub visible: Option<bool>,
}

/// Request body for `POST /{family}`: the first version plus root options.
#[derive(Debug, Deserialize)]
pub struct CreateRootRequest<C> {
    pub content: C,
    #[serde(default)]
    pub company_id: Option<DbId>,
    #[serde(default)]
    pub visible: Option<bool>,
}

/// Request body for `POST /admin/{family}/{id}/versions/{version_id}/review`.
#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    pub decision: ReviewDecision,
    pub comments: Option<String>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Load a root the caller owns (or any root for admins).
async fn owned_root<E: ContentFamily>(
    state: &AppState,
    root_id: DbId,
    user: &AuthUser,
) -> AppResult<RootState> {
    let store = E::workflow(state).store();
    let root = store.find_root(root_id).await?;
    if !user.actor().owns_or_admin(root.owner_id) {
        return Err(AppError::Core(CoreError::Forbidden(format!(
            "You do not own {} {root_id}",
            store.kind()
        ))));
    }
    Ok(root)
}

fn publish_reviewed_event<E: ContentFamily>(
    state: &AppState,
    root_id: DbId,
    auditor_id: DbId,
    outcome: &ReviewOutcome,
) {
    state.event_bus.publish(
        PlatformEvent::new(EVENT_VERSION_REVIEWED)
            .with_source(E::TABLES.kind, root_id)
            .with_actor(auditor_id)
            .with_payload(serde_json::json!({
                "version_id": outcome.version.id,
                "version": outcome.version.version,
                "status": outcome.version.status,
                "audit_status": outcome.audit.audit_status,
                "archived_version_id": outcome.archived_version_id,
            })),
    );
}

// ---------------------------------------------------------------------------
// Public reads
// ---------------------------------------------------------------------------

/// GET /api/v1/{family}
///
/// Published roots matching the filters, newest first. Anonymous callers are
/// allowed; news visibility depends on the caller.
pub async fn list_published<E: ContentFamily>(
    State(state): State<AppState>,
    user: Option<AuthUser>,
    Query(params): Query<PublishedListParams>,
) -> AppResult<Json<DataResponse<Page<E::Published>>>> {
    let viewer = user.map(|u| u.actor());
    let filter = params
        .filter(Visibility::for_viewer(viewer.as_ref()))
        .validated()?;
    let page = E::publications(&state)
        .list_published(&filter, params.request())
        .await?;
    Ok(Json(DataResponse::new(page)))
}

/// GET /api/v1/{family}/{id}
///
/// The current version of one published root.
pub async fn published_detail<E: ContentFamily>(
    State(state): State<AppState>,
    user: Option<AuthUser>,
    Path(root_id): Path<DbId>,
) -> AppResult<Json<DataResponse<E::Published>>> {
    let viewer = user.map(|u| u.actor());
    let item = E::publications(&state)
        .published_detail(root_id, Visibility::for_viewer(viewer.as_ref()))
        .await?;
    Ok(Json(DataResponse::new(item)))
}

// ---------------------------------------------------------------------------
// Owner operations
// ---------------------------------------------------------------------------

/// POST /api/v1/{family}
///
/// Create a root with its first draft version.
pub async fn create_root<E: ContentFamily>(
    State(state): State<AppState>,
    RequirePublisher(user): RequirePublisher,
    Json(input): Json<CreateRootRequest<E::Content>>,
) -> AppResult<(StatusCode, Json<DataResponse<CreatedRoot>>)> {
    let scope = RootScope {
        company_id: input.company_id,
        visible: input.visible,
    };
    let root_input = E::root_input(&user.actor(), &scope)?;
    let created = E::workflow(&state)
        .store()
        .create_root(user.user_id, &root_input, &input.content)
        .await?;
    Ok((StatusCode::CREATED, Json(DataResponse::new(created))))
}

/// GET /api/v1/{family}/mine
///
/// The caller's own roots in every status.
pub async fn list_mine<E: ContentFamily>(
    State(state): State<AppState>,
    RequirePublisher(user): RequirePublisher,
    Query(params): Query<PageParams>,
) -> AppResult<Json<DataResponse<Page<RootSummary>>>> {
    let page = E::workflow(&state)
        .store()
        .list_roots(Some(user.user_id), false, params.request())
        .await?;
    Ok(Json(DataResponse::new(page)))
}

/// GET /api/v1/{family}/{id}/versions
pub async fn list_versions<E: ContentFamily>(
    State(state): State<AppState>,
    user: AuthUser,
    Path(root_id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<VersionState>>>> {
    owned_root::<E>(&state, root_id, &user).await?;
    let versions = E::workflow(&state).store().list_versions(root_id).await?;
    Ok(Json(DataResponse::new(versions)))
}

/// GET /api/v1/{family}/{id}/versions/{version_id}
pub async fn version_detail<E: ContentFamily>(
    State(state): State<AppState>,
    user: AuthUser,
    Path((root_id, version_id)): Path<(DbId, DbId)>,
) -> AppResult<Json<DataResponse<VersionDetail<E::Content>>>> {
    owned_root::<E>(&state, root_id, &user).await?;
    let detail = E::workflow(&state)
        .store()
        .version_detail(root_id, version_id)
        .await?;
    Ok(Json(DataResponse::new(detail)))
}

/// POST /api/v1/{family}/{id}/versions
///
/// Store an edit as a new draft version.
pub async fn create_version<E: ContentFamily>(
    State(state): State<AppState>,
    RequirePublisher(user): RequirePublisher,
    Path(root_id): Path<DbId>,
    Json(content): Json<E::Content>,
) -> AppResult<(StatusCode, Json<DataResponse<VersionState>>)> {
    let version = E::workflow(&state)
        .draft(root_id, &content, &user.actor())
        .await?;
    Ok((StatusCode::CREATED, Json(DataResponse::new(version))))
}

/// POST /api/v1/{family}/{id}/versions/{version_id}/submit
pub async fn submit_version<E: ContentFamily>(
    State(state): State<AppState>,
    RequirePublisher(user): RequirePublisher,
    Path((root_id, version_id)): Path<(DbId, DbId)>,
) -> AppResult<StatusCode> {
    E::workflow(&state)
        .submit(root_id, version_id, &user.actor())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/{family}/{id}/audit-history
///
/// Review decisions for every version of the root, newest first.
pub async fn root_audit_history<E: ContentFamily>(
    State(state): State<AppState>,
    user: AuthUser,
    Path(root_id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<AuditRecord>>>> {
    owned_root::<E>(&state, root_id, &user).await?;
    let history = E::workflow(&state).store().audit_history(root_id).await?;
    Ok(Json(DataResponse::new(history)))
}

/// DELETE /api/v1/{family}/{id}
///
/// Soft-delete the root and all its versions.
pub async fn delete_root<E: ContentFamily>(
    State(state): State<AppState>,
    user: AuthUser,
    Path(root_id): Path<DbId>,
) -> AppResult<StatusCode> {
    owned_root::<E>(&state, root_id, &user).await?;
    E::workflow(&state).store().soft_delete_root(root_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Administration
// ---------------------------------------------------------------------------

/// GET /api/v1/admin/{family}/pending
///
/// Roots with a version awaiting review.
pub async fn pending_queue<E: ContentFamily>(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(params): Query<PageParams>,
) -> AppResult<Json<DataResponse<Page<RootSummary>>>> {
    let page = E::workflow(&state)
        .store()
        .list_roots(None, true, params.request())
        .await?;
    Ok(Json(DataResponse::new(page)))
}

/// POST /api/v1/admin/{family}/{id}/versions/{version_id}/review
pub async fn review_version<E: ContentFamily>(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path((root_id, version_id)): Path<(DbId, DbId)>,
    Json(input): Json<ReviewRequest>,
) -> AppResult<Json<DataResponse<ReviewOutcome>>> {
    let outcome = E::workflow(&state)
        .review(
            root_id,
            version_id,
            &admin.actor(),
            input.decision,
            input.comments,
        )
        .await?;
    publish_reviewed_event::<E>(&state, root_id, admin.user_id, &outcome);
    Ok(Json(DataResponse::new(outcome)))
}

/// POST /api/v1/admin/{family}/{id}/publish
///
/// Create, submit and approve a version in one step.
pub async fn publish_directly<E: ContentFamily>(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(root_id): Path<DbId>,
    Json(content): Json<E::Content>,
) -> AppResult<Json<DataResponse<ReviewOutcome>>> {
    let outcome = E::workflow(&state)
        .publish_as_admin(root_id, &content, &admin.actor())
        .await?;
    publish_reviewed_event::<E>(&state, root_id, admin.user_id, &outcome);
    Ok(Json(DataResponse::new(outcome)))
}

/// GET /api/v1/admin/{family}/audit-history
pub async fn list_audit_history<E: ContentFamily>(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(params): Query<AuditListParams>,
) -> AppResult<Json<DataResponse<Page<AuditHistoryEntry>>>> {
    let page = E::workflow(&state)
        .store()
        .list_audit_history(&params.query(), params.request())
        .await?;
    Ok(Json(DataResponse::new(page)))
}

/// DELETE /api/v1/admin/{family}/audit-history/{audit_id}
pub async fn delete_audit_entry<E: ContentFamily>(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(audit_id): Path<DbId>,
) -> AppResult<StatusCode> {
    E::workflow(&state)
        .store()
        .soft_delete_audit(audit_id)
        .await?;
    tracing::info!(
        entity = %E::TABLES.kind,
        audit_id,
        admin_id = admin.user_id,
        "Audit entry soft-deleted",
    );
    Ok(StatusCode::NO_CONTENT)
}
