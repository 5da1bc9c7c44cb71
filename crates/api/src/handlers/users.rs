//! Handlers for `/users/me` and admin user management.
//!
//! Company accounts manage their own members in `company_users`.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use pioneer_core::error::CoreError;
use pioneer_core::publication::Page;
use pioneer_core::roles::Role;
use pioneer_core::types::DbId;
use pioneer_db::models::user::{CreateUser, UserResponse};
use pioneer_db::repositories::{CompanyRepo, SessionRepo, UserRepo};
use serde::Deserialize;
use validator::Validate;

use crate::auth::password::{
    hash_password, validate_password_strength, verify_password, MIN_PASSWORD_LENGTH,
};
use crate::error::{AppError, AppResult};
use crate::handlers::auth::normalize_email;
use crate::middleware::rbac::{RequireAdmin, RequireAuth};
use crate::query::PageParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for `POST /admin/users`.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(email, length(max = 254))]
    pub email: String,
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    pub password: String,
    pub role: Role,
    pub company_id: Option<DbId>,
}

/// Request body for `PUT /users/me`. A password change needs the current one.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateMeRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

/// Request body for `PUT /admin/users/{id}/role`.
#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    pub role: Role,
    pub company_id: Option<DbId>,
}

/// A `company` account must belong to a company.
fn check_membership(role: Role, company_id: Option<DbId>) -> Result<(), CoreError> {
    if role == Role::Company && company_id.is_none() {
        return Err(CoreError::Validation(
            "company_id is required for the company role".to_string(),
        ));
    }
    Ok(())
}

async fn ensure_company_exists(state: &AppState, company_id: Option<DbId>) -> AppResult<()> {
    if let Some(id) = company_id {
        if CompanyRepo::find_by_id(&state.pool, id).await?.is_none() {
            return Err(AppError::Core(CoreError::not_found("company", id)));
        }
    }
    Ok(())
}

/// GET /api/v1/users/me
pub async fn me(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> AppResult<Json<DataResponse<UserResponse>>> {
    let record = UserRepo::find_by_id(&state.pool, user.user_id)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::not_found("user", user.user_id)))?;
    Ok(Json(DataResponse::new(UserResponse::from(&record))))
}

/// PUT /api/v1/users/me
///
/// Rename the caller and/or change its password. A password change revokes
/// every refresh session; access tokens already issued run out on their own.
pub async fn update_me(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(mut input): Json<UpdateMeRequest>,
) -> AppResult<Json<DataResponse<UserResponse>>> {
    input.name = input.name.map(|n| n.trim().to_string());
    input.validate()?;
    let mut record = UserRepo::find_by_id(&state.pool, user.user_id)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::not_found("user", user.user_id)))?;

    if let Some(ref new_password) = input.new_password {
        let current = input.current_password.as_deref().unwrap_or_default();
        let matches = verify_password(current, &record.password_hash)
            .map_err(|e| AppError::InternalError(format!("Password verification error: {e}")))?;
        if !matches {
            return Err(AppError::Core(CoreError::Validation(
                "current_password is incorrect".to_string(),
            )));
        }
        validate_password_strength(new_password, MIN_PASSWORD_LENGTH)
            .map_err(|msg| AppError::Core(CoreError::Validation(msg)))?;
        let password_hash = hash_password(new_password)
            .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;
        UserRepo::update_password(&state.pool, user.user_id, &password_hash).await?;
        let revoked = SessionRepo::revoke_all_for_user(&state.pool, user.user_id).await?;
        tracing::info!(user_id = user.user_id, revoked, "Password changed");
    }
    if let Some(ref name) = input.name {
        record = UserRepo::update_name(&state.pool, user.user_id, name)
            .await?
            .ok_or_else(|| AppError::Core(CoreError::not_found("user", user.user_id)))?;
    }
    Ok(Json(DataResponse::new(UserResponse::from(&record))))
}

/// GET /api/v1/admin/users
pub async fn list(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(params): Query<PageParams>,
) -> AppResult<Json<DataResponse<Page<UserResponse>>>> {
    let page = params.request();
    let (users, total) = UserRepo::list(&state.pool, page).await?;
    let items = users.iter().map(UserResponse::from).collect();
    Ok(Json(DataResponse::new(Page::new(items, total, page))))
}

/// POST /api/v1/admin/users
pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(mut input): Json<CreateUserRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<UserResponse>>)> {
    input.email = normalize_email(&input.email);
    input.name = input.name.trim().to_string();
    input.validate()?;
    validate_password_strength(&input.password, MIN_PASSWORD_LENGTH)
        .map_err(|msg| AppError::Core(CoreError::Validation(msg)))?;
    check_membership(input.role, input.company_id)?;
    ensure_company_exists(&state, input.company_id).await?;

    let password_hash = hash_password(&input.password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;

    let user = UserRepo::create(
        &state.pool,
        &CreateUser {
            email: input.email,
            name: input.name,
            password_hash,
            role: input.role,
            company_id: input.company_id,
        },
    )
    .await?;

    tracing::info!(
        user_id = user.id,
        role = %user.role,
        admin_id = admin.user_id,
        "User created by admin",
    );
    Ok((
        StatusCode::CREATED,
        Json(DataResponse::new(UserResponse::from(&user))),
    ))
}

/// PUT /api/v1/admin/users/{id}/role
///
/// Takes effect on the user's next login or token refresh.
pub async fn update_role(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateRoleRequest>,
) -> AppResult<Json<DataResponse<UserResponse>>> {
    check_membership(input.role, input.company_id)?;
    ensure_company_exists(&state, input.company_id).await?;

    let user = UserRepo::update_role(&state.pool, id, input.role, input.company_id)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::not_found("user", id)))?;

    tracing::info!(user_id = id, role = %user.role, admin_id = admin.user_id, "User role changed");
    Ok(Json(DataResponse::new(UserResponse::from(&user))))
}

/// DELETE /api/v1/admin/users/{id}
pub async fn delete(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    if id == admin.user_id {
        return Err(AppError::BadRequest("Admins cannot delete themselves".into()));
    }
    if !UserRepo::soft_delete(&state.pool, id).await? {
        return Err(AppError::Core(CoreError::not_found("user", id)));
    }
    Ok(StatusCode::NO_CONTENT)
}
