//! Member management by a company account, confined to its own company.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use pioneer_core::error::CoreError;
use pioneer_core::publication::Page;
use pioneer_core::roles::Role;
use pioneer_core::types::DbId;
use pioneer_db::models::user::{CreateUser, User, UserResponse};
use pioneer_db::repositories::UserRepo;
use serde::Deserialize;
use validator::Validate;

use crate::auth::password::{hash_password, validate_password_strength, MIN_PASSWORD_LENGTH};
use crate::error::{AppError, AppResult};
use crate::handlers::auth::normalize_email;
use crate::middleware::rbac::RequireCompany;
use crate::query::PageParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for `POST /company/users`.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateMemberRequest {
    #[validate(email, length(max = 254))]
    pub email: String,
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    pub password: String,
    /// `user` or `company`; defaults to `user`.
    pub role: Option<Role>,
}

/// Request body for `PUT /company/users/{id}`.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateMemberRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    pub role: Option<Role>,
}

/// Company accounts hand out `user` and `company` roles only.
fn member_role(role: Option<Role>) -> Result<Role, CoreError> {
    match role.unwrap_or(Role::User) {
        Role::Admin => Err(CoreError::Forbidden(
            "Company accounts cannot grant the admin role".to_string(),
        )),
        role => Ok(role),
    }
}

/// A live member of `company_id` other than the caller.
async fn other_member(
    state: &AppState,
    company_id: DbId,
    caller_id: DbId,
    id: DbId,
) -> AppResult<User> {
    if id == caller_id {
        return Err(AppError::BadRequest(
            "Use /users/me to manage your own account".into(),
        ));
    }
    let user = UserRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::not_found("user", id)))?;
    if user.company_id != Some(company_id) || user.role.is_admin() {
        return Err(AppError::Core(CoreError::Forbidden(format!(
            "User {id} is not a member of your company"
        ))));
    }
    Ok(user)
}

/// GET /api/v1/company/users
pub async fn list(
    State(state): State<AppState>,
    RequireCompany(_caller, company_id): RequireCompany,
    Query(params): Query<PageParams>,
) -> AppResult<Json<DataResponse<Page<UserResponse>>>> {
    let page = params.request();
    let (users, total) = UserRepo::list_by_company(&state.pool, company_id, page).await?;
    let items = users.iter().map(UserResponse::from).collect();
    Ok(Json(DataResponse::new(Page::new(items, total, page))))
}

/// POST /api/v1/company/users
pub async fn create(
    State(state): State<AppState>,
    RequireCompany(caller, company_id): RequireCompany,
    Json(mut input): Json<CreateMemberRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<UserResponse>>)> {
    input.email = normalize_email(&input.email);
    input.name = input.name.trim().to_string();
    input.validate()?;
    validate_password_strength(&input.password, MIN_PASSWORD_LENGTH)
        .map_err(|msg| AppError::Core(CoreError::Validation(msg)))?;
    let role = member_role(input.role)?;

    let password_hash = hash_password(&input.password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;

    let user = UserRepo::create(
        &state.pool,
        &CreateUser {
            email: input.email,
            name: input.name,
            password_hash,
            role,
            company_id: Some(company_id),
        },
    )
    .await?;

    tracing::info!(
        user_id = user.id,
        company_id,
        created_by = caller.user_id,
        "Company member created",
    );
    Ok((
        StatusCode::CREATED,
        Json(DataResponse::new(UserResponse::from(&user))),
    ))
}

/// PUT /api/v1/company/users/{id}
///
/// Rename a member and/or switch it between the `user` and `company` roles.
pub async fn update(
    State(state): State<AppState>,
    RequireCompany(caller, company_id): RequireCompany,
    Path(id): Path<DbId>,
    Json(mut input): Json<UpdateMemberRequest>,
) -> AppResult<Json<DataResponse<UserResponse>>> {
    input.name = input.name.map(|n| n.trim().to_string());
    input.validate()?;
    let mut user = other_member(&state, company_id, caller.user_id, id).await?;

    if let Some(ref name) = input.name {
        user = UserRepo::update_name(&state.pool, id, name)
            .await?
            .ok_or_else(|| AppError::Core(CoreError::not_found("user", id)))?;
    }
    if input.role.is_some() {
        let role = member_role(input.role)?;
        user = UserRepo::update_role(&state.pool, id, role, Some(company_id))
            .await?
            .ok_or_else(|| AppError::Core(CoreError::not_found("user", id)))?;
    }

    tracing::info!(user_id = id, company_id, updated_by = caller.user_id, "Company member updated");
    Ok(Json(DataResponse::new(UserResponse::from(&user))))
}

/// DELETE /api/v1/company/users/{id}
pub async fn delete(
    State(state): State<AppState>,
    RequireCompany(caller, company_id): RequireCompany,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    other_member(&state, company_id, caller.user_id, id).await?;
    if !UserRepo::soft_delete(&state.pool, id).await? {
        return Err(AppError::Core(CoreError::not_found("user", id)));
    }
    tracing::info!(user_id = id, company_id, deleted_by = caller.user_id, "Company member deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/company/users/{id}/remove
///
/// Detach a member from the company; the account itself stays.
pub async fn remove(
    State(state): State<AppState>,
    RequireCompany(caller, company_id): RequireCompany,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<UserResponse>>> {
    other_member(&state, company_id, caller.user_id, id).await?;
    let user = UserRepo::remove_from_company(&state.pool, id, company_id)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::not_found("user", id)))?;
    tracing::info!(user_id = id, company_id, removed_by = caller.user_id, "Member removed from company");
    Ok(Json(DataResponse::new(UserResponse::from(&user))))
}
