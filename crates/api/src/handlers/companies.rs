//! Admin handlers for the `/admin/companies` resource.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use pioneer_core::company::CompanyStatus;
use pioneer_core::error::CoreError;
use pioneer_core::publication::Page;
use pioneer_core::types::DbId;
use pioneer_db::models::company::{Company, CreateCompany, UpdateCompany};
use pioneer_db::repositories::CompanyRepo;
use serde::Deserialize;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::rbac::RequireAdmin;
use crate::query::PageParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for `POST /admin/companies`.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateCompanyRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    #[validate(email)]
    pub contact_email: Option<String>,
}

/// Request body for `PUT /admin/companies/{id}/status`.
#[derive(Debug, Deserialize)]
pub struct CompanyStatusRequest {
    pub status: CompanyStatus,
}

/// POST /api/v1/admin/companies
pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(input): Json<CreateCompanyRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<Company>>)> {
    input.validate()?;
    let company = CompanyRepo::create(
        &state.pool,
        &CreateCompany {
            name: input.name.trim().to_string(),
            description: input.description,
            contact_email: input.contact_email,
        },
    )
    .await?;
    tracing::info!(company_id = company.id, admin_id = admin.user_id, "Company created");
    Ok((StatusCode::CREATED, Json(DataResponse::new(company))))
}

/// GET /api/v1/admin/companies
pub async fn list(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(params): Query<PageParams>,
) -> AppResult<Json<DataResponse<Page<Company>>>> {
    let page = params.request();
    let (items, total) = CompanyRepo::list(&state.pool, page).await?;
    Ok(Json(DataResponse::new(Page::new(items, total, page))))
}

/// GET /api/v1/admin/companies/{id}
pub async fn get(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Company>>> {
    let company = CompanyRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::not_found("company", id)))?;
    Ok(Json(DataResponse::new(company)))
}

/// PUT /api/v1/admin/companies/{id}
///
/// Replace the company's profile. Takes the same body as creation.
pub async fn update(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<DbId>,
    Json(input): Json<CreateCompanyRequest>,
) -> AppResult<Json<DataResponse<Company>>> {
    input.validate()?;
    let company = CompanyRepo::update(
        &state.pool,
        id,
        &UpdateCompany {
            name: input.name.trim().to_string(),
            description: input.description,
            contact_email: input.contact_email,
        },
    )
    .await?
    .ok_or_else(|| AppError::Core(CoreError::not_found("company", id)))?;
    tracing::info!(company_id = id, admin_id = admin.user_id, "Company updated");
    Ok(Json(DataResponse::new(company)))
}

/// PUT /api/v1/admin/companies/{id}/status
///
/// Suspending a company stops its company accounts from signing in.
pub async fn set_status(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<DbId>,
    Json(input): Json<CompanyStatusRequest>,
) -> AppResult<Json<DataResponse<Company>>> {
    let company = CompanyRepo::set_status(&state.pool, id, input.status)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::not_found("company", id)))?;
    tracing::info!(
        company_id = id,
        status = %input.status,
        admin_id = admin.user_id,
        "Company status changed",
    );
    Ok(Json(DataResponse::new(company)))
}

/// DELETE /api/v1/admin/companies/{id}
pub async fn delete(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    if !CompanyRepo::soft_delete(&state.pool, id).await? {
        return Err(AppError::Core(CoreError::not_found("company", id)));
    }
    Ok(StatusCode::NO_CONTENT)
}
