//! Repository for the `companies` table.

use pioneer_core::company::CompanyStatus;
use pioneer_core::publication::PageRequest;
use pioneer_core::types::DbId;
use sqlx::PgPool;

use crate::models::company::{Company, CreateCompany, UpdateCompany};

const COLUMNS: &str =
    "id, uuid, name, description, contact_email, status, created_at, updated_at";

/// Provides CRUD operations for companies.
pub struct CompanyRepo;

impl CompanyRepo {
    /// Insert a new company, returning the created row.
    pub async fn create(pool: &PgPool, input: &CreateCompany) -> Result<Company, sqlx::Error> {
        let query = format!(
            "INSERT INTO companies (name, description, contact_email)
             VALUES ($1, $2, $3)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Company>(&query)
            .bind(&input.name)
            .bind(&input.description)
            .bind(&input.contact_email)
            .fetch_one(pool)
            .await
    }

    /// Find a live company by ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Company>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM companies WHERE id = $1 AND deleted_at IS NULL");
        sqlx::query_as::<_, Company>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List live companies by name. Returns the page and the total.
    pub async fn list(
        pool: &PgPool,
        page: PageRequest,
    ) -> Result<(Vec<Company>, i64), sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM companies WHERE deleted_at IS NULL \
             ORDER BY name, id LIMIT $1 OFFSET $2"
        );
        let items = sqlx::query_as::<_, Company>(&query)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(pool)
            .await?;
        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM companies WHERE deleted_at IS NULL")
                .fetch_one(pool)
                .await?;
        Ok((items, total))
    }

    /// Replace a live company's profile. Returns `None` if no live row matched.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateCompany,
    ) -> Result<Option<Company>, sqlx::Error> {
        let query = format!(
            "UPDATE companies SET name = $2, description = $3, contact_email = $4, updated_at = NOW()
             WHERE id = $1 AND deleted_at IS NULL
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Company>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(&input.description)
            .bind(&input.contact_email)
            .fetch_optional(pool)
            .await
    }

    /// Change a live company's status. Returns `None` if no live row matched.
    pub async fn set_status(
        pool: &PgPool,
        id: DbId,
        status: CompanyStatus,
    ) -> Result<Option<Company>, sqlx::Error> {
        let query = format!(
            "UPDATE companies SET status = $2, updated_at = NOW()
             WHERE id = $1 AND deleted_at IS NULL
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Company>(&query)
            .bind(id)
            .bind(status.as_str())
            .fetch_optional(pool)
            .await
    }

    /// Soft-delete a company. Returns `true` if a live row was marked.
    pub async fn soft_delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE companies SET deleted_at = NOW(), updated_at = NOW()
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
