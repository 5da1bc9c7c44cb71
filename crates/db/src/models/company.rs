//! Company entity model and DTOs.

use pioneer_core::company::CompanyStatus;
use pioneer_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `companies` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Company {
    pub id: DbId,
    pub uuid: uuid::Uuid,
    pub name: String,
    pub description: Option<String>,
    pub contact_email: Option<String>,
    #[sqlx(try_from = "String")]
    pub status: CompanyStatus,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a company.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCompany {
    pub name: String,
    pub description: Option<String>,
    pub contact_email: Option<String>,
}

/// Replacement profile for an existing company.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateCompany {
    pub name: String,
    pub description: Option<String>,
    pub contact_email: Option<String>,
}
