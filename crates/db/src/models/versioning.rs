//! Rows shared by every versioned entity family.
//!
//! Queries alias each family's owner and foreign-key columns to `owner_id` and
//! `root_id` so one set of row types serves lessons, meetings and news.

use pioneer_core::types::{DbId, Timestamp};
use pioneer_core::versioning::{
    AuditRecord, AuditStatus, RootState, RootStatus, VersionState, VersionStatus,
};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Pointer columns of a root row.
#[derive(Debug, Clone, FromRow)]
pub struct RootPointerRow {
    pub id: DbId,
    pub uuid: uuid::Uuid,
    pub owner_id: DbId,
    #[sqlx(try_from = "String")]
    pub status: RootStatus,
    pub current_version_id: Option<DbId>,
    pub pending_version_id: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<RootPointerRow> for RootState {
    fn from(row: RootPointerRow) -> Self {
        RootState {
            id: row.id,
            uuid: row.uuid,
            owner_id: row.owner_id,
            status: row.status,
            current_version_id: row.current_version_id,
            pending_version_id: row.pending_version_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Workflow columns of a version row.
#[derive(Debug, Clone, FromRow)]
pub struct VersionStateRow {
    pub id: DbId,
    pub uuid: uuid::Uuid,
    pub root_id: DbId,
    pub version: i32,
    pub label: String,
    #[sqlx(try_from = "String")]
    pub status: VersionStatus,
    pub creator_id: DbId,
    pub created_at: Timestamp,
}

impl From<VersionStateRow> for VersionState {
    fn from(row: VersionStateRow) -> Self {
        VersionState {
            id: row.id,
            uuid: row.uuid,
            root_id: row.root_id,
            version: row.version,
            label: row.label,
            status: row.status,
            creator_id: row.creator_id,
            created_at: row.created_at,
        }
    }
}

/// A row from one of the `*_audit_history` tables.
#[derive(Debug, Clone, FromRow)]
pub struct AuditHistoryRow {
    pub id: DbId,
    pub uuid: uuid::Uuid,
    pub version_id: DbId,
    pub auditor_id: DbId,
    #[sqlx(try_from = "String")]
    pub audit_status: AuditStatus,
    pub comments: Option<String>,
    pub created_at: Timestamp,
}

impl From<AuditHistoryRow> for AuditRecord {
    fn from(row: AuditHistoryRow) -> Self {
        AuditRecord {
            id: row.id,
            uuid: row.uuid,
            version_id: row.version_id,
            auditor_id: row.auditor_id,
            audit_status: row.audit_status,
            comments: row.comments,
            created_at: row.created_at,
        }
    }
}

/// Audit row joined with the version and root it concerns, for admin listings.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AuditHistoryEntry {
    pub id: DbId,
    pub uuid: uuid::Uuid,
    pub root_id: DbId,
    pub version_id: DbId,
    pub version: i32,
    pub label: String,
    pub auditor_id: DbId,
    #[sqlx(try_from = "String")]
    pub audit_status: AuditStatus,
    pub comments: Option<String>,
    pub created_at: Timestamp,
}

/// Filters for the admin audit history listing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuditHistoryQuery {
    pub audit_status: Option<AuditStatus>,
    /// Inclusive lower bound on `created_at`.
    pub from: Option<Timestamp>,
    /// Exclusive upper bound on `created_at`.
    pub to: Option<Timestamp>,
    pub root_id: Option<DbId>,
}

/// A root together with its newest live version, for owner and review lists.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct RootSummary {
    pub id: DbId,
    pub uuid: uuid::Uuid,
    pub owner_id: DbId,
    #[sqlx(try_from = "String")]
    pub status: RootStatus,
    pub current_version_id: Option<DbId>,
    pub pending_version_id: Option<DbId>,
    pub latest_version: Option<i32>,
    pub latest_label: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A freshly created root with its first draft version.
#[derive(Debug, Clone, Serialize)]
pub struct CreatedRoot {
    pub root: RootState,
    pub version: VersionState,
}

/// A version's workflow state together with its content.
#[derive(Debug, Clone, Serialize)]
pub struct VersionDetail<C> {
    #[serde(flatten)]
    pub state: VersionState,
    pub content: C,
}
