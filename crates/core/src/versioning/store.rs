//! The `VersionStore` contract and the state it exposes.

use async_trait::async_trait;
use serde::Serialize;

use crate::error::CoreError;
use crate::types::{DbId, Timestamp};
use crate::versioning::status::{AuditStatus, EntityKind, RootStatus, VersionStatus};

/// Typed content carried by a version.
pub trait VersionContent: Send + Sync {
    /// Human-readable label (lesson name, news title) used in notifications.
    fn label(&self) -> &str;

    /// Reject malformed content before anything is persisted.
    fn validate(&self) -> Result<(), CoreError>;

    /// Text fields matched by keyword search.
    fn searchable_text(&self) -> Vec<&str> {
        vec![self.label()]
    }
}

/// Pointer state of a root entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RootState {
    pub id: DbId,
    pub uuid: uuid::Uuid,
    pub owner_id: DbId,
    pub status: RootStatus,
    pub current_version_id: Option<DbId>,
    pub pending_version_id: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Workflow-relevant view of a version row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionState {
    pub id: DbId,
    pub uuid: uuid::Uuid,
    pub root_id: DbId,
    pub version: i32,
    pub label: String,
    pub status: VersionStatus,
    pub creator_id: DbId,
    pub created_at: Timestamp,
}

/// A review decision about to be recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEntry {
    pub auditor_id: DbId,
    pub status: AuditStatus,
    pub comments: Option<String>,
}

/// A recorded review decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditRecord {
    pub id: DbId,
    pub uuid: uuid::Uuid,
    pub version_id: DbId,
    pub auditor_id: DbId,
    pub audit_status: AuditStatus,
    pub comments: Option<String>,
    pub created_at: Timestamp,
}

/// Result of a committed `promote` or `reject`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewOutcome {
    pub version: VersionState,
    /// The previous current version, archived by this promotion.
    pub archived_version_id: Option<DbId>,
    pub audit: AuditRecord,
}

/// Storage of roots and their immutable versions.
///
/// Implementations enforce "one current + at most one pending version per
/// root". `promote` and `reject` are compare-and-swap operations: they only
/// apply while the version is still `pending_review` and the root still points
/// at it as pending, otherwise they fail with `CoreError::Conflict` and write
/// nothing. The audit row is written in the same unit of work as the status
/// change so a losing reviewer leaves no trace.
#[async_trait]
pub trait VersionStore: Send + Sync {
    type Content: VersionContent;

    fn kind(&self) -> EntityKind;

    /// Load a live root. `NotFound` when absent or soft-deleted.
    async fn find_root(&self, root_id: DbId) -> Result<RootState, CoreError>;

    /// Load a live version belonging to `root_id`.
    async fn find_version(&self, root_id: DbId, version_id: DbId)
        -> Result<VersionState, CoreError>;

    /// All live versions of a root, newest first.
    async fn list_versions(&self, root_id: DbId) -> Result<Vec<VersionState>, CoreError>;

    /// Persist a new `draft` version numbered `max(version) + 1` (starting at 1).
    async fn create_version(
        &self,
        root_id: DbId,
        content: &Self::Content,
        author_id: DbId,
    ) -> Result<VersionState, CoreError>;

    /// Attach a draft as the root's pending version.
    ///
    /// `Conflict` if a different version is already pending. Re-submitting the
    /// version that is already pending is a no-op.
    async fn submit_for_review(
        &self,
        root_id: DbId,
        version_id: DbId,
    ) -> Result<VersionState, CoreError>;

    /// Make the pending version current, archiving the prior current version,
    /// and record `audit`. All-or-nothing.
    async fn promote(
        &self,
        root_id: DbId,
        version_id: DbId,
        audit: &AuditEntry,
    ) -> Result<ReviewOutcome, CoreError>;

    /// Mark the pending version rejected, clear the pending pointer and record
    /// `audit`. The current version is untouched.
    async fn reject(
        &self,
        root_id: DbId,
        version_id: DbId,
        audit: &AuditEntry,
    ) -> Result<ReviewOutcome, CoreError>;

    /// Audit rows for every version of the root, newest first.
    async fn audit_history(&self, root_id: DbId) -> Result<Vec<AuditRecord>, CoreError>;
}
