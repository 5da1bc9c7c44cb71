//! Versioned entities and the review workflow that promotes their versions.
//!
//! A root (lesson, meeting, news item) points at one current and at most one
//! pending version. Versions are immutable; edits create a new version that
//! goes through `AuditWorkflow` before it becomes current.

mod memory;
pub mod status;
pub mod store;
pub mod workflow;

#[cfg(test)]
pub(crate) mod test_support;

pub use memory::MemoryVersionStore;
pub use status::{AuditStatus, EntityKind, ReviewDecision, RootStatus, VersionStatus};
pub use store::{
    AuditEntry, AuditRecord, ReviewOutcome, RootState, VersionContent, VersionState, VersionStore,
};
pub use workflow::{AuditWorkflow, AUTO_APPROVAL_COMMENT, MAX_REVIEW_COMMENT_LEN};
