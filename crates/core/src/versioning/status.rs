//! Closed status vocabularies for versioned entities.

use crate::types::DbId;

define_text_enum! {
    /// Which family of versioned entity a root belongs to.
    EntityKind {
        Lesson = "lesson",
        Meeting = "meeting",
        News = "news",
    }
}

impl EntityKind {
    /// Capitalised name used in notification titles.
    pub fn display_name(self) -> &'static str {
        match self {
            EntityKind::Lesson => "Lesson",
            EntityKind::Meeting => "Meeting",
            EntityKind::News => "News",
        }
    }

    /// Entity name reported by `CoreError::NotFound` for a root.
    pub fn root_entity(self) -> &'static str {
        self.as_str()
    }

    /// Entity name reported by `CoreError::NotFound` for a version.
    pub fn version_entity(self) -> &'static str {
        match self {
            EntityKind::Lesson => "lesson_version",
            EntityKind::Meeting => "meeting_version",
            EntityKind::News => "news_version",
        }
    }
}

define_text_enum! {
    /// Lifecycle of a single immutable version.
    ///
    /// `draft -> pending_review -> {active, rejected}`, and `active -> archived`
    /// once a newer version is promoted.
    VersionStatus {
        Draft = "draft",
        PendingReview = "pending_review",
        Active = "active",
        Rejected = "rejected",
        Archived = "archived",
    }
}

impl VersionStatus {
    /// Whether a version in this status may move to `next`.
    pub fn can_transition_to(self, next: VersionStatus) -> bool {
        use VersionStatus::*;
        matches!(
            (self, next),
            (Draft, PendingReview)
                | (PendingReview, Active)
                | (PendingReview, Rejected)
                | (Active, Archived)
        )
    }
}

define_text_enum! {
    /// Lifecycle of a root, derived from its version pointers.
    RootStatus {
        Draft = "draft",
        PendingReview = "pending_review",
        Published = "published",
    }
}

impl RootStatus {
    /// A pending version wins over a current one; a root with neither is a draft.
    pub fn from_pointers(current: Option<DbId>, pending: Option<DbId>) -> Self {
        match (current, pending) {
            (_, Some(_)) => RootStatus::PendingReview,
            (Some(_), None) => RootStatus::Published,
            (None, None) => RootStatus::Draft,
        }
    }
}

define_text_enum! {
    /// Decision requested by a reviewer.
    ReviewDecision {
        Approve = "approve",
        Reject = "reject",
    }
}

define_text_enum! {
    /// Outcome recorded in an audit history row.
    AuditStatus {
        Approved = "approved",
        Rejected = "rejected",
    }
}

impl From<ReviewDecision> for AuditStatus {
    fn from(decision: ReviewDecision) -> Self {
        match decision {
            ReviewDecision::Approve => AuditStatus::Approved,
            ReviewDecision::Reject => AuditStatus::Rejected,
        }
    }
}
