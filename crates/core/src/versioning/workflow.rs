//! The review state machine driving versions from draft to current.

use std::sync::Arc;

use crate::error::CoreError;
use crate::notification::{Notice, NotificationBridge};
use crate::roles::Actor;
use crate::types::DbId;
use crate::validation::validate_max_len;
use crate::versioning::status::{ReviewDecision, VersionStatus};
use crate::versioning::store::{
    AuditEntry, ReviewOutcome, VersionContent, VersionState, VersionStore,
};

/// Comment recorded when an admin publishes directly.
pub const AUTO_APPROVAL_COMMENT: &str = "auto-approved: published by administrator";

/// Longest accepted reviewer comment.
pub const MAX_REVIEW_COMMENT_LEN: usize = 1000;

/// Drives versions of one entity kind through submission and review.
///
/// Holds injected handles only; cloning is cheap.
pub struct AuditWorkflow<S: VersionStore> {
    store: Arc<S>,
    notifier: Arc<dyn NotificationBridge>,
}

impl<S: VersionStore> Clone for AuditWorkflow<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            notifier: Arc::clone(&self.notifier),
        }
    }
}

impl<S: VersionStore> AuditWorkflow<S> {
    pub fn new(store: Arc<S>, notifier: Arc<dyn NotificationBridge>) -> Self {
        Self { store, notifier }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Validate `content` and store it as a new draft version of the root.
    ///
    /// Only the root's owner or an admin may add versions.
    pub async fn draft(
        &self,
        root_id: DbId,
        content: &S::Content,
        actor: &Actor,
    ) -> Result<VersionState, CoreError> {
        content.validate()?;
        let root = self.store.find_root(root_id).await?;
        if !actor.owns_or_admin(root.owner_id) {
            return Err(CoreError::Forbidden(format!(
                "Only the owner may add versions to {} {root_id}",
                self.store.kind()
            )));
        }
        let version = self.store.create_version(root_id, content, actor.id).await?;
        tracing::debug!(
            entity = %self.store.kind(),
            root_id,
            version_id = version.id,
            version = version.version,
            "Draft version created",
        );
        Ok(version)
    }

    /// Submit a draft for review. The submitter must be its creator or an admin.
    pub async fn submit(
        &self,
        root_id: DbId,
        version_id: DbId,
        submitter: &Actor,
    ) -> Result<(), CoreError> {
        let version = self.store.find_version(root_id, version_id).await?;
        if !submitter.owns_or_admin(version.creator_id) {
            return Err(CoreError::Forbidden(
                "Only the creator may submit this version".to_string(),
            ));
        }
        self.store.submit_for_review(root_id, version_id).await?;
        tracing::info!(
            entity = %self.store.kind(),
            root_id,
            version_id,
            submitter_id = submitter.id,
            "Version submitted for review",
        );
        Ok(())
    }

    /// Approve or reject a pending version.
    ///
    /// The audit row is written together with the status change. A version not
    /// in `pending_review` fails with `InvalidState`; losing a concurrent review
    /// surfaces the store's `Conflict` untouched. The creator is notified after
    /// the transition commits; notification failures are only logged.
    pub async fn review(
        &self,
        root_id: DbId,
        version_id: DbId,
        auditor: &Actor,
        decision: ReviewDecision,
        comments: Option<String>,
    ) -> Result<ReviewOutcome, CoreError> {
        self.review_inner(root_id, version_id, auditor, decision, comments, true)
            .await
    }

    /// Create, submit and approve a version in one call on behalf of an admin.
    ///
    /// The approval is recorded with [`AUTO_APPROVAL_COMMENT`] and no
    /// notification is sent.
    pub async fn publish_as_admin(
        &self,
        root_id: DbId,
        content: &S::Content,
        admin: &Actor,
    ) -> Result<ReviewOutcome, CoreError> {
        if !admin.role.is_admin() {
            return Err(CoreError::Forbidden(
                "Direct publication requires the admin role".to_string(),
            ));
        }
        let root = self.store.find_root(root_id).await?;
        if let Some(pending) = root.pending_version_id {
            return Err(CoreError::Conflict(format!(
                "{} {root_id} already has version {pending} pending review",
                self.store.kind()
            )));
        }
        let version = self.draft(root_id, content, admin).await?;
        self.submit(root_id, version.id, admin).await?;
        self.review_inner(
            root_id,
            version.id,
            admin,
            ReviewDecision::Approve,
            Some(AUTO_APPROVAL_COMMENT.to_string()),
            false,
        )
        .await
    }

    async fn review_inner(
        &self,
        root_id: DbId,
        version_id: DbId,
        auditor: &Actor,
        decision: ReviewDecision,
        comments: Option<String>,
        notify: bool,
    ) -> Result<ReviewOutcome, CoreError> {
        if !auditor.role.can_review() {
            return Err(CoreError::Forbidden(
                "Reviewing requires the admin role".to_string(),
            ));
        }
        let comments = comments
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());
        if let Some(ref c) = comments {
            validate_max_len("comments", c, MAX_REVIEW_COMMENT_LEN)?;
        }

        let version = self.store.find_version(root_id, version_id).await?;
        if version.status != VersionStatus::PendingReview {
            return Err(CoreError::InvalidState(format!(
                "{} version {version_id} is {}, not pending_review",
                self.store.kind(),
                version.status
            )));
        }

        let entry = AuditEntry {
            auditor_id: auditor.id,
            status: decision.into(),
            comments,
        };
        let outcome = match decision {
            ReviewDecision::Approve => self.store.promote(root_id, version_id, &entry).await?,
            ReviewDecision::Reject => self.store.reject(root_id, version_id, &entry).await?,
        };

        tracing::info!(
            entity = %self.store.kind(),
            root_id,
            version_id,
            auditor_id = auditor.id,
            decision = %decision,
            archived_version_id = ?outcome.archived_version_id,
            "Version reviewed",
        );

        if notify {
            self.notify_creator(root_id, &outcome).await;
        }
        Ok(outcome)
    }

    async fn notify_creator(&self, root_id: DbId, outcome: &ReviewOutcome) {
        let notice = Notice::review_decision(
            outcome.version.creator_id,
            self.store.kind(),
            root_id,
            &outcome.version.label,
            outcome.audit.audit_status,
            outcome.audit.comments.as_deref(),
        );
        if let Err(e) = self.notifier.notify(notice).await {
            tracing::warn!(
                entity = %self.store.kind(),
                root_id,
                version_id = outcome.version.id,
                error = %e,
                "Review notification failed",
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use assert_matches::assert_matches;

    use super::*;
    use crate::notification::NotificationKind;
    use crate::roles::Role;
    use crate::versioning::status::{AuditStatus, EntityKind, RootStatus};
    use crate::versioning::test_support::{
        note, FailingNotifier, GatedStore, RecordingNotifier,
    };
    use crate::versioning::MemoryVersionStore;

    const OWNER: DbId = 10;
    const ADMIN: DbId = 1;

    fn owner() -> Actor {
        Actor::new(OWNER, Role::Company)
    }

    fn admin() -> Actor {
        Actor::new(ADMIN, Role::Admin)
    }

    type NoteStore = MemoryVersionStore<crate::versioning::test_support::Note>;

    fn setup() -> (AuditWorkflow<NoteStore>, Arc<RecordingNotifier>, DbId) {
        let store = Arc::new(MemoryVersionStore::new(EntityKind::Lesson));
        let root = store.create_root(OWNER).unwrap();
        let notifier = Arc::new(RecordingNotifier::default());
        let wf = AuditWorkflow::new(store, notifier.clone());
        (wf, notifier, root.id)
    }

    async fn assert_single_pending(wf: &AuditWorkflow<NoteStore>, root_id: DbId) {
        let pending = wf
            .store()
            .list_versions(root_id)
            .await
            .unwrap()
            .into_iter()
            .filter(|v| v.status == VersionStatus::PendingReview)
            .count();
        assert!(pending <= 1, "found {pending} pending versions");
    }

    #[tokio::test]
    async fn first_version_approved_becomes_current() {
        let (wf, notifier, root_id) = setup();

        let v1 = wf.draft(root_id, &note("v1"), &owner()).await.unwrap();
        assert_eq!(v1.version, 1);
        assert_eq!(v1.status, VersionStatus::Draft);

        wf.submit(root_id, v1.id, &owner()).await.unwrap();
        assert_single_pending(&wf, root_id).await;

        let outcome = wf
            .review(root_id, v1.id, &admin(), ReviewDecision::Approve, None)
            .await
            .unwrap();
        assert_eq!(outcome.archived_version_id, None);
        assert_eq!(outcome.version.status, VersionStatus::Active);

        let root = wf.store().find_root(root_id).await.unwrap();
        assert_eq!(root.current_version_id, Some(v1.id));
        assert_eq!(root.pending_version_id, None);
        assert_eq!(root.status, RootStatus::Published);

        let history = wf.store().audit_history(root_id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].audit_status, AuditStatus::Approved);
        assert_eq!(history[0].auditor_id, ADMIN);

        let sent = notifier.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].recipient_id, OWNER);
        assert_eq!(sent[0].kind, NotificationKind::ReviewApproved);
    }

    #[tokio::test]
    async fn second_approval_archives_prior_current() {
        let (wf, _, root_id) = setup();
        let v1 = wf.draft(root_id, &note("v1"), &owner()).await.unwrap();
        wf.submit(root_id, v1.id, &owner()).await.unwrap();
        wf.review(root_id, v1.id, &admin(), ReviewDecision::Approve, None)
            .await
            .unwrap();

        let v2 = wf.draft(root_id, &note("v2"), &owner()).await.unwrap();
        assert_eq!(v2.version, 2);
        wf.submit(root_id, v2.id, &owner()).await.unwrap();
        let outcome = wf
            .review(root_id, v2.id, &admin(), ReviewDecision::Approve, None)
            .await
            .unwrap();
        assert_eq!(outcome.archived_version_id, Some(v1.id));

        let root = wf.store().find_root(root_id).await.unwrap();
        assert_eq!(root.current_version_id, Some(v2.id));
        let v1 = wf.store().find_version(root_id, v1.id).await.unwrap();
        let v2 = wf.store().find_version(root_id, v2.id).await.unwrap();
        assert_eq!(v1.status, VersionStatus::Archived);
        assert_eq!(v2.status, VersionStatus::Active);
    }

    #[tokio::test]
    async fn rejection_clears_pending_and_keeps_current() {
        let (wf, notifier, root_id) = setup();
        let v1 = wf.draft(root_id, &note("v1"), &owner()).await.unwrap();
        wf.submit(root_id, v1.id, &owner()).await.unwrap();

        let outcome = wf
            .review(
                root_id,
                v1.id,
                &admin(),
                ReviewDecision::Reject,
                Some("incomplete".to_string()),
            )
            .await
            .unwrap();
        assert_eq!(outcome.version.status, VersionStatus::Rejected);
        assert_eq!(outcome.audit.comments.as_deref(), Some("incomplete"));

        let root = wf.store().find_root(root_id).await.unwrap();
        assert_eq!(root.pending_version_id, None);
        assert_eq!(root.current_version_id, None);
        assert_eq!(root.status, RootStatus::Draft);

        let sent = notifier.sent();
        assert_eq!(sent[0].kind, NotificationKind::ReviewRejected);
        assert!(sent[0].body.contains("incomplete"));
    }

    #[tokio::test]
    async fn reviewing_non_pending_is_invalid_state() {
        let (wf, _, root_id) = setup();
        let v1 = wf.draft(root_id, &note("v1"), &owner()).await.unwrap();

        // Draft.
        let err = wf
            .review(root_id, v1.id, &admin(), ReviewDecision::Approve, None)
            .await
            .unwrap_err();
        assert_matches!(err, CoreError::InvalidState(_));

        // Already reviewed.
        wf.submit(root_id, v1.id, &owner()).await.unwrap();
        wf.review(root_id, v1.id, &admin(), ReviewDecision::Reject, None)
            .await
            .unwrap();
        for decision in [ReviewDecision::Approve, ReviewDecision::Reject] {
            let err = wf
                .review(root_id, v1.id, &admin(), decision, None)
                .await
                .unwrap_err();
            assert_matches!(err, CoreError::InvalidState(_));
        }
        assert_eq!(wf.store().audit_history(root_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn second_pending_version_conflicts() {
        let (wf, _, root_id) = setup();
        let v1 = wf.draft(root_id, &note("v1"), &owner()).await.unwrap();
        let v2 = wf.draft(root_id, &note("v2"), &owner()).await.unwrap();
        wf.submit(root_id, v1.id, &owner()).await.unwrap();

        let err = wf.submit(root_id, v2.id, &owner()).await.unwrap_err();
        assert_matches!(err, CoreError::Conflict(_));
        assert_single_pending(&wf, root_id).await;

        // Re-submitting the pending version is harmless.
        wf.submit(root_id, v1.id, &owner()).await.unwrap();
        assert_single_pending(&wf, root_id).await;
    }

    #[tokio::test]
    async fn version_numbers_never_reused_after_rejection() {
        let (wf, _, root_id) = setup();
        let mut seen = Vec::new();
        for round in 0..4 {
            let v = wf
                .draft(root_id, &note(&format!("r{round}")), &owner())
                .await
                .unwrap();
            seen.push(v.version);
            wf.submit(root_id, v.id, &owner()).await.unwrap();
            let decision = if round % 2 == 0 {
                ReviewDecision::Reject
            } else {
                ReviewDecision::Approve
            };
            wf.review(root_id, v.id, &admin(), decision, None)
                .await
                .unwrap();
            assert_single_pending(&wf, root_id).await;
        }
        assert_eq!(seen, vec![1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn only_owner_or_admin_may_draft_and_submit() {
        let (wf, _, root_id) = setup();
        let stranger = Actor::new(99, Role::Company);

        let err = wf.draft(root_id, &note("x"), &stranger).await.unwrap_err();
        assert_matches!(err, CoreError::Forbidden(_));

        let v1 = wf.draft(root_id, &note("v1"), &owner()).await.unwrap();
        let err = wf.submit(root_id, v1.id, &stranger).await.unwrap_err();
        assert_matches!(err, CoreError::Forbidden(_));

        wf.submit(root_id, v1.id, &admin()).await.unwrap();
    }

    #[tokio::test]
    async fn non_admin_cannot_review() {
        let (wf, _, root_id) = setup();
        let v1 = wf.draft(root_id, &note("v1"), &owner()).await.unwrap();
        wf.submit(root_id, v1.id, &owner()).await.unwrap();
        let err = wf
            .review(root_id, v1.id, &owner(), ReviewDecision::Approve, None)
            .await
            .unwrap_err();
        assert_matches!(err, CoreError::Forbidden(_));
        assert!(wf.store().audit_history(root_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn invalid_content_is_rejected_before_storage() {
        let (wf, _, root_id) = setup();
        let err = wf.draft(root_id, &note(""), &owner()).await.unwrap_err();
        assert_matches!(err, CoreError::Validation(_));
        assert!(wf.store().list_versions(root_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn overlong_comment_is_rejected() {
        let (wf, _, root_id) = setup();
        let v1 = wf.draft(root_id, &note("v1"), &owner()).await.unwrap();
        wf.submit(root_id, v1.id, &owner()).await.unwrap();
        let err = wf
            .review(
                root_id,
                v1.id,
                &admin(),
                ReviewDecision::Reject,
                Some("x".repeat(MAX_REVIEW_COMMENT_LEN + 1)),
            )
            .await
            .unwrap_err();
        assert_matches!(err, CoreError::Validation(_));
        let v1 = wf.store().find_version(root_id, v1.id).await.unwrap();
        assert_eq!(v1.status, VersionStatus::PendingReview);
    }

    #[tokio::test]
    async fn notification_failure_does_not_undo_review() {
        let store = Arc::new(MemoryVersionStore::new(EntityKind::News));
        let root = store.create_root(OWNER).unwrap();
        let wf = AuditWorkflow::new(store, Arc::new(FailingNotifier));

        let v1 = wf.draft(root.id, &note("v1"), &owner()).await.unwrap();
        wf.submit(root.id, v1.id, &owner()).await.unwrap();
        wf.review(root.id, v1.id, &admin(), ReviewDecision::Approve, None)
            .await
            .unwrap();

        let root = wf.store().find_root(root.id).await.unwrap();
        assert_eq!(root.current_version_id, Some(v1.id));
    }

    #[tokio::test]
    async fn admin_publication_is_auto_approved_without_notice() {
        let (wf, notifier, root_id) = setup();
        let outcome = wf
            .publish_as_admin(root_id, &note("direct"), &admin())
            .await
            .unwrap();
        assert_eq!(outcome.version.status, VersionStatus::Active);
        assert_eq!(outcome.audit.comments.as_deref(), Some(AUTO_APPROVAL_COMMENT));
        assert!(notifier.sent().is_empty());

        let err = wf
            .publish_as_admin(root_id, &note("nope"), &owner())
            .await
            .unwrap_err();
        assert_matches!(err, CoreError::Forbidden(_));
    }

    #[tokio::test]
    async fn admin_publication_conflicts_with_pending_version() {
        let (wf, _, root_id) = setup();
        let v1 = wf.draft(root_id, &note("v1"), &owner()).await.unwrap();
        wf.submit(root_id, v1.id, &owner()).await.unwrap();

        let err = wf
            .publish_as_admin(root_id, &note("direct"), &admin())
            .await
            .unwrap_err();
        assert_matches!(err, CoreError::Conflict(_));

        // Nothing was drafted on the way to the conflict.
        let versions = wf.store().list_versions(root_id).await.unwrap();
        assert_eq!(versions.len(), 1);
        assert_eq!(versions[0].id, v1.id);
        let next = wf.draft(root_id, &note("v2"), &owner()).await.unwrap();
        assert_eq!(next.version, 2);
    }

    #[tokio::test]
    async fn unknown_root_or_version_is_not_found() {
        let (wf, _, root_id) = setup();
        let err = wf.draft(404, &note("x"), &owner()).await.unwrap_err();
        assert_matches!(err, CoreError::NotFound { .. });
        let err = wf.submit(root_id, 404, &owner()).await.unwrap_err();
        assert_matches!(err, CoreError::NotFound { .. });
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_reviews_have_one_winner() {
        let inner = Arc::new(MemoryVersionStore::new(EntityKind::Lesson));
        let root = inner.create_root(OWNER).unwrap();
        let gated = Arc::new(GatedStore::new(inner.clone(), 2));
        let notifier = Arc::new(RecordingNotifier::default());
        let wf = AuditWorkflow::new(gated, notifier.clone());

        let v1 = wf.draft(root.id, &note("v1"), &owner()).await.unwrap();
        wf.submit(root.id, v1.id, &owner()).await.unwrap();
        wf.store().arm();

        let approve = {
            let wf = wf.clone();
            tokio::spawn(async move {
                wf.review(root.id, v1.id, &admin(), ReviewDecision::Approve, None)
                    .await
            })
        };
        let reject = {
            let wf = wf.clone();
            let other = Actor::new(2, Role::Admin);
            tokio::spawn(async move {
                wf.review(root.id, v1.id, &other, ReviewDecision::Reject, None)
                    .await
            })
        };
        let results = [approve.await.unwrap(), reject.await.unwrap()];

        let wins = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(wins, 1);
        let loser = results.iter().find_map(|r| r.as_ref().err()).unwrap();
        assert_matches!(loser, CoreError::Conflict(_));

        let history = inner.audit_history(root.id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(notifier.sent().len(), 1);
    }
}
