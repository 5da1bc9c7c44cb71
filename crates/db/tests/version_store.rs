//! Integration tests for `PgVersionStore` against a real database.
//!
//! Covers version numbering, the submit/promote/reject transitions, the
//! pointer invariants on the root row, and concurrent reviews of the same
//! pending version.

use std::sync::Arc;

use assert_matches::assert_matches;
use async_trait::async_trait;
use pioneer_core::error::CoreError;
use pioneer_core::lesson::{LessonContent, LessonResource, ResourceKind};
use pioneer_core::meeting::MeetingContent;
use pioneer_core::notification::{Notice, NotificationBridge};
use pioneer_core::roles::{Actor, Role};
use pioneer_core::types::DbId;
use pioneer_core::versioning::{
    AuditEntry, AuditStatus, AuditWorkflow, ReviewDecision, RootStatus, VersionStatus,
    VersionStore,
};
use pioneer_db::models::user::CreateUser;
use pioneer_db::repositories::{LessonStore, MeetingStore, UserRepo};
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

struct Silent;

#[async_trait]
impl NotificationBridge for Silent {
    async fn notify(&self, _notice: Notice) -> Result<(), CoreError> {
        Ok(())
    }
}

async fn new_user(pool: &PgPool, email: &str, role: Role) -> Actor {
    let user = UserRepo::create(
        pool,
        &CreateUser {
            email: email.to_string(),
            name: email.to_string(),
            password_hash: "x".to_string(),
            role,
            company_id: None,
        },
    )
    .await
    .unwrap();
    Actor::new(user.id, role)
}

fn lesson(name: &str) -> LessonContent {
    LessonContent {
        name: name.to_string(),
        description: Some("about ownership".to_string()),
        image_url: None,
        author_name: Some("Ferris".to_string()),
        sort_order: 0,
        resources: vec![LessonResource {
            name: "slides".to_string(),
            url: "https://example.com/slides.pdf".to_string(),
            kind: ResourceKind::Document,
            sort_order: 1,
        }],
    }
}

async fn root_with_draft(store: &LessonStore, owner: &Actor, name: &str) -> (DbId, DbId) {
    let created = store.create_root(owner.id, &(), &lesson(name)).await.unwrap();
    (created.root.id, created.version.id)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn create_root_starts_with_draft_version_one(pool: PgPool) {
    let owner = new_user(&pool, "pub@example.com", Role::Company).await;
    let store = LessonStore::new(pool.clone());

    let created = store.create_root(owner.id, &(), &lesson("Intro")).await.unwrap();
    assert_eq!(created.root.status, RootStatus::Draft);
    assert_eq!(created.root.current_version_id, None);
    assert_eq!(created.version.version, 1);
    assert_eq!(created.version.status, VersionStatus::Draft);

    let detail = store
        .version_detail(created.root.id, created.version.id)
        .await
        .unwrap();
    assert_eq!(detail.content.name, "Intro");
    assert_eq!(detail.content.resources.len(), 1);
    assert_eq!(detail.content.resources[0].kind, ResourceKind::Document);
}

#[sqlx::test(migrations = "./migrations")]
async fn version_numbers_increase_per_root(pool: PgPool) {
    let owner = new_user(&pool, "pub@example.com", Role::Company).await;
    let store = LessonStore::new(pool.clone());
    let (root_a, _) = root_with_draft(&store, &owner, "A").await;
    let (root_b, _) = root_with_draft(&store, &owner, "B").await;

    let v2 = store.create_version(root_a, &lesson("A2"), owner.id).await.unwrap();
    let v3 = store.create_version(root_a, &lesson("A3"), owner.id).await.unwrap();
    let b2 = store.create_version(root_b, &lesson("B2"), owner.id).await.unwrap();

    assert_eq!(v2.version, 2);
    assert_eq!(v3.version, 3);
    assert_eq!(b2.version, 2);

    let versions = store.list_versions(root_a).await.unwrap();
    let numbers: Vec<i32> = versions.iter().map(|v| v.version).collect();
    assert_eq!(numbers, vec![3, 2, 1]);
}

#[sqlx::test(migrations = "./migrations")]
async fn approve_then_replace_archives_previous(pool: PgPool) {
    let owner = new_user(&pool, "pub@example.com", Role::Company).await;
    let admin = new_user(&pool, "admin@example.com", Role::Admin).await;
    let store = Arc::new(LessonStore::new(pool.clone()));
    let wf = AuditWorkflow::new(store.clone(), Arc::new(Silent));
    let (root_id, v1) = root_with_draft(&store, &owner, "First").await;

    wf.submit(root_id, v1, &owner).await.unwrap();
    let root = store.find_root(root_id).await.unwrap();
    assert_eq!(root.status, RootStatus::PendingReview);
    assert_eq!(root.pending_version_id, Some(v1));

    wf.review(root_id, v1, &admin, ReviewDecision::Approve, None)
        .await
        .unwrap();
    let root = store.find_root(root_id).await.unwrap();
    assert_eq!(root.status, RootStatus::Published);
    assert_eq!(root.current_version_id, Some(v1));
    assert_eq!(root.pending_version_id, None);

    let v2 = wf.draft(root_id, &lesson("Second"), &owner).await.unwrap();
    wf.submit(root_id, v2.id, &owner).await.unwrap();
    // The published version stays current while the replacement is reviewed.
    let root = store.find_root(root_id).await.unwrap();
    assert_eq!(root.current_version_id, Some(v1));
    assert_eq!(root.status, RootStatus::PendingReview);

    let outcome = wf
        .review(root_id, v2.id, &admin, ReviewDecision::Approve, Some("ok".into()))
        .await
        .unwrap();
    assert_eq!(outcome.archived_version_id, Some(v1));

    let versions = store.list_versions(root_id).await.unwrap();
    let status_of = |id: DbId| versions.iter().find(|v| v.id == id).unwrap().status;
    assert_eq!(status_of(v1), VersionStatus::Archived);
    assert_eq!(status_of(v2.id), VersionStatus::Active);

    let history = store.audit_history(root_id).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].version_id, v2.id);
    assert_eq!(history[0].comments.as_deref(), Some("ok"));
}

#[sqlx::test(migrations = "./migrations")]
async fn failed_promote_rolls_back_the_archive(pool: PgPool) {
    let owner = new_user(&pool, "pub@example.com", Role::Company).await;
    let admin = new_user(&pool, "admin@example.com", Role::Admin).await;
    let store = Arc::new(LessonStore::new(pool.clone()));
    let wf = AuditWorkflow::new(store.clone(), Arc::new(Silent));
    let (root_id, v1) = root_with_draft(&store, &owner, "First").await;
    wf.submit(root_id, v1, &owner).await.unwrap();
    wf.review(root_id, v1, &admin, ReviewDecision::Approve, None)
        .await
        .unwrap();
    let v2 = wf.draft(root_id, &lesson("Second"), &owner).await.unwrap();
    wf.submit(root_id, v2.id, &owner).await.unwrap();

    // The audit row is written last; an unknown auditor fails its foreign key
    // after the prior version has already been archived inside the transaction.
    let audit = AuditEntry {
        auditor_id: 999_999,
        status: AuditStatus::Approved,
        comments: None,
    };
    let result = store.promote(root_id, v2.id, &audit).await;
    assert_matches!(result, Err(CoreError::Internal(_)));

    let root = store.find_root(root_id).await.unwrap();
    assert_eq!(root.current_version_id, Some(v1));
    assert_eq!(root.pending_version_id, Some(v2.id));
    assert_eq!(root.status, RootStatus::PendingReview);
    assert_eq!(
        store.find_version(root_id, v1).await.unwrap().status,
        VersionStatus::Active
    );
    assert_eq!(
        store.find_version(root_id, v2.id).await.unwrap().status,
        VersionStatus::PendingReview
    );
    assert_eq!(store.audit_history(root_id).await.unwrap().len(), 1);

    // A valid review still goes through afterwards.
    let outcome = wf
        .review(root_id, v2.id, &admin, ReviewDecision::Approve, None)
        .await
        .unwrap();
    assert_eq!(outcome.archived_version_id, Some(v1));
}

#[sqlx::test(migrations = "./migrations")]
async fn reject_keeps_current_version(pool: PgPool) {
    let owner = new_user(&pool, "pub@example.com", Role::Company).await;
    let admin = new_user(&pool, "admin@example.com", Role::Admin).await;
    let store = Arc::new(LessonStore::new(pool.clone()));
    let wf = AuditWorkflow::new(store.clone(), Arc::new(Silent));
    let (root_id, v1) = root_with_draft(&store, &owner, "First").await;
    wf.submit(root_id, v1, &owner).await.unwrap();
    wf.review(root_id, v1, &admin, ReviewDecision::Approve, None)
        .await
        .unwrap();

    let v2 = wf.draft(root_id, &lesson("Second"), &owner).await.unwrap();
    wf.submit(root_id, v2.id, &owner).await.unwrap();
    wf.review(root_id, v2.id, &admin, ReviewDecision::Reject, Some("typos".into()))
        .await
        .unwrap();

    let root = store.find_root(root_id).await.unwrap();
    assert_eq!(root.current_version_id, Some(v1));
    assert_eq!(root.pending_version_id, None);
    assert_eq!(root.status, RootStatus::Published);
    let v2 = store.find_version(root_id, v2.id).await.unwrap();
    assert_eq!(v2.status, VersionStatus::Rejected);
}

#[sqlx::test(migrations = "./migrations")]
async fn second_pending_submission_conflicts(pool: PgPool) {
    let owner = new_user(&pool, "pub@example.com", Role::Company).await;
    let store = LessonStore::new(pool.clone());
    let (root_id, v1) = root_with_draft(&store, &owner, "First").await;
    let v2 = store.create_version(root_id, &lesson("Second"), owner.id).await.unwrap();

    store.submit_for_review(root_id, v1).await.unwrap();
    // Re-submitting the pending version is a no-op.
    store.submit_for_review(root_id, v1).await.unwrap();

    let result = store.submit_for_review(root_id, v2.id).await;
    assert_matches!(result, Err(CoreError::Conflict(_)));
}

#[sqlx::test(migrations = "./migrations")]
async fn review_of_draft_is_invalid_state(pool: PgPool) {
    let owner = new_user(&pool, "pub@example.com", Role::Company).await;
    let admin = new_user(&pool, "admin@example.com", Role::Admin).await;
    let store = Arc::new(LessonStore::new(pool.clone()));
    let wf = AuditWorkflow::new(store.clone(), Arc::new(Silent));
    let (root_id, v1) = root_with_draft(&store, &owner, "First").await;

    let result = wf
        .review(root_id, v1, &admin, ReviewDecision::Approve, None)
        .await;
    assert_matches!(result, Err(CoreError::InvalidState(_)));
    assert!(store.audit_history(root_id).await.unwrap().is_empty());
}

#[sqlx::test(migrations = "./migrations")]
async fn concurrent_reviews_have_one_winner(pool: PgPool) {
    let owner = new_user(&pool, "pub@example.com", Role::Company).await;
    let admin_a = new_user(&pool, "a@example.com", Role::Admin).await;
    let admin_b = new_user(&pool, "b@example.com", Role::Admin).await;
    let store = Arc::new(LessonStore::new(pool.clone()));
    let (root_id, v1) = root_with_draft(&store, &owner, "Race").await;
    store.submit_for_review(root_id, v1).await.unwrap();

    let wf = AuditWorkflow::new(store.clone(), Arc::new(Silent));
    let (a, b) = tokio::join!(
        wf.review(root_id, v1, &admin_a, ReviewDecision::Approve, None),
        wf.review(root_id, v1, &admin_b, ReviewDecision::Reject, Some("no".into())),
    );

    let outcomes = [a, b];
    let winners = outcomes.iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1, "exactly one review must commit: {outcomes:?}");
    for loser in outcomes.iter().filter(|r| r.is_err()) {
        assert_matches!(
            loser,
            Err(CoreError::Conflict(_)) | Err(CoreError::InvalidState(_))
        );
    }

    let history = store.audit_history(root_id).await.unwrap();
    assert_eq!(history.len(), 1);
    let root = store.find_root(root_id).await.unwrap();
    assert_eq!(root.pending_version_id, None);
}

#[sqlx::test(migrations = "./migrations")]
async fn soft_deleted_root_hides_versions(pool: PgPool) {
    let owner = new_user(&pool, "pub@example.com", Role::Company).await;
    let store = MeetingStore::new(pool.clone());
    let now = chrono::Utc::now();
    let meeting = MeetingContent {
        name: "Standup".to_string(),
        description: None,
        cover_image_url: None,
        start_time: now,
        end_time: now + chrono::Duration::hours(1),
    };
    let created = store.create_root(owner.id, &(), &meeting).await.unwrap();

    store.soft_delete_root(created.root.id).await.unwrap();
    assert_matches!(
        store.find_root(created.root.id).await,
        Err(CoreError::NotFound { .. })
    );
    assert_matches!(
        store.find_version(created.root.id, created.version.id).await,
        Err(CoreError::NotFound { .. })
    );
    assert_matches!(
        store.soft_delete_root(created.root.id).await,
        Err(CoreError::NotFound { .. })
    );
}

#[sqlx::test(migrations = "./migrations")]
async fn publish_as_admin_records_auto_approval(pool: PgPool) {
    let admin = new_user(&pool, "admin@example.com", Role::Admin).await;
    let store = Arc::new(LessonStore::new(pool.clone()));
    let wf = AuditWorkflow::new(store.clone(), Arc::new(Silent));
    let (root_id, _) = root_with_draft(&store, &admin, "Draft").await;

    let outcome = wf
        .publish_as_admin(root_id, &lesson("Direct"), &admin)
        .await
        .unwrap();
    assert_eq!(outcome.version.version, 2);
    assert_eq!(
        outcome.audit.comments.as_deref(),
        Some(pioneer_core::versioning::AUTO_APPROVAL_COMMENT)
    );
    let root = store.find_root(root_id).await.unwrap();
    assert_eq!(root.current_version_id, Some(outcome.version.id));
}
