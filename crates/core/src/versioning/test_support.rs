//! Fixtures shared by the versioning unit tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Barrier;

use crate::error::CoreError;
use crate::notification::{Notice, NotificationBridge};
use crate::types::DbId;
use crate::validation::validate_required;
use crate::versioning::status::EntityKind;
use crate::versioning::store::{
    AuditEntry, AuditRecord, ReviewOutcome, RootState, VersionContent, VersionState, VersionStore,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Note {
    pub title: String,
    pub body: String,
}

impl VersionContent for Note {
    fn label(&self) -> &str {
        &self.title
    }

    fn validate(&self) -> Result<(), CoreError> {
        validate_required("title", &self.title, 50)
    }

    fn searchable_text(&self) -> Vec<&str> {
        vec![&self.title, &self.body]
    }
}

pub fn note(title: &str) -> Note {
    Note {
        title: title.to_string(),
        body: format!("body of {title}"),
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<Notice> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationBridge for RecordingNotifier {
    async fn notify(&self, notice: Notice) -> Result<(), CoreError> {
        self.sent.lock().unwrap().push(notice);
        Ok(())
    }
}

pub struct FailingNotifier;

#[async_trait]
impl NotificationBridge for FailingNotifier {
    async fn notify(&self, _notice: Notice) -> Result<(), CoreError> {
        Err(CoreError::Internal("notification sink unavailable".to_string()))
    }
}

/// Delegating store whose `find_version` waits on a barrier once armed, so
/// concurrent reviewers all pass the pending check before any of them writes.
pub struct GatedStore<S> {
    inner: Arc<S>,
    barrier: Barrier,
    armed: AtomicBool,
}

impl<S> GatedStore<S> {
    pub fn new(inner: Arc<S>, parties: usize) -> Self {
        Self {
            inner,
            barrier: Barrier::new(parties),
            armed: AtomicBool::new(false),
        }
    }

    pub fn arm(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl<S: VersionStore> VersionStore for GatedStore<S> {
    type Content = S::Content;

    fn kind(&self) -> EntityKind {
        self.inner.kind()
    }

    async fn find_root(&self, root_id: DbId) -> Result<RootState, CoreError> {
        self.inner.find_root(root_id).await
    }

    async fn find_version(
        &self,
        root_id: DbId,
        version_id: DbId,
    ) -> Result<VersionState, CoreError> {
        let version = self.inner.find_version(root_id, version_id).await;
        if self.armed.load(Ordering::SeqCst) {
            self.barrier.wait().await;
        }
        version
    }

    async fn list_versions(&self, root_id: DbId) -> Result<Vec<VersionState>, CoreError> {
        self.inner.list_versions(root_id).await
    }

    async fn create_version(
        &self,
        root_id: DbId,
        content: &Self::Content,
        author_id: DbId,
    ) -> Result<VersionState, CoreError> {
        self.inner.create_version(root_id, content, author_id).await
    }

    async fn submit_for_review(
        &self,
        root_id: DbId,
        version_id: DbId,
    ) -> Result<VersionState, CoreError> {
        self.inner.submit_for_review(root_id, version_id).await
    }

    async fn promote(
        &self,
        root_id: DbId,
        version_id: DbId,
        audit: &AuditEntry,
    ) -> Result<ReviewOutcome, CoreError> {
        self.inner.promote(root_id, version_id, audit).await
    }

    async fn reject(
        &self,
        root_id: DbId,
        version_id: DbId,
        audit: &AuditEntry,
    ) -> Result<ReviewOutcome, CoreError> {
        self.inner.reject(root_id, version_id, audit).await
    }

    async fn audit_history(&self, root_id: DbId) -> Result<Vec<AuditRecord>, CoreError> {
        self.inner.audit_history(root_id).await
    }
}
