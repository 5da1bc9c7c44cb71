//! In-process `VersionStore` and `PublicationQuery`.
//!
//! Every mutation works on a copy of the state and swaps it in only once all
//! steps succeeded, so a failure half-way through leaves nothing behind. Roots
//! carry no visibility flag here; every published item is visible. A company
//! filter matches roots whose owner was registered with `assign_company`.

use std::collections::BTreeMap;
#[cfg(test)]
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;

use crate::error::CoreError;
use crate::publication::{
    Page, PageRequest, PublicationFilter, PublicationQuery, Published, Visibility,
};
use crate::search::contains_keyword;
use crate::types::{DbId, Timestamp};
use crate::versioning::status::{EntityKind, RootStatus, VersionStatus};
use crate::versioning::store::{
    AuditEntry, AuditRecord, ReviewOutcome, RootState, VersionContent, VersionState, VersionStore,
};

#[derive(Clone)]
struct StoredRoot {
    state: RootState,
    published_at: Option<Timestamp>,
    deleted: bool,
}

#[derive(Clone)]
struct StoredVersion<C> {
    state: VersionState,
    content: C,
    deleted: bool,
}

#[derive(Clone)]
struct StoredAudit {
    record: AuditRecord,
    root_id: DbId,
}

#[derive(Clone)]
struct MemoryState<C> {
    next_id: DbId,
    roots: BTreeMap<DbId, StoredRoot>,
    versions: BTreeMap<DbId, StoredVersion<C>>,
    audits: Vec<StoredAudit>,
    owner_companies: BTreeMap<DbId, DbId>,
}

impl<C> MemoryState<C> {
    fn allocate_id(&mut self) -> DbId {
        self.next_id += 1;
        self.next_id
    }

    fn live_root(&self, kind: EntityKind, root_id: DbId) -> Result<&StoredRoot, CoreError> {
        self.roots
            .get(&root_id)
            .filter(|r| !r.deleted)
            .ok_or_else(|| CoreError::not_found(kind.root_entity(), root_id))
    }

    fn live_version(
        &self,
        kind: EntityKind,
        root_id: DbId,
        version_id: DbId,
    ) -> Result<&StoredVersion<C>, CoreError> {
        self.live_root(kind, root_id)?;
        self.versions
            .get(&version_id)
            .filter(|v| !v.deleted && v.state.root_id == root_id)
            .ok_or_else(|| CoreError::not_found(kind.version_entity(), version_id))
    }

    fn set_version_status(&mut self, version_id: DbId, status: VersionStatus) {
        if let Some(v) = self.versions.get_mut(&version_id) {
            v.state.status = status;
        }
    }

    fn append_audit(&mut self, root_id: DbId, version_id: DbId, entry: &AuditEntry) -> AuditRecord {
        let record = AuditRecord {
            id: self.allocate_id(),
            uuid: uuid::Uuid::new_v4(),
            version_id,
            auditor_id: entry.auditor_id,
            audit_status: entry.status,
            comments: entry.comments.clone(),
            created_at: Utc::now(),
        };
        self.audits.push(StoredAudit {
            record: record.clone(),
            root_id,
        });
        record
    }
}

/// Guard shared by `promote` and `reject`: the version must still be the
/// root's pending version.
fn ensure_still_pending(
    kind: EntityKind,
    root: &RootState,
    version: &VersionState,
) -> Result<(), CoreError> {
    if version.status != VersionStatus::PendingReview
        || root.pending_version_id != Some(version.id)
    {
        return Err(CoreError::Conflict(format!(
            "{kind} version {} is no longer pending review",
            version.id
        )));
    }
    Ok(())
}

/// `VersionStore` backed by process memory.
pub struct MemoryVersionStore<C> {
    kind: EntityKind,
    state: Mutex<MemoryState<C>>,
    #[cfg(test)]
    fail_next_promote: AtomicBool,
}

impl<C: VersionContent + Clone + 'static> MemoryVersionStore<C> {
    pub fn new(kind: EntityKind) -> Self {
        Self {
            kind,
            state: Mutex::new(MemoryState {
                next_id: 0,
                roots: BTreeMap::new(),
                versions: BTreeMap::new(),
                audits: Vec::new(),
                owner_companies: BTreeMap::new(),
            }),
            #[cfg(test)]
            fail_next_promote: AtomicBool::new(false),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState<C>>, CoreError> {
        self.state
            .lock()
            .map_err(|_| CoreError::Internal("memory version store lock poisoned".to_string()))
    }

    /// Create an empty root owned by `owner_id`.
    pub fn create_root(&self, owner_id: DbId) -> Result<RootState, CoreError> {
        let mut state = self.lock()?;
        let now = Utc::now();
        let root = RootState {
            id: state.allocate_id(),
            uuid: uuid::Uuid::new_v4(),
            owner_id,
            status: RootStatus::Draft,
            current_version_id: None,
            pending_version_id: None,
            created_at: now,
            updated_at: now,
        };
        state.roots.insert(
            root.id,
            StoredRoot {
                state: root.clone(),
                published_at: None,
                deleted: false,
            },
        );
        Ok(root)
    }

    /// Soft-delete a root and all of its versions.
    pub fn soft_delete_root(&self, root_id: DbId) -> Result<bool, CoreError> {
        let mut state = self.lock()?;
        let Some(root) = state.roots.get_mut(&root_id).filter(|r| !r.deleted) else {
            return Ok(false);
        };
        root.deleted = true;
        for version in state.versions.values_mut() {
            if version.state.root_id == root_id {
                version.deleted = true;
            }
        }
        Ok(true)
    }

    /// The stored content of a live version.
    pub fn content(&self, root_id: DbId, version_id: DbId) -> Result<C, CoreError> {
        let state = self.lock()?;
        Ok(state.live_version(self.kind, root_id, version_id)?.content.clone())
    }

    /// Record `owner_id` as a member of `company_id` for company filters.
    pub fn assign_company(&self, owner_id: DbId, company_id: DbId) -> Result<(), CoreError> {
        self.lock()?.owner_companies.insert(owner_id, company_id);
        Ok(())
    }

    /// Make the next `promote` fail after archiving the prior version but
    /// before anything else is applied.
    #[cfg(test)]
    fn fail_next_promote(&self) {
        self.fail_next_promote.store(true, Ordering::SeqCst);
    }

    #[cfg(test)]
    fn promote_interrupted(&self) -> bool {
        self.fail_next_promote.swap(false, Ordering::SeqCst)
    }

    #[cfg(not(test))]
    fn promote_interrupted(&self) -> bool {
        false
    }
}

#[async_trait]
impl<C: VersionContent + Clone + 'static> VersionStore for MemoryVersionStore<C> {
    type Content = C;

    fn kind(&self) -> EntityKind {
        self.kind
    }

    async fn find_root(&self, root_id: DbId) -> Result<RootState, CoreError> {
        let state = self.lock()?;
        Ok(state.live_root(self.kind, root_id)?.state.clone())
    }

    async fn find_version(
        &self,
        root_id: DbId,
        version_id: DbId,
    ) -> Result<VersionState, CoreError> {
        let state = self.lock()?;
        Ok(state.live_version(self.kind, root_id, version_id)?.state.clone())
    }

    async fn list_versions(&self, root_id: DbId) -> Result<Vec<VersionState>, CoreError> {
        let state = self.lock()?;
        state.live_root(self.kind, root_id)?;
        let mut versions: Vec<VersionState> = state
            .versions
            .values()
            .filter(|v| !v.deleted && v.state.root_id == root_id)
            .map(|v| v.state.clone())
            .collect();
        versions.sort_by(|a, b| b.version.cmp(&a.version));
        Ok(versions)
    }

    async fn create_version(
        &self,
        root_id: DbId,
        content: &C,
        author_id: DbId,
    ) -> Result<VersionState, CoreError> {
        let mut state = self.lock()?;
        state.live_root(self.kind, root_id)?;
        // Deleted versions still hold their number.
        let next_number = state
            .versions
            .values()
            .filter(|v| v.state.root_id == root_id)
            .map(|v| v.state.version)
            .max()
            .unwrap_or(0)
            + 1;
        let version = VersionState {
            id: state.allocate_id(),
            uuid: uuid::Uuid::new_v4(),
            root_id,
            version: next_number,
            label: content.label().to_string(),
            status: VersionStatus::Draft,
            creator_id: author_id,
            created_at: Utc::now(),
        };
        state.versions.insert(
            version.id,
            StoredVersion {
                state: version.clone(),
                content: content.clone(),
                deleted: false,
            },
        );
        Ok(version)
    }

    async fn submit_for_review(
        &self,
        root_id: DbId,
        version_id: DbId,
    ) -> Result<VersionState, CoreError> {
        let mut state = self.lock()?;
        let root = state.live_root(self.kind, root_id)?.state.clone();
        let version = state.live_version(self.kind, root_id, version_id)?.state.clone();

        if root.pending_version_id == Some(version_id)
            && version.status == VersionStatus::PendingReview
        {
            return Ok(version);
        }
        if version.status != VersionStatus::Draft {
            return Err(CoreError::InvalidState(format!(
                "{} version {version_id} is {}, only drafts can be submitted",
                self.kind, version.status
            )));
        }
        if let Some(pending) = root.pending_version_id {
            return Err(CoreError::Conflict(format!(
                "{} {root_id} already has version {pending} pending review",
                self.kind
            )));
        }

        state.set_version_status(version_id, VersionStatus::PendingReview);
        if let Some(r) = state.roots.get_mut(&root_id) {
            r.state.pending_version_id = Some(version_id);
            r.state.status =
                RootStatus::from_pointers(r.state.current_version_id, Some(version_id));
            r.state.updated_at = Utc::now();
        }
        Ok(VersionState {
            status: VersionStatus::PendingReview,
            ..version
        })
    }

    async fn promote(
        &self,
        root_id: DbId,
        version_id: DbId,
        audit: &AuditEntry,
    ) -> Result<ReviewOutcome, CoreError> {
        let mut guard = self.lock()?;
        let mut work = (*guard).clone();

        let root = work.live_root(self.kind, root_id)?.state.clone();
        let version = work.live_version(self.kind, root_id, version_id)?.state.clone();
        ensure_still_pending(self.kind, &root, &version)?;

        let archived_version_id = root.current_version_id;
        if let Some(prior) = archived_version_id {
            work.set_version_status(prior, VersionStatus::Archived);
        }
        if self.promote_interrupted() {
            return Err(CoreError::Internal(
                "promote interrupted before commit".to_string(),
            ));
        }
        work.set_version_status(version_id, VersionStatus::Active);

        let now = Utc::now();
        if let Some(r) = work.roots.get_mut(&root_id) {
            r.state.current_version_id = Some(version_id);
            r.state.pending_version_id = None;
            r.state.status = RootStatus::Published;
            r.state.updated_at = now;
            r.published_at = Some(now);
        }
        let record = work.append_audit(root_id, version_id, audit);

        *guard = work;
        Ok(ReviewOutcome {
            version: VersionState {
                status: VersionStatus::Active,
                ..version
            },
            archived_version_id,
            audit: record,
        })
    }

    async fn reject(
        &self,
        root_id: DbId,
        version_id: DbId,
        audit: &AuditEntry,
    ) -> Result<ReviewOutcome, CoreError> {
        let mut guard = self.lock()?;
        let mut work = (*guard).clone();

        let root = work.live_root(self.kind, root_id)?.state.clone();
        let version = work.live_version(self.kind, root_id, version_id)?.state.clone();
        ensure_still_pending(self.kind, &root, &version)?;

        work.set_version_status(version_id, VersionStatus::Rejected);
        if let Some(r) = work.roots.get_mut(&root_id) {
            r.state.pending_version_id = None;
            r.state.status = RootStatus::from_pointers(r.state.current_version_id, None);
            r.state.updated_at = Utc::now();
        }
        let record = work.append_audit(root_id, version_id, audit);

        *guard = work;
        Ok(ReviewOutcome {
            version: VersionState {
                status: VersionStatus::Rejected,
                ..version
            },
            archived_version_id: None,
            audit: record,
        })
    }

    async fn audit_history(&self, root_id: DbId) -> Result<Vec<AuditRecord>, CoreError> {
        let state = self.lock()?;
        state.live_root(self.kind, root_id)?;
        Ok(state
            .audits
            .iter()
            .rev()
            .filter(|a| a.root_id == root_id)
            .map(|a| a.record.clone())
            .collect())
    }
}

#[async_trait]
impl<C: VersionContent + Clone + 'static> PublicationQuery for MemoryVersionStore<C> {
    type Item = Published<C>;

    async fn list_published(
        &self,
        filter: &PublicationFilter,
        page: PageRequest,
    ) -> Result<Page<Published<C>>, CoreError> {
        let state = self.lock()?;
        let mut matches: Vec<Published<C>> = state
            .roots
            .values()
            .filter(|r| !r.deleted)
            .filter(|r| filter.owner_id.is_none_or(|o| r.state.owner_id == o))
            .filter(|r| {
                filter.company_id.is_none_or(|c| {
                    state.owner_companies.get(&r.state.owner_id) == Some(&c)
                })
            })
            .filter(|r| filter.in_range(r.state.created_at))
            .filter_map(|r| published_view(&state, r))
            .filter(|p| match filter.keyword.as_deref() {
                Some(kw) => p
                    .content
                    .searchable_text()
                    .iter()
                    .any(|text| contains_keyword(text, kw)),
                None => true,
            })
            .collect();
        matches.sort_by(|a, b| {
            b.published_at
                .cmp(&a.published_at)
                .then(b.root_id.cmp(&a.root_id))
        });

        let total = matches.len() as i64;
        let items = matches
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit() as usize)
            .collect();
        Ok(Page::new(items, total, page))
    }

    async fn published_detail(
        &self,
        root_id: DbId,
        _visibility: Visibility,
    ) -> Result<Published<C>, CoreError> {
        let state = self.lock()?;
        let root = state.live_root(self.kind, root_id)?;
        published_view(&state, root)
            .ok_or_else(|| CoreError::not_found(self.kind.root_entity(), root_id))
    }
}

fn published_view<C: Clone>(state: &MemoryState<C>, root: &StoredRoot) -> Option<Published<C>> {
    let current_id = root.state.current_version_id?;
    let version = state.versions.get(&current_id).filter(|v| !v.deleted)?;
    Some(Published {
        root_id: root.state.id,
        root_uuid: root.state.uuid,
        owner_id: root.state.owner_id,
        version_id: version.state.id,
        version: version.state.version,
        content: version.content.clone(),
        published_at: root.published_at.unwrap_or(version.state.created_at),
        created_at: root.state.created_at,
        updated_at: root.state.updated_at,
    })
}
