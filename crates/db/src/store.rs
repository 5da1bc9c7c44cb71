//! PostgreSQL implementation of `VersionStore`.
//!
//! Every mutating operation runs in one transaction that first locks the
//! root row (`SELECT ... FOR UPDATE`). Concurrent reviews of the same root
//! therefore serialize, and the second one re-reads the pointers written by
//! the first and fails the pending check with `Conflict`. Status updates are
//! additionally conditioned on the expected prior status.

use std::marker::PhantomData;

use async_trait::async_trait;
use pioneer_core::error::CoreError;
use pioneer_core::publication::{Page, PageRequest, PublicationFilter, Visibility};
use pioneer_core::search::like_pattern;
use pioneer_core::types::DbId;
use pioneer_core::versioning::{
    AuditEntry, AuditRecord, EntityKind, ReviewOutcome, RootState, VersionContent, VersionState,
    VersionStatus, VersionStore,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::{PgConnection, PgPool};

use crate::filter::{BindValue, FilterBuilder};
use crate::models::versioning::{
    AuditHistoryEntry, AuditHistoryQuery, CreatedRoot, RootPointerRow, RootSummary,
    VersionDetail, VersionStateRow,
};
use crate::repositories::{AuditHistoryRepo, VersionStateRepo, VersionTables};

/// Per-family hooks used by [`PgVersionStore`].
#[async_trait]
pub trait PgEntity: Send + Sync + 'static {
    type Content: VersionContent + Serialize + DeserializeOwned + 'static;
    /// Extra root columns supplied at creation.
    type RootInput: Send + Sync;

    const TABLES: VersionTables;

    async fn insert_root(
        conn: &mut PgConnection,
        owner_id: DbId,
        input: &Self::RootInput,
    ) -> Result<RootPointerRow, sqlx::Error>;

    async fn insert_version(
        conn: &mut PgConnection,
        root_id: DbId,
        number: i32,
        content: &Self::Content,
        author_id: DbId,
    ) -> Result<VersionStateRow, sqlx::Error>;

    async fn load_content(
        pool: &PgPool,
        version_id: DbId,
    ) -> Result<Option<Self::Content>, sqlx::Error>;
}

/// `VersionStore` over one entity family's tables.
pub struct PgVersionStore<E> {
    pool: PgPool,
    _entity: PhantomData<fn() -> E>,
}

impl<E> Clone for PgVersionStore<E> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            _entity: PhantomData,
        }
    }
}

/// Map a database error into the core taxonomy.
///
/// Unique violations (one pending / one active version per root, version
/// numbering) can only come from a concurrent writer and surface as
/// `Conflict`; everything else is logged and reported as `Internal`.
pub fn map_db_error(kind: EntityKind, err: sqlx::Error) -> CoreError {
    if let sqlx::Error::Database(ref db) = err {
        if db.code().as_deref() == Some("23505") {
            return CoreError::Conflict(format!(
                "Concurrent modification of {kind}: {}",
                db.message()
            ));
        }
    }
    tracing::error!(entity = %kind, error = %err, "Version store query failed");
    CoreError::Internal(format!("Database error: {err}"))
}

impl<E: PgEntity> PgVersionStore<E> {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            _entity: PhantomData,
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn tables(&self) -> &'static VersionTables {
        &E::TABLES
    }

    fn db_err(&self) -> impl Fn(sqlx::Error) -> CoreError {
        let kind = E::TABLES.kind;
        move |e| map_db_error(kind, e)
    }

    fn root_not_found(&self, root_id: DbId) -> CoreError {
        CoreError::not_found(E::TABLES.kind.root_entity(), root_id)
    }

    fn version_not_found(&self, version_id: DbId) -> CoreError {
        CoreError::not_found(E::TABLES.kind.version_entity(), version_id)
    }

    /// Create a root together with its first draft version.
    pub async fn create_root(
        &self,
        owner_id: DbId,
        input: &E::RootInput,
        content: &E::Content,
    ) -> Result<CreatedRoot, CoreError> {
        content.validate()?;
        let mut tx = self.pool.begin().await.map_err(self.db_err())?;
        let root = E::insert_root(&mut tx, owner_id, input)
            .await
            .map_err(self.db_err())?;
        let version = E::insert_version(&mut tx, root.id, 1, content, owner_id)
            .await
            .map_err(self.db_err())?;
        tx.commit().await.map_err(self.db_err())?;

        tracing::info!(
            entity = %E::TABLES.kind,
            root_id = root.id,
            owner_id,
            "Root created with draft version 1",
        );
        Ok(CreatedRoot {
            root: root.into(),
            version: version.into(),
        })
    }

    /// Workflow state plus content of one version.
    pub async fn version_detail(
        &self,
        root_id: DbId,
        version_id: DbId,
    ) -> Result<VersionDetail<E::Content>, CoreError> {
        let state = self.find_version(root_id, version_id).await?;
        let content = E::load_content(&self.pool, version_id)
            .await
            .map_err(self.db_err())?
            .ok_or_else(|| self.version_not_found(version_id))?;
        Ok(VersionDetail { state, content })
    }

    /// Live roots, optionally of one owner and/or only those awaiting review.
    pub async fn list_roots(
        &self,
        owner_id: Option<DbId>,
        pending_only: bool,
        page: PageRequest,
    ) -> Result<Page<RootSummary>, CoreError> {
        let (items, total) =
            VersionStateRepo::list_roots(&self.pool, self.tables(), owner_id, pending_only, page)
                .await
                .map_err(self.db_err())?;
        Ok(Page::new(items, total, page))
    }

    /// Soft-delete a root and all its versions.
    pub async fn soft_delete_root(&self, root_id: DbId) -> Result<(), CoreError> {
        let deleted = VersionStateRepo::soft_delete_root(&self.pool, self.tables(), root_id)
            .await
            .map_err(self.db_err())?;
        if !deleted {
            return Err(self.root_not_found(root_id));
        }
        tracing::info!(entity = %E::TABLES.kind, root_id, "Root soft-deleted");
        Ok(())
    }

    /// Paginated audit ledger for this family.
    pub async fn list_audit_history(
        &self,
        params: &AuditHistoryQuery,
        page: PageRequest,
    ) -> Result<Page<AuditHistoryEntry>, CoreError> {
        if let (Some(from), Some(to)) = (params.from, params.to) {
            if from >= to {
                return Err(CoreError::Validation(
                    "from must be earlier than to".to_string(),
                ));
            }
        }
        let (items, total) = AuditHistoryRepo::list(&self.pool, self.tables(), params, page)
            .await
            .map_err(self.db_err())?;
        Ok(Page::new(items, total, page))
    }

    /// Soft-delete one audit row.
    pub async fn soft_delete_audit(&self, audit_id: DbId) -> Result<(), CoreError> {
        let deleted = AuditHistoryRepo::soft_delete(&self.pool, self.tables(), audit_id)
            .await
            .map_err(self.db_err())?;
        if !deleted {
            return Err(CoreError::not_found("audit_history", audit_id));
        }
        Ok(())
    }

    /// Lock the root and load the version inside `tx`.
    async fn lock_pair(
        &self,
        conn: &mut PgConnection,
        root_id: DbId,
        version_id: DbId,
    ) -> Result<(RootPointerRow, VersionStateRow), CoreError> {
        let root = VersionStateRepo::lock_root(&mut *conn, self.tables(), root_id)
            .await
            .map_err(self.db_err())?
            .ok_or_else(|| self.root_not_found(root_id))?;
        let version = VersionStateRepo::find_version(&mut *conn, self.tables(), root_id, version_id)
            .await
            .map_err(self.db_err())?
            .ok_or_else(|| self.version_not_found(version_id))?;
        Ok((root, version))
    }

    fn ensure_still_pending(
        &self,
        root: &RootPointerRow,
        version: &VersionStateRow,
    ) -> Result<(), CoreError> {
        if version.status != VersionStatus::PendingReview
            || root.pending_version_id != Some(version.id)
        {
            return Err(CoreError::Conflict(format!(
                "{} version {} is no longer pending review",
                E::TABLES.kind,
                version.id
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl<E: PgEntity> VersionStore for PgVersionStore<E> {
    type Content = E::Content;

    fn kind(&self) -> EntityKind {
        E::TABLES.kind
    }

    async fn find_root(&self, root_id: DbId) -> Result<RootState, CoreError> {
        VersionStateRepo::find_root(&self.pool, self.tables(), root_id)
            .await
            .map_err(self.db_err())?
            .map(RootState::from)
            .ok_or_else(|| self.root_not_found(root_id))
    }

    async fn find_version(
        &self,
        root_id: DbId,
        version_id: DbId,
    ) -> Result<VersionState, CoreError> {
        let mut conn = self.pool.acquire().await.map_err(self.db_err())?;
        VersionStateRepo::find_version(&mut conn, self.tables(), root_id, version_id)
            .await
            .map_err(self.db_err())?
            .map(VersionState::from)
            .ok_or_else(|| self.version_not_found(version_id))
    }

    async fn list_versions(&self, root_id: DbId) -> Result<Vec<VersionState>, CoreError> {
        self.find_root(root_id).await?;
        let rows = VersionStateRepo::list_versions(&self.pool, self.tables(), root_id)
            .await
            .map_err(self.db_err())?;
        Ok(rows.into_iter().map(VersionState::from).collect())
    }

    async fn create_version(
        &self,
        root_id: DbId,
        content: &E::Content,
        author_id: DbId,
    ) -> Result<VersionState, CoreError> {
        let mut tx = self.pool.begin().await.map_err(self.db_err())?;
        VersionStateRepo::lock_root(&mut tx, self.tables(), root_id)
            .await
            .map_err(self.db_err())?
            .ok_or_else(|| self.root_not_found(root_id))?;
        let number = VersionStateRepo::next_version_number(&mut tx, self.tables(), root_id)
            .await
            .map_err(self.db_err())?;
        let row = E::insert_version(&mut tx, root_id, number, content, author_id)
            .await
            .map_err(self.db_err())?;
        tx.commit().await.map_err(self.db_err())?;
        Ok(row.into())
    }

    async fn submit_for_review(
        &self,
        root_id: DbId,
        version_id: DbId,
    ) -> Result<VersionState, CoreError> {
        let mut tx = self.pool.begin().await.map_err(self.db_err())?;
        let (root, version) = self.lock_pair(&mut tx, root_id, version_id).await?;

        if root.pending_version_id == Some(version_id)
            && version.status == VersionStatus::PendingReview
        {
            return Ok(version.into());
        }
        if version.status != VersionStatus::Draft {
            return Err(CoreError::InvalidState(format!(
                "{} version {version_id} is {}, only drafts can be submitted",
                E::TABLES.kind,
                version.status
            )));
        }
        if let Some(pending) = root.pending_version_id {
            return Err(CoreError::Conflict(format!(
                "{} {root_id} already has version {pending} pending review",
                E::TABLES.kind
            )));
        }

        let moved = VersionStateRepo::transition(
            &mut tx,
            self.tables(),
            version_id,
            VersionStatus::Draft,
            VersionStatus::PendingReview,
        )
        .await
        .map_err(self.db_err())?;
        if !moved {
            return Err(CoreError::Conflict(format!(
                "{} version {version_id} changed concurrently",
                E::TABLES.kind
            )));
        }
        VersionStateRepo::set_pointers(
            &mut tx,
            self.tables(),
            root_id,
            root.current_version_id,
            Some(version_id),
            false,
        )
        .await
        .map_err(self.db_err())?;
        tx.commit().await.map_err(self.db_err())?;

        Ok(VersionState {
            status: VersionStatus::PendingReview,
            ..VersionState::from(version)
        })
    }

    async fn promote(
        &self,
        root_id: DbId,
        version_id: DbId,
        audit: &AuditEntry,
    ) -> Result<ReviewOutcome, CoreError> {
        let mut tx = self.pool.begin().await.map_err(self.db_err())?;
        let (root, version) = self.lock_pair(&mut tx, root_id, version_id).await?;
        self.ensure_still_pending(&root, &version)?;

        // Archive first: at most one active version per root at any statement.
        let archived_version_id = root.current_version_id;
        if let Some(prior) = archived_version_id {
            VersionStateRepo::transition(
                &mut tx,
                self.tables(),
                prior,
                VersionStatus::Active,
                VersionStatus::Archived,
            )
            .await
            .map_err(self.db_err())?;
        }
        let activated = VersionStateRepo::transition(
            &mut tx,
            self.tables(),
            version_id,
            VersionStatus::PendingReview,
            VersionStatus::Active,
        )
        .await
        .map_err(self.db_err())?;
        if !activated {
            return Err(CoreError::Conflict(format!(
                "{} version {version_id} is no longer pending review",
                E::TABLES.kind
            )));
        }
        VersionStateRepo::set_pointers(&mut tx, self.tables(), root_id, Some(version_id), None, true)
            .await
            .map_err(self.db_err())?;
        let record = VersionStateRepo::insert_audit(&mut tx, self.tables(), version_id, audit)
            .await
            .map_err(self.db_err())?;
        tx.commit().await.map_err(self.db_err())?;

        Ok(ReviewOutcome {
            version: VersionState {
                status: VersionStatus::Active,
                ..VersionState::from(version)
            },
            archived_version_id,
            audit: record.into(),
        })
    }

    async fn reject(
        &self,
        root_id: DbId,
        version_id: DbId,
        audit: &AuditEntry,
    ) -> Result<ReviewOutcome, CoreError> {
        let mut tx = self.pool.begin().await.map_err(self.db_err())?;
        let (root, version) = self.lock_pair(&mut tx, root_id, version_id).await?;
        self.ensure_still_pending(&root, &version)?;

        let rejected = VersionStateRepo::transition(
            &mut tx,
            self.tables(),
            version_id,
            VersionStatus::PendingReview,
            VersionStatus::Rejected,
        )
        .await
        .map_err(self.db_err())?;
        if !rejected {
            return Err(CoreError::Conflict(format!(
                "{} version {version_id} is no longer pending review",
                E::TABLES.kind
            )));
        }
        VersionStateRepo::set_pointers(
            &mut tx,
            self.tables(),
            root_id,
            root.current_version_id,
            None,
            false,
        )
        .await
        .map_err(self.db_err())?;
        let record = VersionStateRepo::insert_audit(&mut tx, self.tables(), version_id, audit)
            .await
            .map_err(self.db_err())?;
        tx.commit().await.map_err(self.db_err())?;

        Ok(ReviewOutcome {
            version: VersionState {
                status: VersionStatus::Rejected,
                ..VersionState::from(version)
            },
            archived_version_id: None,
            audit: record.into(),
        })
    }

    async fn audit_history(&self, root_id: DbId) -> Result<Vec<AuditRecord>, CoreError> {
        self.find_root(root_id).await?;
        let rows = VersionStateRepo::audit_history_for_root(&self.pool, self.tables(), root_id)
            .await
            .map_err(self.db_err())?;
        Ok(rows.into_iter().map(AuditRecord::from).collect())
    }
}

// ---------------------------------------------------------------------------
// Published-listing filter
// ---------------------------------------------------------------------------

/// Build the WHERE clause for a published listing.
///
/// Expects the root aliased as `r` and its current version joined as `v`.
/// `scoped` enables the `company_id` / `visible` columns that only news has;
/// other families match `company_id` against the owner's company instead.
pub(crate) fn published_filter(
    t: &VersionTables,
    text_columns: &[&str],
    scoped: bool,
    filter: &PublicationFilter,
) -> FilterBuilder {
    let mut f = FilterBuilder::new();
    f.push_raw("r.deleted_at IS NULL");
    f.push_raw("v.deleted_at IS NULL");

    if let Some(ref keyword) = filter.keyword {
        let any_column = text_columns
            .iter()
            .map(|c| format!("v.{c} ILIKE {{}}"))
            .collect::<Vec<_>>()
            .join(" OR ");
        f.push(&format!("({any_column})"), BindValue::Text(like_pattern(keyword)));
    }
    if let Some(from) = filter.created_from {
        f.push("r.created_at >= {}", BindValue::Timestamp(from));
    }
    if let Some(to) = filter.created_to {
        f.push("r.created_at < {}", BindValue::Timestamp(to));
    }
    if let Some(owner_id) = filter.owner_id {
        f.push(
            &format!("r.{} = {{}}", t.owner_column),
            BindValue::BigInt(owner_id),
        );
    }
    if scoped {
        if let Some(company_id) = filter.company_id {
            f.push("r.company_id = {}", BindValue::BigInt(company_id));
        }
        match filter.visibility {
            Visibility::Everything => {}
            Visibility::PublicOnly => f.push_raw("r.visible"),
            Visibility::PublicOrCompany(company_id) => {
                f.push("(r.visible OR r.company_id = {})", BindValue::BigInt(company_id))
            }
        }
    } else if let Some(company_id) = filter.company_id {
        f.push(
            &format!(
                "r.{} IN (SELECT u.id FROM users u WHERE u.company_id = {{}})",
                t.owner_column
            ),
            BindValue::BigInt(company_id),
        );
    }
    f
}
