//! Workflow operations shared by the `lessons`, `meetings` and `news` families.
//!
//! Every family has the same shape (root, versions, audit history), differing
//! only in table and column names, captured by [`VersionTables`]. Functions
//! taking `&mut PgConnection` are steps meant to run inside a caller's
//! transaction.

use pioneer_core::publication::PageRequest;
use pioneer_core::types::DbId;
use pioneer_core::versioning::{AuditEntry, EntityKind, RootStatus, VersionStatus};
use sqlx::{PgConnection, PgPool};

use crate::models::versioning::{
    AuditHistoryRow, RootPointerRow, RootSummary, VersionStateRow,
};

/// Table and column names for one versioned entity family.
#[derive(Debug, Clone, Copy)]
pub struct VersionTables {
    pub kind: EntityKind,
    pub roots: &'static str,
    pub owner_column: &'static str,
    pub versions: &'static str,
    pub root_fk: &'static str,
    pub label_column: &'static str,
    pub audits: &'static str,
}

pub const LESSON_TABLES: VersionTables = VersionTables {
    kind: EntityKind::Lesson,
    roots: "lessons",
    owner_column: "publisher_id",
    versions: "lesson_versions",
    root_fk: "lesson_id",
    label_column: "name",
    audits: "lesson_audit_history",
};

pub const MEETING_TABLES: VersionTables = VersionTables {
    kind: EntityKind::Meeting,
    roots: "meetings",
    owner_column: "creator_id",
    versions: "meeting_versions",
    root_fk: "meeting_id",
    label_column: "name",
    audits: "meeting_audit_history",
};

pub const NEWS_TABLES: VersionTables = VersionTables {
    kind: EntityKind::News,
    roots: "news",
    owner_column: "publisher_id",
    versions: "news_versions",
    root_fk: "news_id",
    label_column: "title",
    audits: "news_audit_history",
};

impl VersionTables {
    /// SELECT list producing a [`RootPointerRow`].
    pub fn root_columns(&self) -> String {
        format!(
            "id, uuid, {} AS owner_id, status, current_version_id, pending_version_id, \
             created_at, updated_at",
            self.owner_column
        )
    }

    /// SELECT list producing a [`VersionStateRow`].
    pub fn version_columns(&self) -> String {
        format!(
            "id, uuid, {} AS root_id, version, {} AS label, status, creator_id, created_at",
            self.root_fk, self.label_column
        )
    }
}

const AUDIT_COLUMNS: &str =
    "id, uuid, version_id, auditor_id, audit_status, comments, created_at";

/// Provides the pointer, status and audit operations of the review workflow.
pub struct VersionStateRepo;

impl VersionStateRepo {
    // ── Roots ────────────────────────────────────────────────────────

    /// Insert an empty root owned by `owner_id`.
    pub async fn insert_root(
        conn: &mut PgConnection,
        t: &VersionTables,
        owner_id: DbId,
    ) -> Result<RootPointerRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO {} ({}) VALUES ($1) RETURNING {}",
            t.roots,
            t.owner_column,
            t.root_columns()
        );
        sqlx::query_as::<_, RootPointerRow>(&query)
            .bind(owner_id)
            .fetch_one(conn)
            .await
    }

    /// Find a live root by ID. Excludes soft-deleted rows.
    pub async fn find_root(
        pool: &PgPool,
        t: &VersionTables,
        root_id: DbId,
    ) -> Result<Option<RootPointerRow>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM {} WHERE id = $1 AND deleted_at IS NULL",
            t.root_columns(),
            t.roots
        );
        sqlx::query_as::<_, RootPointerRow>(&query)
            .bind(root_id)
            .fetch_optional(pool)
            .await
    }

    /// Lock a live root row for the rest of the transaction.
    ///
    /// Concurrent writers to the same root queue here, so pointer checks made
    /// after this call see the latest committed state.
    pub async fn lock_root(
        conn: &mut PgConnection,
        t: &VersionTables,
        root_id: DbId,
    ) -> Result<Option<RootPointerRow>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM {} WHERE id = $1 AND deleted_at IS NULL FOR UPDATE",
            t.root_columns(),
            t.roots
        );
        sqlx::query_as::<_, RootPointerRow>(&query)
            .bind(root_id)
            .fetch_optional(conn)
            .await
    }

    /// Overwrite both pointers and the derived root status.
    pub async fn set_pointers(
        conn: &mut PgConnection,
        t: &VersionTables,
        root_id: DbId,
        current_version_id: Option<DbId>,
        pending_version_id: Option<DbId>,
        mark_published: bool,
    ) -> Result<(), sqlx::Error> {
        let status = RootStatus::from_pointers(current_version_id, pending_version_id);
        let query = format!(
            "UPDATE {} SET current_version_id = $2, pending_version_id = $3, status = $4, \
                 published_at = CASE WHEN $5 THEN NOW() ELSE published_at END, \
                 updated_at = NOW() \
             WHERE id = $1",
            t.roots
        );
        sqlx::query(&query)
            .bind(root_id)
            .bind(current_version_id)
            .bind(pending_version_id)
            .bind(status.as_str())
            .bind(mark_published)
            .execute(conn)
            .await?;
        Ok(())
    }

    /// List live roots, newest first, optionally restricted to one owner
    /// and/or to roots with a pending version. Returns the page and the total.
    pub async fn list_roots(
        pool: &PgPool,
        t: &VersionTables,
        owner_id: Option<DbId>,
        pending_only: bool,
        page: PageRequest,
    ) -> Result<(Vec<RootSummary>, i64), sqlx::Error> {
        let pending = if pending_only {
            "AND r.pending_version_id IS NOT NULL"
        } else {
            ""
        };
        let filter = format!(
            "r.deleted_at IS NULL AND ($1::BIGINT IS NULL OR r.{owner} = $1) {pending}",
            owner = t.owner_column
        );
        let query = format!(
            "SELECT r.id, r.uuid, r.{owner} AS owner_id, r.status, r.current_version_id, \
                    r.pending_version_id, lv.version AS latest_version, \
                    lv.{label} AS latest_label, r.created_at, r.updated_at \
             FROM {roots} r \
             LEFT JOIN LATERAL ( \
                 SELECT v.version, v.{label} FROM {versions} v \
                 WHERE v.{fk} = r.id AND v.deleted_at IS NULL \
                 ORDER BY v.version DESC LIMIT 1 \
             ) lv ON TRUE \
             WHERE {filter} \
             ORDER BY r.updated_at DESC, r.id DESC \
             LIMIT $2 OFFSET $3",
            owner = t.owner_column,
            label = t.label_column,
            roots = t.roots,
            versions = t.versions,
            fk = t.root_fk,
        );
        let items = sqlx::query_as::<_, RootSummary>(&query)
            .bind(owner_id)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(pool)
            .await?;

        let count_query = format!("SELECT COUNT(*) FROM {} r WHERE {filter}", t.roots);
        let total: i64 = sqlx::query_scalar(&count_query)
            .bind(owner_id)
            .fetch_one(pool)
            .await?;
        Ok((items, total))
    }

    /// Soft-delete a root and every one of its versions. Returns `true` if the
    /// root was live.
    pub async fn soft_delete_root(
        pool: &PgPool,
        t: &VersionTables,
        root_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let query = format!(
            "UPDATE {} SET deleted_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND deleted_at IS NULL",
            t.roots
        );
        let result = sqlx::query(&query).bind(root_id).execute(&mut *tx).await?;
        if result.rows_affected() == 0 {
            return Ok(false);
        }
        let query = format!(
            "UPDATE {} SET deleted_at = NOW() WHERE {} = $1 AND deleted_at IS NULL",
            t.versions, t.root_fk
        );
        sqlx::query(&query).bind(root_id).execute(&mut *tx).await?;
        tx.commit().await?;
        Ok(true)
    }

    // ── Versions ─────────────────────────────────────────────────────

    /// Find a live version belonging to `root_id`.
    pub async fn find_version(
        conn: &mut PgConnection,
        t: &VersionTables,
        root_id: DbId,
        version_id: DbId,
    ) -> Result<Option<VersionStateRow>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM {} WHERE id = $1 AND {} = $2 AND deleted_at IS NULL",
            t.version_columns(),
            t.versions,
            t.root_fk
        );
        sqlx::query_as::<_, VersionStateRow>(&query)
            .bind(version_id)
            .bind(root_id)
            .fetch_optional(conn)
            .await
    }

    /// List live versions of a root, newest first.
    pub async fn list_versions(
        pool: &PgPool,
        t: &VersionTables,
        root_id: DbId,
    ) -> Result<Vec<VersionStateRow>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM {} WHERE {} = $1 AND deleted_at IS NULL ORDER BY version DESC",
            t.version_columns(),
            t.versions,
            t.root_fk
        );
        sqlx::query_as::<_, VersionStateRow>(&query)
            .bind(root_id)
            .fetch_all(pool)
            .await
    }

    /// Next version number for a root (max existing + 1, or 1 if none).
    ///
    /// Soft-deleted versions still count, so numbers are never reused.
    pub async fn next_version_number(
        conn: &mut PgConnection,
        t: &VersionTables,
        root_id: DbId,
    ) -> Result<i32, sqlx::Error> {
        let query = format!(
            "SELECT COALESCE(MAX(version), 0) + 1 FROM {} WHERE {} = $1",
            t.versions, t.root_fk
        );
        sqlx::query_scalar::<_, i32>(&query)
            .bind(root_id)
            .fetch_one(conn)
            .await
    }

    /// Move a version from `from` to `to`. Returns `false` when the version was
    /// no longer in `from`, in which case nothing changed.
    pub async fn transition(
        conn: &mut PgConnection,
        t: &VersionTables,
        version_id: DbId,
        from: VersionStatus,
        to: VersionStatus,
    ) -> Result<bool, sqlx::Error> {
        let query = format!(
            "UPDATE {} SET status = $3 \
             WHERE id = $1 AND status = $2 AND deleted_at IS NULL",
            t.versions
        );
        let result = sqlx::query(&query)
            .bind(version_id)
            .bind(from.as_str())
            .bind(to.as_str())
            .execute(conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // ── Audit history ────────────────────────────────────────────────

    /// Append an audit row for `version_id`.
    pub async fn insert_audit(
        conn: &mut PgConnection,
        t: &VersionTables,
        version_id: DbId,
        entry: &AuditEntry,
    ) -> Result<AuditHistoryRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO {} (version_id, auditor_id, audit_status, comments) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {AUDIT_COLUMNS}",
            t.audits
        );
        sqlx::query_as::<_, AuditHistoryRow>(&query)
            .bind(version_id)
            .bind(entry.auditor_id)
            .bind(entry.status.as_str())
            .bind(&entry.comments)
            .fetch_one(conn)
            .await
    }

    /// Live audit rows for every version of a root, newest first.
    pub async fn audit_history_for_root(
        pool: &PgPool,
        t: &VersionTables,
        root_id: DbId,
    ) -> Result<Vec<AuditHistoryRow>, sqlx::Error> {
        let query = format!(
            "SELECT a.id, a.uuid, a.version_id, a.auditor_id, a.audit_status, a.comments, \
                    a.created_at \
             FROM {audits} a \
             JOIN {versions} v ON v.id = a.version_id \
             WHERE v.{fk} = $1 AND a.deleted_at IS NULL \
             ORDER BY a.created_at DESC, a.id DESC",
            audits = t.audits,
            versions = t.versions,
            fk = t.root_fk,
        );
        sqlx::query_as::<_, AuditHistoryRow>(&query)
            .bind(root_id)
            .fetch_all(pool)
            .await
    }
}
