//! Admin queries over the `*_audit_history` ledgers.
//!
//! Rows are append-only; the only mutation offered here is soft deletion.

use pioneer_core::publication::PageRequest;
use pioneer_core::types::DbId;
use sqlx::PgPool;

use crate::filter::{bind_values, bind_values_scalar, BindValue, FilterBuilder};
use crate::models::versioning::{AuditHistoryEntry, AuditHistoryQuery};
use crate::repositories::version_state_repo::VersionTables;

/// Provides listing and soft deletion of audit history rows.
pub struct AuditHistoryRepo;

impl AuditHistoryRepo {
    /// List live audit rows joined with their version, newest first.
    ///
    /// Returns the page and the total number of matching rows.
    pub async fn list(
        pool: &PgPool,
        t: &VersionTables,
        params: &AuditHistoryQuery,
        page: PageRequest,
    ) -> Result<(Vec<AuditHistoryEntry>, i64), sqlx::Error> {
        let filter = build_audit_filter(t, params);
        let where_clause = filter.where_clause();
        let from = format!(
            "FROM {audits} a JOIN {versions} v ON v.id = a.version_id {where_clause}",
            audits = t.audits,
            versions = t.versions,
        );

        let limit_idx = filter.next_index();
        let query = format!(
            "SELECT a.id, a.uuid, v.{fk} AS root_id, a.version_id, v.version, \
                    v.{label} AS label, a.auditor_id, a.audit_status, a.comments, a.created_at \
             {from} \
             ORDER BY a.created_at DESC, a.id DESC \
             LIMIT ${limit_idx} OFFSET ${}",
            limit_idx + 1,
            fk = t.root_fk,
            label = t.label_column,
        );
        let items = bind_values(sqlx::query_as::<_, AuditHistoryEntry>(&query), filter.binds())
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(pool)
            .await?;

        let count_query = format!("SELECT COUNT(*) {from}");
        let total = bind_values_scalar(sqlx::query_scalar::<_, i64>(&count_query), filter.binds())
            .fetch_one(pool)
            .await?;
        Ok((items, total))
    }

    /// Soft-delete one audit row. Returns `true` if a live row was marked.
    pub async fn soft_delete(
        pool: &PgPool,
        t: &VersionTables,
        audit_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let query = format!(
            "UPDATE {} SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
            t.audits
        );
        let result = sqlx::query(&query).bind(audit_id).execute(pool).await?;
        Ok(result.rows_affected() > 0)
    }
}

fn build_audit_filter(t: &VersionTables, params: &AuditHistoryQuery) -> FilterBuilder {
    let mut f = FilterBuilder::new();
    f.push_raw("a.deleted_at IS NULL");
    if let Some(status) = params.audit_status {
        f.push("a.audit_status = {}", BindValue::Text(status.as_str().to_string()));
    }
    if let Some(from) = params.from {
        f.push("a.created_at >= {}", BindValue::Timestamp(from));
    }
    if let Some(to) = params.to {
        f.push("a.created_at < {}", BindValue::Timestamp(to));
    }
    if let Some(root_id) = params.root_id {
        f.push(&format!("v.{} = {{}}", t.root_fk), BindValue::BigInt(root_id));
    }
    f
}

#[cfg(test)]
mod tests {
    use pioneer_core::versioning::AuditStatus;

    use super::*;
    use crate::repositories::version_state_repo::LESSON_TABLES;

    #[test]
    fn filter_includes_requested_conditions() {
        let params = AuditHistoryQuery {
            audit_status: Some(AuditStatus::Rejected),
            root_id: Some(3),
            ..Default::default()
        };
        let f = build_audit_filter(&LESSON_TABLES, &params);
        assert_eq!(
            f.where_clause(),
            "WHERE a.deleted_at IS NULL AND a.audit_status = $1 AND v.lesson_id = $2"
        );
    }
}
