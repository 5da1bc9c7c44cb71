//! Repository for the `revoked_tokens` access-token blacklist.

use pioneer_core::types::{DbId, Timestamp};
use sqlx::PgPool;

/// Records access tokens (by `jti`) that must be rejected before they expire.
pub struct RevokedTokenRepo;

impl RevokedTokenRepo {
    /// Blacklist a token. Revoking the same `jti` twice is a no-op.
    pub async fn revoke(
        pool: &PgPool,
        jti: &str,
        user_id: DbId,
        expires_at: Timestamp,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO revoked_tokens (jti, user_id, expires_at)
             VALUES ($1, $2, $3)
             ON CONFLICT (jti) DO NOTHING",
        )
        .bind(jti)
        .bind(user_id)
        .bind(expires_at)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Whether a token has been revoked.
    pub async fn is_revoked(pool: &PgPool, jti: &str) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM revoked_tokens WHERE jti = $1)")
            .bind(jti)
            .fetch_one(pool)
            .await
    }

    /// Remove entries whose token would be rejected for expiry anyway.
    pub async fn purge_expired(pool: &PgPool) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM revoked_tokens WHERE expires_at < NOW()")
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
