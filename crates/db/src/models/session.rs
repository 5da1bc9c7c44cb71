use pioneer_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// Longest `User-Agent` kept on a session row.
pub const MAX_USER_AGENT_LEN: usize = 512;

/// A refresh-token session. Only the SHA-256 of the token is stored.
#[derive(Debug, Clone, FromRow)]
pub struct UserSession {
    pub id: DbId,
    pub user_id: DbId,
    pub refresh_token_hash: String,
    pub expires_at: Timestamp,
    pub is_revoked: bool,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone)]
pub struct CreateSession {
    pub user_id: DbId,
    pub refresh_token_hash: String,
    pub expires_at: Timestamp,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
}

impl CreateSession {
    /// Attach client details, truncating an oversized user agent.
    pub fn with_client(mut self, user_agent: Option<&str>, ip_address: Option<&str>) -> Self {
        self.user_agent = user_agent.map(|ua| ua.chars().take(MAX_USER_AGENT_LEN).collect());
        self.ip_address = ip_address.map(str::to_string);
        self
    }
}
