use chrono::NaiveDateTime;
use sqlx::FromRow;

/// A stored refresh token. Only the SHA-256 hash of the opaque value is kept.
#[derive(Debug, Clone, FromRow)]
pub struct RefreshToken {
    pub id: String,
    pub token_hash: String,
    pub user_id: i64,
    pub created_at: NaiveDateTime,
    pub expires_at: NaiveDateTime,
}
