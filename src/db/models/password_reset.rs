use chrono::NaiveDateTime;
use sqlx::FromRow;

/// One-time password reset token. `id` is the random value sent by email.
#[derive(Debug, Clone, FromRow)]
pub struct PasswordResetToken {
    pub id: String,
    pub user_id: i64,
    pub created_at: NaiveDateTime,
    pub expires_at: NaiveDateTime,
    pub used: bool,
}
