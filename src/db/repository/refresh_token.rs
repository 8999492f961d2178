use chrono::{NaiveDateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::models::RefreshToken;
use crate::error::{AppError, AppResult};

// ============================================================================
// Refresh Token Repository
// ============================================================================

pub struct RefreshTokenRepository;

impl RefreshTokenRepository {
    pub async fn create(
        pool: &SqlitePool,
        token_hash: &str,
        user_id: i64,
        expires_at: NaiveDateTime,
    ) -> AppResult<RefreshToken> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().naive_utc();

        sqlx::query_as::<_, RefreshToken>(
            r#"
            INSERT INTO refresh_tokens (id, token_hash, user_id, created_at, expires_at)
            VALUES (?, ?, ?, ?, ?)
            RETURNING id, token_hash, user_id, created_at, expires_at
            "#,
        )
        .bind(&id)
        .bind(token_hash)
        .bind(user_id)
        .bind(now)
        .bind(expires_at)
        .fetch_one(pool)
        .await
        .map_err(AppError::Database)
    }

    /// Deletes and returns the token if it exists and is still valid at `now`.
    /// A token can therefore be redeemed at most once.
    pub async fn consume(
        pool: &SqlitePool,
        token_hash: &str,
        now: NaiveDateTime,
    ) -> AppResult<Option<RefreshToken>> {
        sqlx::query_as::<_, RefreshToken>(
            r#"
            DELETE FROM refresh_tokens
            WHERE token_hash = ? AND expires_at > ?
            RETURNING id, token_hash, user_id, created_at, expires_at
            "#,
        )
        .bind(token_hash)
        .bind(now)
        .fetch_optional(pool)
        .await
        .map_err(AppError::Database)
    }

    pub async fn delete_expired(pool: &SqlitePool, now: NaiveDateTime) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE expires_at <= ?")
            .bind(now)
            .execute(pool)
            .await
            .map_err(AppError::Database)?;
        Ok(result.rows_affected())
    }
}
