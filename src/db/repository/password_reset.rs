use chrono::{Duration, NaiveDateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::models::PasswordResetToken;
use crate::error::{AppError, AppResult};

// ============================================================================
// Password Reset Token Repository
// ============================================================================

pub struct PasswordResetRepository;

impl PasswordResetRepository {
    pub async fn create(
        pool: &SqlitePool,
        user_id: i64,
        ttl: Duration,
    ) -> AppResult<PasswordResetToken> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().naive_utc();

        sqlx::query_as::<_, PasswordResetToken>(
            r#"
            INSERT INTO password_reset_tokens (id, user_id, created_at, expires_at, used)
            VALUES (?, ?, ?, ?, 0)
            RETURNING id, user_id, created_at, expires_at, used
            "#,
        )
        .bind(&id)
        .bind(user_id)
        .bind(now)
        .bind(now + ttl)
        .fetch_one(pool)
        .await
        .map_err(AppError::Database)
    }

    /// Returns the token only if it is unused and not yet expired.
    pub async fn find_valid(
        pool: &SqlitePool,
        id: &str,
        now: NaiveDateTime,
    ) -> AppResult<Option<PasswordResetToken>> {
        sqlx::query_as::<_, PasswordResetToken>(
            r#"
            SELECT id, user_id, created_at, expires_at, used
            FROM password_reset_tokens
            WHERE id = ? AND used = 0 AND expires_at > ?
            "#,
        )
        .bind(id)
        .bind(now)
        .fetch_optional(pool)
        .await
        .map_err(AppError::Database)
    }

    /// Marks every outstanding token of the user as used.
    pub async fn invalidate_for_user(pool: &SqlitePool, user_id: i64) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE password_reset_tokens SET used = 1 WHERE user_id = ? AND used = 0",
        )
        .bind(user_id)
        .execute(pool)
        .await
        .map_err(AppError::Database)?;
        Ok(result.rows_affected())
    }

    /// Consumes the token. `false` if it was already used.
    pub async fn mark_used(pool: &SqlitePool, id: &str) -> AppResult<bool> {
        let result =
            sqlx::query("UPDATE password_reset_tokens SET used = 1 WHERE id = ? AND used = 0")
                .bind(id)
                .execute(pool)
                .await
                .map_err(AppError::Database)?;
        Ok(result.rows_affected() > 0)
    }

    /// Removes used tokens and tokens that expired before `now`.
    pub async fn delete_stale(pool: &SqlitePool, now: NaiveDateTime) -> AppResult<u64> {
        let result =
            sqlx::query("DELETE FROM password_reset_tokens WHERE used = 1 OR expires_at <= ?")
                .bind(now)
                .execute(pool)
                .await
                .map_err(AppError::Database)?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{seed_user, test_pool};

    #[tokio::test]
    async fn token_is_single_use() {
        let pool = test_pool().await;
        let user = seed_user(&pool, "reset", &[]).await;
        let token = PasswordResetRepository::create(&pool, user.id, Duration::hours(1))
            .await
            .unwrap();
        let now = Utc::now().naive_utc();

        assert!(PasswordResetRepository::find_valid(&pool, &token.id, now)
            .await
            .unwrap()
            .is_some());
        assert!(PasswordResetRepository::mark_used(&pool, &token.id)
            .await
            .unwrap());
        assert!(!PasswordResetRepository::mark_used(&pool, &token.id)
            .await
            .unwrap());
        assert!(PasswordResetRepository::find_valid(&pool, &token.id, now)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn expired_tokens_are_invalid_and_swept() {
        let pool = test_pool().await;
        let user = seed_user(&pool, "reset", &[]).await;
        let token = PasswordResetRepository::create(&pool, user.id, Duration::minutes(5))
            .await
            .unwrap();
        let later = Utc::now().naive_utc() + Duration::minutes(10);

        assert!(PasswordResetRepository::find_valid(&pool, &token.id, later)
            .await
            .unwrap()
            .is_none());
        assert_eq!(
            PasswordResetRepository::delete_stale(&pool, later)
                .await
                .unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn invalidate_for_user_consumes_outstanding_tokens() {
        let pool = test_pool().await;
        let user = seed_user(&pool, "reset", &[]).await;
        for _ in 0..2 {
            PasswordResetRepository::create(&pool, user.id, Duration::hours(1))
                .await
                .unwrap();
        }
        assert_eq!(
            PasswordResetRepository::invalidate_for_user(&pool, user.id)
                .await
                .unwrap(),
            2
        );
    }
}
