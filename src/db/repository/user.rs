use chrono::Utc;
use sqlx::{Executor, Sqlite};

use crate::db::models::*;
use crate::error::{AppError, AppResult};

// ============================================================================
// User Repository
// ============================================================================

const USER_COLUMNS: &str =
    "id, username, email, name, surname, phone, roles, password_hash, created_at";

pub struct UserRepository;

impl UserRepository {
    pub async fn find_by_id<'e, E>(executor: E, id: i64) -> AppResult<Option<User>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?");
        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(executor)
            .await
            .map_err(AppError::Database)
    }

    pub async fn find_by_username<'e, E>(executor: E, username: &str) -> AppResult<Option<User>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?");
        sqlx::query_as::<_, User>(&sql)
            .bind(username)
            .fetch_optional(executor)
            .await
            .map_err(AppError::Database)
    }

    /// Email is not unique; the oldest account wins.
    pub async fn find_by_email<'e, E>(executor: E, email: &str) -> AppResult<Option<User>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE LOWER(email) = LOWER(?) ORDER BY id ASC LIMIT 1"
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(executor)
            .await
            .map_err(AppError::Database)
    }

    pub async fn exists<'e, E>(executor: E, id: i64) -> AppResult<bool>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let found: Option<i64> = sqlx::query_scalar("SELECT id FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(executor)
            .await
            .map_err(AppError::Database)?;
        Ok(found.is_some())
    }

    /// True when no user other than `exclude_id` holds `username`.
    pub async fn is_username_available<'e, E>(
        executor: E,
        username: &str,
        exclude_id: Option<i64>,
    ) -> AppResult<bool>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let taken: Option<i64> = sqlx::query_scalar(
            "SELECT id FROM users WHERE username = ? AND (? IS NULL OR id <> ?) LIMIT 1",
        )
        .bind(username)
        .bind(exclude_id)
        .bind(exclude_id)
        .fetch_optional(executor)
        .await
        .map_err(AppError::Database)?;
        Ok(taken.is_none())
    }

    pub async fn count<'e, E>(executor: E) -> AppResult<i64>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(executor)
            .await
            .map_err(AppError::Database)
    }

    pub async fn list_page<'e, E>(executor: E, limit: i64, offset: i64) -> AppResult<Vec<User>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY id ASC LIMIT ? OFFSET ?");
        sqlx::query_as::<_, User>(&sql)
            .bind(limit)
            .bind(offset)
            .fetch_all(executor)
            .await
            .map_err(AppError::Database)
    }

    pub async fn create<'e, E>(executor: E, new_user: &NewUser) -> AppResult<User>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let roles = serde_json::to_string(&new_user.roles)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("failed to encode roles: {e}")))?;
        let now = Utc::now().naive_utc();

        let sql = format!(
            r#"
            INSERT INTO users (username, email, name, surname, phone, roles, password_hash, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING {USER_COLUMNS}
            "#
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(&new_user.username)
            .bind(&new_user.email)
            .bind(&new_user.name)
            .bind(&new_user.surname)
            .bind(&new_user.phone)
            .bind(roles)
            .bind(&new_user.password_hash)
            .bind(now)
            .fetch_one(executor)
            .await
            .map_err(AppError::Database)
    }

    /// Overwrites profile fields and roles. The password hash is only replaced
    /// when `password_hash` is `Some`.
    pub async fn update<'e, E>(
        executor: E,
        id: i64,
        data: &NewUser,
        password_hash: Option<&str>,
    ) -> AppResult<Option<User>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let roles = serde_json::to_string(&data.roles)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("failed to encode roles: {e}")))?;

        let sql = format!(
            r#"
            UPDATE users
            SET username = ?, email = ?, name = ?, surname = ?, phone = ?, roles = ?,
                password_hash = COALESCE(?, password_hash)
            WHERE id = ?
            RETURNING {USER_COLUMNS}
            "#
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(&data.username)
            .bind(&data.email)
            .bind(&data.name)
            .bind(&data.surname)
            .bind(&data.phone)
            .bind(roles)
            .bind(password_hash)
            .bind(id)
            .fetch_optional(executor)
            .await
            .map_err(AppError::Database)
    }

    pub async fn update_password<'e, E>(executor: E, id: i64, password_hash: &str) -> AppResult<()>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query("UPDATE users SET password_hash = ? WHERE id = ?")
            .bind(password_hash)
            .bind(id)
            .execute(executor)
            .await
            .map_err(AppError::Database)?;
        Ok(())
    }

    /// Shares, invoice profile and tokens go with the user (ON DELETE CASCADE).
    pub async fn delete<'e, E>(executor: E, id: i64) -> AppResult<bool>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(executor)
            .await
            .map_err(AppError::Database)?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{new_user, test_pool};

    #[tokio::test]
    async fn create_and_find_user() {
        let pool = test_pool().await;
        let created = UserRepository::create(&pool, &new_user("anna", &[ROLE_ADMIN]))
            .await
            .unwrap();

        let by_name = UserRepository::find_by_username(&pool, "anna")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_name.id, created.id);
        assert!(by_name.is_admin());

        let by_email = UserRepository::find_by_email(&pool, "ANNA@example.com")
            .await
            .unwrap();
        assert!(by_email.is_some());
    }

    #[tokio::test]
    async fn username_availability_respects_exclusion() {
        let pool = test_pool().await;
        let user = UserRepository::create(&pool, &new_user("piotr", &[]))
            .await
            .unwrap();

        assert!(!UserRepository::is_username_available(&pool, "piotr", None)
            .await
            .unwrap());
        assert!(
            UserRepository::is_username_available(&pool, "piotr", Some(user.id))
                .await
                .unwrap()
        );
        assert!(UserRepository::is_username_available(&pool, "nobody", None)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn update_keeps_password_when_not_given() {
        let pool = test_pool().await;
        let user = UserRepository::create(&pool, &new_user("ewa", &[]))
            .await
            .unwrap();

        let mut data = new_user("ewa2", &[]);
        data.password_hash = "ignored".into();
        let updated = UserRepository::update(&pool, user.id, &data, None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.username, "ewa2");
        assert_eq!(updated.password_hash, user.password_hash);
    }

    #[tokio::test]
    async fn list_page_and_count() {
        let pool = test_pool().await;
        for name in ["u01", "u02", "u03"] {
            UserRepository::create(&pool, &new_user(name, &[]))
                .await
                .unwrap();
        }
        assert_eq!(UserRepository::count(&pool).await.unwrap(), 3);
        let page = UserRepository::list_page(&pool, 2, 2).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].username, "u03");
    }
}
