use sqlx::{Executor, Sqlite};

use crate::db::models::*;
use crate::error::{AppError, AppResult};

// ============================================================================
// Share Repository
// ============================================================================

const DETAILS_SELECT: &str = r#"
    SELECT
        s.id, s.percentage_bp,
        u.id AS user_id, u.name AS user_name, u.surname AS user_surname, u.username AS user_username,
        a.id AS apartment_id, a.name AS apartment_name
    FROM shares s
    JOIN users u ON u.id = s.user_id
    JOIN apartments a ON a.id = s.apartment_id
"#;

pub struct ShareRepository;

impl ShareRepository {
    pub async fn list_all_details<'e, E>(executor: E) -> AppResult<Vec<ShareDetails>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let sql = format!("{DETAILS_SELECT} ORDER BY s.id ASC");
        sqlx::query_as::<_, ShareDetails>(&sql)
            .fetch_all(executor)
            .await
            .map_err(AppError::Database)
    }

    pub async fn find_details<'e, E>(executor: E, id: i64) -> AppResult<Option<ShareDetails>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let sql = format!("{DETAILS_SELECT} WHERE s.id = ?");
        sqlx::query_as::<_, ShareDetails>(&sql)
            .bind(id)
            .fetch_optional(executor)
            .await
            .map_err(AppError::Database)
    }

    pub async fn list_details_for_apartment<'e, E>(
        executor: E,
        apartment_id: i64,
    ) -> AppResult<Vec<ShareDetails>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let sql = format!("{DETAILS_SELECT} WHERE s.apartment_id = ? ORDER BY s.id ASC");
        sqlx::query_as::<_, ShareDetails>(&sql)
            .bind(apartment_id)
            .fetch_all(executor)
            .await
            .map_err(AppError::Database)
    }

    pub async fn list_details_for_user<'e, E>(
        executor: E,
        user_id: i64,
    ) -> AppResult<Vec<ShareDetails>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let sql = format!("{DETAILS_SELECT} WHERE s.user_id = ? ORDER BY s.id ASC");
        sqlx::query_as::<_, ShareDetails>(&sql)
            .bind(user_id)
            .fetch_all(executor)
            .await
            .map_err(AppError::Database)
    }

    /// A user's shares with the apartment summary used on profile pages.
    pub async fn list_owned_by_user<'e, E>(executor: E, user_id: i64) -> AppResult<Vec<OwnedShare>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, OwnedShare>(
            r#"
            SELECT
                s.id, s.percentage_bp,
                a.id AS apartment_id, a.name AS apartment_name,
                a.price_for_clean_cents AS apartment_price_for_clean_cents,
                a.picture AS apartment_picture
            FROM shares s
            JOIN apartments a ON a.id = s.apartment_id
            WHERE s.user_id = ?
            ORDER BY s.id ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(executor)
        .await
        .map_err(AppError::Database)
    }

    pub async fn find_by_id<'e, E>(executor: E, id: i64) -> AppResult<Option<Share>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Share>(
            "SELECT id, user_id, apartment_id, percentage_bp FROM shares WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(executor)
        .await
        .map_err(AppError::Database)
    }

    pub async fn find_by_user_and_apartment<'e, E>(
        executor: E,
        user_id: i64,
        apartment_id: i64,
    ) -> AppResult<Option<Share>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Share>(
            r#"
            SELECT id, user_id, apartment_id, percentage_bp
            FROM shares
            WHERE user_id = ? AND apartment_id = ?
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .bind(apartment_id)
        .fetch_optional(executor)
        .await
        .map_err(AppError::Database)
    }

    /// Sum of an apartment's shares in basis points, `0` when it has none.
    pub async fn total_for_apartment<'e, E>(executor: E, apartment_id: i64) -> AppResult<i64>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_scalar(
            "SELECT COALESCE(SUM(percentage_bp), 0) FROM shares WHERE apartment_id = ?",
        )
        .bind(apartment_id)
        .fetch_one(executor)
        .await
        .map_err(AppError::Database)
    }

    /// Sum of an apartment's shares held by users other than `user_id`.
    pub async fn total_for_apartment_excluding_user<'e, E>(
        executor: E,
        apartment_id: i64,
        user_id: i64,
    ) -> AppResult<i64>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(percentage_bp), 0)
            FROM shares
            WHERE apartment_id = ? AND user_id <> ?
            "#,
        )
        .bind(apartment_id)
        .bind(user_id)
        .fetch_one(executor)
        .await
        .map_err(AppError::Database)
    }

    pub async fn insert<'e, E>(
        executor: E,
        user_id: i64,
        apartment_id: i64,
        percentage: Percentage,
    ) -> AppResult<i64>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_scalar(
            r#"
            INSERT INTO shares (user_id, apartment_id, percentage_bp)
            VALUES (?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(user_id)
        .bind(apartment_id)
        .bind(percentage.basis_points())
        .fetch_one(executor)
        .await
        .map_err(AppError::Database)
    }

    pub async fn update_percentage<'e, E>(
        executor: E,
        id: i64,
        percentage: Percentage,
    ) -> AppResult<bool>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("UPDATE shares SET percentage_bp = ? WHERE id = ?")
            .bind(percentage.basis_points())
            .bind(id)
            .execute(executor)
            .await
            .map_err(AppError::Database)?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete<'e, E>(executor: E, id: i64) -> AppResult<bool>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM shares WHERE id = ?")
            .bind(id)
            .execute(executor)
            .await
            .map_err(AppError::Database)?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_for_apartment<'e, E>(executor: E, apartment_id: i64) -> AppResult<u64>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM shares WHERE apartment_id = ?")
            .bind(apartment_id)
            .execute(executor)
            .await
            .map_err(AppError::Database)?;
        Ok(result.rows_affected())
    }

    pub async fn delete_for_user<'e, E>(executor: E, user_id: i64) -> AppResult<u64>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM shares WHERE user_id = ?")
            .bind(user_id)
            .execute(executor)
            .await
            .map_err(AppError::Database)?;
        Ok(result.rows_affected())
    }
}
