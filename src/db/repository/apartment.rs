use chrono::Utc;
use sqlx::{Executor, Sqlite};

use crate::db::models::*;
use crate::error::{AppError, AppResult};

// ============================================================================
// Apartment Repository
// ============================================================================

const APARTMENT_COLUMNS: &str =
    "id, name, price_for_clean_cents, vat_bp, can_faktura, picture, created_at";

pub struct ApartmentRepository;

impl ApartmentRepository {
    pub async fn list_all<'e, E>(executor: E) -> AppResult<Vec<Apartment>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let sql = format!("SELECT {APARTMENT_COLUMNS} FROM apartments ORDER BY id ASC");
        sqlx::query_as::<_, Apartment>(&sql)
            .fetch_all(executor)
            .await
            .map_err(AppError::Database)
    }

    pub async fn find_by_id<'e, E>(executor: E, id: i64) -> AppResult<Option<Apartment>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let sql = format!("SELECT {APARTMENT_COLUMNS} FROM apartments WHERE id = ?");
        sqlx::query_as::<_, Apartment>(&sql)
            .bind(id)
            .fetch_optional(executor)
            .await
            .map_err(AppError::Database)
    }

    pub async fn exists<'e, E>(executor: E, id: i64) -> AppResult<bool>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let found: Option<i64> = sqlx::query_scalar("SELECT id FROM apartments WHERE id = ?")
            .bind(id)
            .fetch_optional(executor)
            .await
            .map_err(AppError::Database)?;
        Ok(found.is_some())
    }

    pub async fn create<'e, E>(executor: E, data: &ApartmentData) -> AppResult<Apartment>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let sql = format!(
            r#"
            INSERT INTO apartments (name, price_for_clean_cents, vat_bp, can_faktura, picture, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING {APARTMENT_COLUMNS}
            "#
        );
        sqlx::query_as::<_, Apartment>(&sql)
            .bind(&data.name)
            .bind(data.price_for_clean_cents)
            .bind(data.vat_bp)
            .bind(data.can_faktura)
            .bind(&data.picture)
            .bind(Utc::now().naive_utc())
            .fetch_one(executor)
            .await
            .map_err(AppError::Database)
    }

    pub async fn update<'e, E>(
        executor: E,
        id: i64,
        data: &ApartmentData,
    ) -> AppResult<Option<Apartment>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let sql = format!(
            r#"
            UPDATE apartments
            SET name = ?, price_for_clean_cents = ?, vat_bp = ?, can_faktura = ?, picture = ?
            WHERE id = ?
            RETURNING {APARTMENT_COLUMNS}
            "#
        );
        sqlx::query_as::<_, Apartment>(&sql)
            .bind(&data.name)
            .bind(data.price_for_clean_cents)
            .bind(data.vat_bp)
            .bind(data.can_faktura)
            .bind(&data.picture)
            .bind(id)
            .fetch_optional(executor)
            .await
            .map_err(AppError::Database)
    }

    /// Shares referencing the apartment are removed by ON DELETE CASCADE.
    pub async fn delete<'e, E>(executor: E, id: i64) -> AppResult<bool>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM apartments WHERE id = ?")
            .bind(id)
            .execute(executor)
            .await
            .map_err(AppError::Database)?;
        Ok(result.rows_affected() > 0)
    }
}
