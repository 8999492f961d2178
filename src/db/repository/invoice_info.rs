use sqlx::{Executor, Sqlite};

use crate::db::models::*;
use crate::error::{AppError, AppResult};

// ============================================================================
// Invoice Info Repository
// ============================================================================

const INVOICE_COLUMNS: &str = "id, user_id, country, city, company_name, nip, address, email";

pub struct InvoiceInfoRepository;

impl InvoiceInfoRepository {
    pub async fn list_all<'e, E>(executor: E) -> AppResult<Vec<InvoiceInfo>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let sql = format!("SELECT {INVOICE_COLUMNS} FROM invoice_info ORDER BY id ASC");
        sqlx::query_as::<_, InvoiceInfo>(&sql)
            .fetch_all(executor)
            .await
            .map_err(AppError::Database)
    }

    pub async fn find_by_id<'e, E>(executor: E, id: i64) -> AppResult<Option<InvoiceInfo>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let sql = format!("SELECT {INVOICE_COLUMNS} FROM invoice_info WHERE id = ?");
        sqlx::query_as::<_, InvoiceInfo>(&sql)
            .bind(id)
            .fetch_optional(executor)
            .await
            .map_err(AppError::Database)
    }

    pub async fn find_by_user<'e, E>(executor: E, user_id: i64) -> AppResult<Option<InvoiceInfo>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let sql = format!("SELECT {INVOICE_COLUMNS} FROM invoice_info WHERE user_id = ?");
        sqlx::query_as::<_, InvoiceInfo>(&sql)
            .bind(user_id)
            .fetch_optional(executor)
            .await
            .map_err(AppError::Database)
    }

    pub async fn create<'e, E>(
        executor: E,
        user_id: i64,
        data: &InvoiceInfoData,
    ) -> AppResult<InvoiceInfo>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let sql = format!(
            r#"
            INSERT INTO invoice_info (user_id, country, city, company_name, nip, address, email)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            RETURNING {INVOICE_COLUMNS}
            "#
        );
        sqlx::query_as::<_, InvoiceInfo>(&sql)
            .bind(user_id)
            .bind(&data.country)
            .bind(&data.city)
            .bind(&data.company_name)
            .bind(&data.nip)
            .bind(&data.address)
            .bind(&data.email)
            .fetch_one(executor)
            .await
            .map_err(AppError::Database)
    }

    pub async fn update<'e, E>(
        executor: E,
        id: i64,
        data: &InvoiceInfoData,
    ) -> AppResult<Option<InvoiceInfo>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let sql = format!(
            r#"
            UPDATE invoice_info
            SET country = ?, city = ?, company_name = ?, nip = ?, address = ?, email = ?
            WHERE id = ?
            RETURNING {INVOICE_COLUMNS}
            "#
        );
        sqlx::query_as::<_, InvoiceInfo>(&sql)
            .bind(&data.country)
            .bind(&data.city)
            .bind(&data.company_name)
            .bind(&data.nip)
            .bind(&data.address)
            .bind(&data.email)
            .bind(id)
            .fetch_optional(executor)
            .await
            .map_err(AppError::Database)
    }

    /// Insert or overwrite the user's single billing profile.
    pub async fn upsert_for_user<'e, E>(
        executor: E,
        user_id: i64,
        data: &InvoiceInfoData,
    ) -> AppResult<InvoiceInfo>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let sql = format!(
            r#"
            INSERT INTO invoice_info (user_id, country, city, company_name, nip, address, email)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(user_id) DO UPDATE SET
                country = excluded.country,
                city = excluded.city,
                company_name = excluded.company_name,
                nip = excluded.nip,
                address = excluded.address,
                email = excluded.email
            RETURNING {INVOICE_COLUMNS}
            "#
        );
        sqlx::query_as::<_, InvoiceInfo>(&sql)
            .bind(user_id)
            .bind(&data.country)
            .bind(&data.city)
            .bind(&data.company_name)
            .bind(&data.nip)
            .bind(&data.address)
            .bind(&data.email)
            .fetch_one(executor)
            .await
            .map_err(AppError::Database)
    }

    pub async fn delete<'e, E>(executor: E, id: i64) -> AppResult<bool>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM invoice_info WHERE id = ?")
            .bind(id)
            .execute(executor)
            .await
            .map_err(AppError::Database)?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_for_user<'e, E>(executor: E, user_id: i64) -> AppResult<bool>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM invoice_info WHERE user_id = ?")
            .bind(user_id)
            .execute(executor)
            .await
            .map_err(AppError::Database)?;
        Ok(result.rows_affected() > 0)
    }
}
