use serde_json::Value;

use crate::db::models::{InvoiceInfo, InvoiceInfoData, User};
use crate::db::repository::{InvoiceInfoRepository, UserRepository};
use crate::error::{AppError, AppResult, ValidationErrors};
use crate::i18n;
use crate::services::validation::{
    self, check_max_length, field, is_valid_email, optional_string, parse_id, JsonObject,
};
use crate::AppState;

pub const NIP_MAX_LENGTH: usize = 20;
pub const ADDRESS_MAX_LENGTH: usize = 500;

/// Read the billing fields of `obj`. Errors are reported as `<prefix><field>`.
pub fn parse_invoice_fields(
    obj: &JsonObject,
    prefix: &str,
    errors: &mut ValidationErrors,
) -> InvoiceInfoData {
    let mut scoped = ValidationErrors::new();
    let data = InvoiceInfoData {
        country: optional_string(obj, &["country"], &mut scoped),
        city: optional_string(obj, &["city"], &mut scoped),
        company_name: optional_string(obj, &["companyName", "company_name"], &mut scoped),
        nip: optional_string(obj, &["nip"], &mut scoped),
        address: optional_string(obj, &["address"], &mut scoped),
        email: optional_string(obj, &["email"], &mut scoped),
    };

    check_max_length(data.nip.as_deref(), "nip", NIP_MAX_LENGTH, &mut scoped);
    check_max_length(
        data.address.as_deref(),
        "address",
        ADDRESS_MAX_LENGTH,
        &mut scoped,
    );
    if let Some(email) = data.email.as_deref() {
        if !is_valid_email(email) {
            scoped.add("email", i18n::t("validation.email"));
        }
    }

    for e in scoped.fields() {
        errors.add(format!("{prefix}{}", e.field), e.message.clone());
    }
    data
}

/// Owner-or-admin access to a single profile.
fn ensure_access(caller: &User, info: &InvoiceInfo) -> AppResult<()> {
    if caller.is_admin() || caller.id == info.user_id {
        Ok(())
    } else {
        Err(AppError::Forbidden)
    }
}

pub struct InvoiceInfoService;

impl InvoiceInfoService {
    pub async fn list(state: &AppState) -> AppResult<Vec<InvoiceInfo>> {
        InvoiceInfoRepository::list_all(&state.db).await
    }

    /// `{userId, country?, city?, companyName?, nip?, address?, email?}`
    pub async fn create(state: &AppState, body: &Value) -> AppResult<InvoiceInfo> {
        let obj = validation::as_object(body)?;
        let mut errors = ValidationErrors::new();

        let user_id = match field(obj, &["userId", "user_id"]) {
            None => {
                errors.add("userId", i18n::t("validation.required"));
                None
            }
            Some(v) => {
                let id = parse_id(v);
                if id.is_none() {
                    errors.add("userId", i18n::t("validation.integer"));
                }
                id
            }
        };
        let data = parse_invoice_fields(obj, "", &mut errors);
        errors.into_result()?;
        let user_id = user_id.ok_or(AppError::BadRequest(i18n::t("validation.required")))?;

        if !UserRepository::exists(&state.db, user_id).await? {
            return Err(AppError::NotFound(i18n::t("not_found.user")));
        }
        if InvoiceInfoRepository::find_by_user(&state.db, user_id)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(i18n::t("conflict.invoice_info_exists")));
        }

        let info = InvoiceInfoRepository::create(&state.db, user_id, &data).await?;
        tracing::info!("Created invoice info {} for user {}", info.id, user_id);
        Ok(info)
    }

    pub async fn get(state: &AppState, caller: &User, id: i64) -> AppResult<InvoiceInfo> {
        let info = InvoiceInfoRepository::find_by_id(&state.db, id)
            .await?
            .ok_or_else(|| AppError::NotFound(i18n::t("not_found.invoice_info")))?;
        ensure_access(caller, &info)?;
        Ok(info)
    }

    pub async fn update(
        state: &AppState,
        caller: &User,
        id: i64,
        body: &Value,
    ) -> AppResult<InvoiceInfo> {
        let existing = Self::get(state, caller, id).await?;

        let obj = validation::as_object(body)?;
        let mut errors = ValidationErrors::new();
        let data = parse_invoice_fields(obj, "", &mut errors);
        errors.into_result()?;

        let info = InvoiceInfoRepository::update(&state.db, existing.id, &data)
            .await?
            .ok_or_else(|| AppError::NotFound(i18n::t("not_found.invoice_info")))?;
        tracing::info!("Updated invoice info {}", info.id);
        Ok(info)
    }

    pub async fn delete(state: &AppState, caller: &User, id: i64) -> AppResult<()> {
        let existing = Self::get(state, caller, id).await?;
        InvoiceInfoRepository::delete(&state.db, existing.id).await?;
        tracing::info!("Deleted invoice info {}", existing.id);
        Ok(())
    }
}
