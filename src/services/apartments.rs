use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;

use crate::db::models::*;
use crate::db::repository::{ApartmentRepository, ShareRepository};
use crate::error::{AppError, AppResult, ValidationErrors};
use crate::i18n;
use crate::services::shares::ShareLedger;
use crate::services::uploads::{ImageBounds, UploadStore};
use crate::services::validation::{
    self, field, parse_bool_lenient, parse_decimal, required_string, JsonObject,
};
use crate::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApartmentDetails {
    #[serde(flatten)]
    pub apartment: ApartmentView,
    pub shares: Vec<ShareDetails>,
    pub total_percentage: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApartmentForm {
    Create,
    Update,
}

#[derive(Debug, Clone)]
pub struct ApartmentInput {
    pub name: String,
    pub price_for_clean_cents: i64,
    pub vat_bp: i64,
    pub can_faktura: bool,
    /// `Some(None)` clears the picture, `None` leaves it unchanged.
    pub picture: Option<Option<String>>,
    /// Data URL to decode and store as the new picture.
    pub image: Option<String>,
}

fn parse_amount(
    obj: &JsonObject,
    names: &[&str],
    errors: &mut ValidationErrors,
) -> Option<i64> {
    let label = names[0];
    match field(obj, names) {
        None => {
            errors.add(label, i18n::t("validation.required"));
            None
        }
        Some(v) => {
            let amount = parse_decimal(v).and_then(to_hundredths);
            if amount.is_none() {
                errors.add(label, i18n::t("validation.numeric"));
            }
            amount
        }
    }
}

/// Validate a create/update body. On create `canFaktura` also accepts
/// truthy strings and numbers; on update it must be a JSON boolean.
pub fn parse_apartment_input(body: &Value, form: ApartmentForm) -> AppResult<ApartmentInput> {
    let obj = validation::as_object(body)?;
    let mut errors = ValidationErrors::new();

    let name = required_string(obj, &["name"], &mut errors);
    let price = parse_amount(obj, &["priceForClean", "price_for_clean"], &mut errors);
    let vat = parse_amount(obj, &["vat"], &mut errors);

    let can_faktura = match field(obj, &["canFaktura", "can_faktura"]) {
        None => {
            errors.add("canFaktura", i18n::t("validation.required"));
            None
        }
        Some(v) => {
            let parsed = match form {
                ApartmentForm::Create => parse_bool_lenient(v),
                ApartmentForm::Update => v.as_bool(),
            };
            if parsed.is_none() {
                errors.add("canFaktura", i18n::t("validation.boolean"));
            }
            parsed
        }
    };

    let picture = match obj.get("picture") {
        None => None,
        Some(Value::Null) => Some(None),
        Some(Value::String(s)) => Some((!s.trim().is_empty()).then(|| s.trim().to_string())),
        Some(_) => {
            errors.add("picture", i18n::t("validation.string"));
            None
        }
    };

    let image = match field(obj, &["image"]) {
        None => None,
        Some(Value::String(s)) if s.trim().is_empty() => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(_) => {
            errors.add("image", i18n::t("validation.image_format"));
            None
        }
    };

    errors.into_result()?;

    match (name, price, vat, can_faktura) {
        (Some(name), Some(price_for_clean_cents), Some(vat_bp), Some(can_faktura)) => {
            Ok(ApartmentInput {
                name,
                price_for_clean_cents,
                vat_bp,
                can_faktura,
                picture,
                image,
            })
        }
        _ => Err(AppError::BadRequest(i18n::t("validation.required"))),
    }
}

pub struct ApartmentService;

impl ApartmentService {
    pub async fn list(state: &AppState) -> AppResult<Vec<ApartmentView>> {
        let apartments = ApartmentRepository::list_all(&state.db).await?;
        Ok(apartments.iter().map(ApartmentView::from).collect())
    }

    pub async fn get(state: &AppState, id: i64) -> AppResult<ApartmentDetails> {
        let apartment = ApartmentRepository::find_by_id(&state.db, id)
            .await?
            .ok_or_else(|| AppError::NotFound(i18n::t("not_found.apartment")))?;
        let shares = ShareRepository::list_details_for_apartment(&state.db, id).await?;
        let total_percentage = ShareLedger::new(state).total_percentage(id).await?;

        Ok(ApartmentDetails {
            apartment: ApartmentView::from(&apartment),
            shares,
            total_percentage,
        })
    }

    async fn store_image(
        state: &AppState,
        data_url: &str,
        bounds: ImageBounds,
    ) -> AppResult<String> {
        let stored = UploadStore::new(&state.config.storage.uploads_dir)
            .save_data_url(data_url, bounds)
            .await?;
        Ok(stored.path)
    }

    pub async fn create(state: &AppState, body: &Value) -> AppResult<ApartmentView> {
        let input = parse_apartment_input(body, ApartmentForm::Create)?;

        let mut picture = input.picture.flatten();
        if let Some(image) = input.image.as_deref() {
            picture = Some(Self::store_image(state, image, ImageBounds::CREATE).await?);
        }

        let apartment = ApartmentRepository::create(
            &state.db,
            &ApartmentData {
                name: input.name,
                price_for_clean_cents: input.price_for_clean_cents,
                vat_bp: input.vat_bp,
                can_faktura: input.can_faktura,
                picture,
            },
        )
        .await?;

        tracing::info!("Created apartment {} ({})", apartment.id, apartment.name);
        Ok(ApartmentView::from(&apartment))
    }

    pub async fn update(state: &AppState, id: i64, body: &Value) -> AppResult<ApartmentView> {
        let existing = ApartmentRepository::find_by_id(&state.db, id)
            .await?
            .ok_or_else(|| AppError::NotFound(i18n::t("not_found.apartment")))?;
        let input = parse_apartment_input(body, ApartmentForm::Update)?;

        let mut picture = input.picture.unwrap_or(existing.picture);
        if let Some(image) = input.image.as_deref() {
            picture = Some(Self::store_image(state, image, ImageBounds::UPDATE).await?);
        }

        let apartment = ApartmentRepository::update(
            &state.db,
            id,
            &ApartmentData {
                name: input.name,
                price_for_clean_cents: input.price_for_clean_cents,
                vat_bp: input.vat_bp,
                can_faktura: input.can_faktura,
                picture,
            },
        )
        .await?
        .ok_or_else(|| AppError::NotFound(i18n::t("not_found.apartment")))?;

        tracing::info!("Updated apartment {}", id);
        Ok(ApartmentView::from(&apartment))
    }

    pub async fn delete(state: &AppState, id: i64) -> AppResult<()> {
        // Serialized with ledger writes since the cascade removes shares.
        let _guard = state.share_lock.lock().await;
        if !ApartmentRepository::delete(&state.db, id).await? {
            return Err(AppError::NotFound(i18n::t("not_found.apartment")));
        }
        tracing::info!("Deleted apartment {}", id);
        Ok(())
    }
}
