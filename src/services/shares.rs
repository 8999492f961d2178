//! Ownership share ledger.
//!
//! Every apartment's shares sum to at most 100%. All mutating operations hold
//! `AppState::share_lock` and run inside one SQLite transaction, so the
//! read-check-write sequence is serialized and a failed check leaves the
//! ledger untouched (the transaction is rolled back on drop).

use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;

use crate::db::models::{Percentage, ShareDetails};
use crate::db::repository::{ApartmentRepository, ShareRepository, UserRepository};
use crate::error::{AppError, AppResult, ValidationErrors};
use crate::i18n;
use crate::services::validation::{self, field, parse_id, parse_percentage};
use crate::AppState;

const USER_ID: &[&str] = &["userId", "user_id"];
const APARTMENT_ID: &[&str] = &["apartmentId", "apartment_id"];
const PERCENTAGE: &[&str] = &["percentage", "procent"];

// ============================================================================
// Request parsing
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewShare {
    pub user_id: i64,
    pub apartment_id: i64,
    pub percentage: Percentage,
}

/// One `(owner, percentage)` entry of a bulk replace. `target_id` is a user id
/// when replacing an apartment's shares and an apartment id when replacing a
/// user's shares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShareEntry {
    pub target_id: i64,
    pub percentage: Percentage,
}

fn parse_id_field(
    obj: &validation::JsonObject,
    names: &[&str],
    label: &str,
    errors: &mut ValidationErrors,
) -> Option<i64> {
    match field(obj, names) {
        None => {
            errors.add(label, i18n::t("validation.required"));
            None
        }
        Some(v) => {
            let id = parse_id(v);
            if id.is_none() {
                errors.add(label, i18n::t("validation.integer"));
            }
            id
        }
    }
}

fn parse_percentage_field(
    obj: &validation::JsonObject,
    label: &str,
    errors: &mut ValidationErrors,
) -> Option<Percentage> {
    match field(obj, PERCENTAGE) {
        None => {
            errors.add(label, i18n::t("validation.required"));
            None
        }
        Some(v) => {
            let p = parse_percentage(v);
            if p.is_none() {
                errors.add(label, i18n::t("validation.percentage"));
            }
            p
        }
    }
}

/// `{userId, apartmentId, percentage}` for a single create.
pub fn parse_new_share(body: &Value) -> AppResult<NewShare> {
    let obj = validation::as_object(body)?;
    let mut errors = ValidationErrors::new();

    let user_id = parse_id_field(obj, USER_ID, "userId", &mut errors);
    let apartment_id = parse_id_field(obj, APARTMENT_ID, "apartmentId", &mut errors);
    let percentage = parse_percentage_field(obj, "percentage", &mut errors);

    match (user_id, apartment_id, percentage) {
        (Some(user_id), Some(apartment_id), Some(percentage)) if errors.is_empty() => {
            Ok(NewShare {
                user_id,
                apartment_id,
                percentage,
            })
        }
        _ => Err(AppError::Validation(errors)),
    }
}

/// `{percentage}` for an update.
pub fn parse_share_update(body: &Value) -> AppResult<Percentage> {
    let obj = validation::as_object(body)?;
    let mut errors = ValidationErrors::new();
    match parse_percentage_field(obj, "percentage", &mut errors) {
        Some(p) => Ok(p),
        None => Err(AppError::Validation(errors)),
    }
}

fn parse_entries(
    body: &Value,
    list_field: &str,
    id_names: &[&str],
    id_label: &str,
) -> AppResult<Vec<ShareEntry>> {
    let obj = validation::as_object(body)?;
    let items = match obj.get(list_field) {
        Some(Value::Array(items)) => items,
        Some(Value::Null) | None => {
            return Err(AppError::invalid_field(
                list_field,
                i18n::t("validation.required"),
            ))
        }
        Some(_) => {
            return Err(AppError::invalid_field(
                list_field,
                i18n::t("validation.array"),
            ))
        }
    };

    let mut errors = ValidationErrors::new();
    let mut entries = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let Some(entry) = item.as_object() else {
            errors.add(format!("{list_field}[{i}]"), i18n::t("validation.object"));
            continue;
        };
        let target = parse_id_field(
            entry,
            id_names,
            &format!("{list_field}[{i}].{id_label}"),
            &mut errors,
        );
        let percentage =
            parse_percentage_field(entry, &format!("{list_field}[{i}].percentage"), &mut errors);
        if let (Some(target_id), Some(percentage)) = (target, percentage) {
            entries.push(ShareEntry {
                target_id,
                percentage,
            });
        }
    }

    errors.into_result()?;
    Ok(entries)
}

/// `{shareholders: [{userId, percentage}]}` for an apartment-scoped replace.
pub fn parse_shareholders(body: &Value) -> AppResult<Vec<ShareEntry>> {
    parse_entries(body, "shareholders", USER_ID, "userId")
}

/// `{shares: [{apartmentId, percentage}]}` for a user-scoped replace.
pub fn parse_user_shares(body: &Value) -> AppResult<Vec<ShareEntry>> {
    parse_entries(body, "shares", APARTMENT_ID, "apartmentId")
}

fn ceiling_exceeded(field: &str) -> AppError {
    AppError::invalid_field(field, i18n::t("validation.percentage_ceiling"))
}

// ============================================================================
// Ledger
// ============================================================================

pub struct ShareLedger<'a> {
    state: &'a AppState,
}

impl<'a> ShareLedger<'a> {
    pub fn new(state: &'a AppState) -> Self {
        Self { state }
    }

    pub async fn list_all(&self) -> AppResult<Vec<ShareDetails>> {
        ShareRepository::list_all_details(&self.state.db).await
    }

    pub async fn get(&self, share_id: i64) -> AppResult<ShareDetails> {
        ShareRepository::find_details(&self.state.db, share_id)
            .await?
            .ok_or_else(|| AppError::NotFound(i18n::t("not_found.share")))
    }

    /// Sum of the apartment's shares, zero when it has none.
    pub async fn total_percentage(&self, apartment_id: i64) -> AppResult<rust_decimal::Decimal> {
        let bp = ShareRepository::total_for_apartment(&self.state.db, apartment_id).await?;
        Ok(crate::db::models::from_hundredths(bp))
    }

    pub async fn create(&self, new_share: NewShare) -> AppResult<ShareDetails> {
        let _guard = self.state.share_lock.lock().await;
        let mut tx = self.state.db.begin().await?;

        if !UserRepository::exists(&mut *tx, new_share.user_id).await? {
            return Err(AppError::NotFound(i18n::t("not_found.user")));
        }
        if !ApartmentRepository::exists(&mut *tx, new_share.apartment_id).await? {
            return Err(AppError::NotFound(i18n::t("not_found.apartment")));
        }

        if ShareRepository::find_by_user_and_apartment(
            &mut *tx,
            new_share.user_id,
            new_share.apartment_id,
        )
        .await?
        .is_some()
        {
            return Err(AppError::Conflict(i18n::t("conflict.share_exists")));
        }

        let total = ShareRepository::total_for_apartment(&mut *tx, new_share.apartment_id).await?;
        if total + new_share.percentage.basis_points() > Percentage::HUNDRED.basis_points() {
            return Err(ceiling_exceeded("percentage"));
        }

        let id = ShareRepository::insert(
            &mut *tx,
            new_share.user_id,
            new_share.apartment_id,
            new_share.percentage,
        )
        .await?;
        let details = ShareRepository::find_details(&mut *tx, id)
            .await?
            .ok_or_else(|| AppError::NotFound(i18n::t("not_found.share")))?;
        tx.commit().await?;

        tracing::info!(
            "Created share {} (user {}, apartment {}, {}%)",
            id,
            new_share.user_id,
            new_share.apartment_id,
            new_share.percentage
        );
        Ok(details)
    }

    pub async fn update(&self, share_id: i64, percentage: Percentage) -> AppResult<ShareDetails> {
        let _guard = self.state.share_lock.lock().await;
        let mut tx = self.state.db.begin().await?;

        let share = ShareRepository::find_by_id(&mut *tx, share_id)
            .await?
            .ok_or_else(|| AppError::NotFound(i18n::t("not_found.share")))?;

        let total = ShareRepository::total_for_apartment(&mut *tx, share.apartment_id).await?;
        let new_total = total - share.percentage_bp + percentage.basis_points();
        if new_total > Percentage::HUNDRED.basis_points() {
            return Err(ceiling_exceeded("percentage"));
        }

        ShareRepository::update_percentage(&mut *tx, share_id, percentage).await?;
        let details = ShareRepository::find_details(&mut *tx, share_id)
            .await?
            .ok_or_else(|| AppError::NotFound(i18n::t("not_found.share")))?;
        tx.commit().await?;

        tracing::info!(
            "Updated share {}: {}% -> {}%",
            share_id,
            share.percentage(),
            percentage
        );
        Ok(details)
    }

    pub async fn delete(&self, share_id: i64) -> AppResult<()> {
        let _guard = self.state.share_lock.lock().await;
        let mut tx = self.state.db.begin().await?;

        if !ShareRepository::delete(&mut *tx, share_id).await? {
            return Err(AppError::NotFound(i18n::t("not_found.share")));
        }
        tx.commit().await?;

        tracing::info!("Deleted share {}", share_id);
        Ok(())
    }

    /// Replace every share of an apartment with `entries` (user id, percentage).
    /// Duplicate user ids are kept as separate shares.
    pub async fn replace_for_apartment(
        &self,
        apartment_id: i64,
        entries: &[ShareEntry],
    ) -> AppResult<Vec<ShareDetails>> {
        let _guard = self.state.share_lock.lock().await;
        let mut tx = self.state.db.begin().await?;

        if !ApartmentRepository::exists(&mut *tx, apartment_id).await? {
            return Err(AppError::NotFound(i18n::t("not_found.apartment")));
        }

        let sum: i64 = entries.iter().map(|e| e.percentage.basis_points()).sum();
        if sum > Percentage::HUNDRED.basis_points() {
            return Err(ceiling_exceeded("shareholders"));
        }

        let user_ids: BTreeSet<i64> = entries.iter().map(|e| e.target_id).collect();
        for user_id in user_ids {
            if !UserRepository::exists(&mut *tx, user_id).await? {
                return Err(AppError::NotFound(i18n::t_with(
                    "not_found.user_id",
                    &[("id", user_id.to_string().as_str())],
                )));
            }
        }

        let removed = ShareRepository::delete_for_apartment(&mut *tx, apartment_id).await?;
        for entry in entries {
            ShareRepository::insert(&mut *tx, entry.target_id, apartment_id, entry.percentage)
                .await?;
        }
        let shares = ShareRepository::list_details_for_apartment(&mut *tx, apartment_id).await?;
        tx.commit().await?;

        tracing::info!(
            "Replaced shares of apartment {}: removed {}, inserted {}",
            apartment_id,
            removed,
            shares.len()
        );
        Ok(shares)
    }

    /// Replace every share of a user with `entries` (apartment id, percentage).
    ///
    /// The ceiling holds per touched apartment: other users' shares plus this
    /// user's new entries for it must not exceed 100%.
    pub async fn replace_for_user(
        &self,
        user_id: i64,
        entries: &[ShareEntry],
    ) -> AppResult<Vec<ShareDetails>> {
        let _guard = self.state.share_lock.lock().await;
        let mut tx = self.state.db.begin().await?;

        if !UserRepository::exists(&mut *tx, user_id).await? {
            return Err(AppError::NotFound(i18n::t("not_found.user")));
        }

        let mut per_apartment: BTreeMap<i64, i64> = BTreeMap::new();
        for entry in entries {
            *per_apartment.entry(entry.target_id).or_default() += entry.percentage.basis_points();
        }

        for (&apartment_id, &new_bp) in &per_apartment {
            if !ApartmentRepository::exists(&mut *tx, apartment_id).await? {
                return Err(AppError::NotFound(i18n::t_with(
                    "not_found.apartment_id",
                    &[("id", apartment_id.to_string().as_str())],
                )));
            }
            let others =
                ShareRepository::total_for_apartment_excluding_user(&mut *tx, apartment_id, user_id)
                    .await?;
            if others + new_bp > Percentage::HUNDRED.basis_points() {
                return Err(ceiling_exceeded("shares"));
            }
        }

        let removed = ShareRepository::delete_for_user(&mut *tx, user_id).await?;
        for entry in entries {
            ShareRepository::insert(&mut *tx, user_id, entry.target_id, entry.percentage).await?;
        }
        let shares = ShareRepository::list_details_for_user(&mut *tx, user_id).await?;
        tx.commit().await?;

        tracing::info!(
            "Replaced shares of user {}: removed {}, inserted {}",
            user_id,
            removed,
            shares.len()
        );
        Ok(shares)
    }
}
