use chrono::NaiveDateTime;
use serde::Serialize;
use serde_json::Value;

use crate::db::models::*;
use crate::db::repository::{InvoiceInfoRepository, ShareRepository, UserRepository};
use crate::error::{AppError, AppResult, ValidationErrors};
use crate::i18n;
use crate::services::auth::AuthService;
use crate::services::invoice_infos::parse_invoice_fields;
use crate::services::validation::{
    self, check_min_length, field, is_valid_email, is_valid_phone, optional_string,
    required_string,
};
use crate::AppState;

pub const USERS_PER_PAGE: i64 = 10;
pub const USERNAME_MIN_LENGTH: usize = 3;
pub const PASSWORD_MIN_LENGTH: usize = 6;

// ============================================================================
// Views
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDetails {
    pub id: i64,
    pub username: String,
    pub name: String,
    pub surname: String,
    pub email: String,
    pub phone: Option<String>,
    pub roles: Vec<String>,
    pub created_at: NaiveDateTime,
    pub invoice_info: Option<InvoiceInfo>,
    pub shares: Vec<OwnedShare>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPage {
    pub items: Vec<UserDetails>,
    pub page: i64,
    pub per_page: i64,
    pub total: i64,
}

#[derive(Debug, Serialize)]
pub struct UsernameAvailability {
    pub available: bool,
    pub username: String,
}

// ============================================================================
// Input
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserForm {
    Register,
    Update,
}

#[derive(Debug, Clone)]
pub struct UserInput {
    pub username: String,
    pub email: String,
    pub name: String,
    pub surname: String,
    pub phone: Option<String>,
    /// `None` when the body carried no `roles`.
    pub roles: Option<Vec<String>>,
    pub password: Option<String>,
    /// `None` when the body carried no `invoiceInfo`.
    pub invoice_info: Option<InvoiceInfoData>,
}

/// Validate a register/update body, reporting every violated field.
pub fn parse_user_input(body: &Value, form: UserForm) -> AppResult<UserInput> {
    let obj = validation::as_object(body)?;
    let mut errors = ValidationErrors::new();

    let username = required_string(obj, &["username"], &mut errors);
    check_min_length(
        username.as_deref(),
        "username",
        USERNAME_MIN_LENGTH,
        &mut errors,
    );

    let email = required_string(obj, &["email"], &mut errors);
    if let Some(email) = email.as_deref() {
        if !is_valid_email(email) {
            errors.add("email", i18n::t("validation.email"));
        }
    }

    let name = required_string(obj, &["name"], &mut errors);
    let surname = required_string(obj, &["surname"], &mut errors);

    let phone = optional_string(obj, &["phone"], &mut errors);
    if let Some(phone) = phone.as_deref() {
        if !is_valid_phone(phone) {
            errors.add("phone", i18n::t("validation.phone"));
        }
    }

    let roles = match field(obj, &["roles"]) {
        None => None,
        Some(Value::Array(items)) => {
            let roles: Option<Vec<String>> = items
                .iter()
                .map(|r| r.as_str().map(|s| s.trim().to_string()))
                .collect();
            if roles.is_none() {
                errors.add("roles", i18n::t("validation.string"));
            }
            roles
        }
        Some(_) => {
            errors.add("roles", i18n::t("validation.array"));
            None
        }
    };

    let password = match form {
        UserForm::Register => {
            let password = required_string(obj, &["password"], &mut errors);
            check_min_length(
                password.as_deref(),
                "password",
                PASSWORD_MIN_LENGTH,
                &mut errors,
            );
            password
        }
        UserForm::Update => {
            let password = optional_string(obj, &["password"], &mut errors);
            check_min_length(
                password.as_deref(),
                "password",
                PASSWORD_MIN_LENGTH,
                &mut errors,
            );
            if let Some(password) = password.as_deref() {
                let confirm =
                    optional_string(obj, &["confirmPassword", "confirm_password"], &mut errors);
                if confirm.as_deref() != Some(password) {
                    errors.add("confirmPassword", i18n::t("validation.password_mismatch"));
                }
            }
            password
        }
    };

    let invoice_info = match field(obj, &["invoiceInfo", "invoice_info"]) {
        None => None,
        Some(Value::Object(inner)) => Some(parse_invoice_fields(inner, "invoiceInfo.", &mut errors)),
        Some(_) => {
            errors.add("invoiceInfo", i18n::t("validation.object"));
            None
        }
    };

    errors.into_result()?;

    match (username, email, name, surname) {
        (Some(username), Some(email), Some(name), Some(surname)) => Ok(UserInput {
            username,
            email,
            name,
            surname,
            phone,
            roles,
            password,
            invoice_info,
        }),
        _ => Err(AppError::BadRequest(i18n::t("validation.required"))),
    }
}

// ============================================================================
// Service
// ============================================================================

pub struct UserService;

impl UserService {
    pub async fn details(state: &AppState, user: &User) -> AppResult<UserDetails> {
        let invoice_info = InvoiceInfoRepository::find_by_user(&state.db, user.id).await?;
        let shares = ShareRepository::list_owned_by_user(&state.db, user.id).await?;
        Ok(UserDetails {
            id: user.id,
            username: user.username.clone(),
            name: user.name.clone(),
            surname: user.surname.clone(),
            email: user.email.clone(),
            phone: user.phone.clone(),
            roles: user.roles(),
            created_at: user.created_at,
            invoice_info,
            shares,
        })
    }

    pub async fn list(state: &AppState, page: i64) -> AppResult<UserPage> {
        if page < 1 {
            return Err(AppError::invalid_field("page", i18n::t("validation.page")));
        }
        let total = UserRepository::count(&state.db).await?;
        let users =
            UserRepository::list_page(&state.db, USERS_PER_PAGE, (page - 1) * USERS_PER_PAGE)
                .await?;

        let mut items = Vec::with_capacity(users.len());
        for user in &users {
            items.push(Self::details(state, user).await?);
        }

        Ok(UserPage {
            items,
            page,
            per_page: USERS_PER_PAGE,
            total,
        })
    }

    pub async fn get(state: &AppState, id: i64) -> AppResult<UserDetails> {
        let user = UserRepository::find_by_id(&state.db, id)
            .await?
            .ok_or_else(|| AppError::NotFound(i18n::t("not_found.user")))?;
        Self::details(state, &user).await
    }

    pub async fn register(state: &AppState, body: &Value) -> AppResult<UserDetails> {
        let input = parse_user_input(body, UserForm::Register)?;

        if !UserRepository::is_username_available(&state.db, &input.username, None).await? {
            return Err(AppError::Conflict(i18n::t("conflict.username_taken")));
        }

        let password = input.password.clone().unwrap_or_default();
        let password_hash =
            AuthService::hash_password(password, state.config.security.bcrypt_cost).await?;

        let new_user = NewUser {
            username: input.username,
            email: input.email,
            name: input.name,
            surname: input.surname,
            phone: input.phone,
            roles: input
                .roles
                .unwrap_or_else(|| vec![ROLE_USER.to_string()]),
            password_hash,
        };

        let mut tx = state.db.begin().await?;
        let user = UserRepository::create(&mut *tx, &new_user).await?;
        if let Some(data) = input.invoice_info.filter(InvoiceInfoData::has_any_value) {
            InvoiceInfoRepository::upsert_for_user(&mut *tx, user.id, &data).await?;
        }
        tx.commit().await?;

        tracing::info!("Registered user {} ({})", user.id, user.username);
        Self::details(state, &user).await
    }

    pub async fn update(state: &AppState, id: i64, body: &Value) -> AppResult<UserDetails> {
        let existing = UserRepository::find_by_id(&state.db, id)
            .await?
            .ok_or_else(|| AppError::NotFound(i18n::t("not_found.user")))?;
        let input = parse_user_input(body, UserForm::Update)?;

        if input.username != existing.username
            && !UserRepository::is_username_available(&state.db, &input.username, Some(id)).await?
        {
            return Err(AppError::Conflict(i18n::t("conflict.username_taken")));
        }

        let password_hash = match input.password.clone() {
            Some(password) => Some(
                AuthService::hash_password(password, state.config.security.bcrypt_cost).await?,
            ),
            None => None,
        };

        let data = NewUser {
            username: input.username,
            email: input.email,
            name: input.name,
            surname: input.surname,
            phone: input.phone,
            roles: input.roles.unwrap_or(existing.stored_roles),
            password_hash: String::new(),
        };

        let mut tx = state.db.begin().await?;
        let user = UserRepository::update(&mut *tx, id, &data, password_hash.as_deref())
            .await?
            .ok_or_else(|| AppError::NotFound(i18n::t("not_found.user")))?;
        match input.invoice_info {
            Some(info) if info.has_any_value() => {
                InvoiceInfoRepository::upsert_for_user(&mut *tx, id, &info).await?;
            }
            Some(_) => {
                InvoiceInfoRepository::delete_for_user(&mut *tx, id).await?;
            }
            None => {}
        }
        tx.commit().await?;

        tracing::info!("Updated user {}", id);
        Self::details(state, &user).await
    }

    pub async fn delete(state: &AppState, id: i64) -> AppResult<()> {
        // Serialized with ledger writes since the cascade removes shares.
        let _guard = state.share_lock.lock().await;
        if !UserRepository::delete(&state.db, id).await? {
            return Err(AppError::NotFound(i18n::t("not_found.user")));
        }
        tracing::info!("Deleted user {}", id);
        Ok(())
    }

    /// `{username, excludeUserId?}`
    pub async fn check_username(state: &AppState, body: &Value) -> AppResult<UsernameAvailability> {
        let obj = validation::as_object(body)?;
        let mut errors = ValidationErrors::new();
        let username = required_string(obj, &["username"], &mut errors);
        let exclude = field(obj, &["excludeUserId", "exclude_user_id"]).and_then(validation::parse_id);
        errors.into_result()?;
        let username = username.unwrap_or_default();

        let available =
            UserRepository::is_username_available(&state.db, &username, exclude).await?;
        Ok(UsernameAvailability {
            available,
            username,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{seed_apartment, seed_user, test_state};
    use serde_json::json;

    fn register_body(username: &str) -> Value {
        json!({
            "username": username,
            "email": format!("{username}@example.com"),
            "password": "secret1",
            "name": "Anna",
            "surname": "Nowak",
        })
    }

    #[test]
    fn register_reports_all_violations() {
        let err = parse_user_input(
            &json!({"username": "ab", "email": "bad", "password": "123", "phone": "123"}),
            UserForm::Register,
        )
        .unwrap_err();
        let AppError::Validation(errors) = err else {
            panic!("expected validation error");
        };
        let fields: Vec<_> = errors.fields().iter().map(|f| f.field.as_str()).collect();
        assert_eq!(
            fields,
            vec!["username", "email", "name", "surname", "phone", "password"]
        );
    }

    #[test]
    fn update_requires_matching_confirmation() {
        let mut body = register_body("anna");
        body["password"] = json!("newpass1");
        body["confirmPassword"] = json!("different");
        assert!(matches!(
            parse_user_input(&body, UserForm::Update),
            Err(AppError::Validation(_))
        ));

        body["confirmPassword"] = json!("newpass1");
        let input = parse_user_input(&body, UserForm::Update).unwrap();
        assert_eq!(input.password.as_deref(), Some("newpass1"));
    }

    #[tokio::test]
    async fn register_defaults_roles_and_stores_invoice_info() {
        let state = test_state().await;
        let mut body = register_body("anna");
        body["invoiceInfo"] = json!({"companyName": "ACME", "nip": ""});

        let details = UserService::register(&state, &body).await.unwrap();
        assert_eq!(details.roles, vec![ROLE_USER.to_string()]);
        let info = details.invoice_info.unwrap();
        assert_eq!(info.company_name.as_deref(), Some("ACME"));
        assert_eq!(info.nip, None);

        assert!(matches!(
            UserService::register(&state, &body).await,
            Err(AppError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn register_skips_empty_invoice_info() {
        let state = test_state().await;
        let mut body = register_body("anna");
        body["invoiceInfo"] = json!({"city": "  "});

        let details = UserService::register(&state, &body).await.unwrap();
        assert!(details.invoice_info.is_none());
    }

    #[tokio::test]
    async fn update_changes_profile_and_removes_blank_invoice_info() {
        let state = test_state().await;
        let mut body = register_body("anna");
        body["invoiceInfo"] = json!({"city": "Sopot"});
        let created = UserService::register(&state, &body).await.unwrap();

        let mut update = register_body("anna2");
        update.as_object_mut().unwrap().remove("password");
        update["invoiceInfo"] = json!({});
        let updated = UserService::update(&state, created.id, &update)
            .await
            .unwrap();
        assert_eq!(updated.username, "anna2");
        assert!(updated.invoice_info.is_none());
    }

    #[tokio::test]
    async fn update_rejects_taken_username() {
        let state = test_state().await;
        seed_user(&state.db, "taken", &[]).await;
        let user = seed_user(&state.db, "mine", &[]).await;

        assert!(matches!(
            UserService::update(&state, user.id, &register_body("taken")).await,
            Err(AppError::Conflict(_))
        ));
        assert!(matches!(
            UserService::update(&state, 999, &register_body("x123")).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn delete_cascades_shares() {
        let state = test_state().await;
        let user = seed_user(&state.db, "owner", &[]).await;
        let apartment = seed_apartment(&state.db, "A").await;
        ShareRepository::insert(
            &state.db,
            user.id,
            apartment.id,
            Percentage::from_basis_points(5000).unwrap(),
        )
        .await
        .unwrap();

        UserService::delete(&state, user.id).await.unwrap();
        assert_eq!(
            ShareRepository::total_for_apartment(&state.db, apartment.id)
                .await
                .unwrap(),
            0
        );
        assert!(matches!(
            UserService::delete(&state, user.id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn list_paginates_by_ten() {
        let state = test_state().await;
        for i in 0..12 {
            seed_user(&state.db, &format!("user{i:02}"), &[]).await;
        }
        let second = UserService::list(&state, 2).await.unwrap();
        assert_eq!(second.total, 12);
        assert_eq!(second.items.len(), 2);
        assert!(matches!(
            UserService::list(&state, 0).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn check_username_honours_exclusion() {
        let state = test_state().await;
        let user = seed_user(&state.db, "anna", &[]).await;

        let taken = UserService::check_username(&state, &json!({"username": "anna"}))
            .await
            .unwrap();
        assert!(!taken.available);

        let own = UserService::check_username(
            &state,
            &json!({"username": "anna", "excludeUserId": user.id}),
        )
        .await
        .unwrap();
        assert!(own.available);
    }
}
