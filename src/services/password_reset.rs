use chrono::{Duration, Utc};
use serde::Serialize;

use crate::db::models::User;
use crate::db::repository::{PasswordResetRepository, UserRepository};
use crate::error::{AppError, AppResult};
use crate::i18n;
use crate::services::auth::AuthService;
use crate::services::mailer::Email;
use crate::services::users::PASSWORD_MIN_LENGTH;
use crate::services::validation::is_valid_email;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct TokenCheck {
    pub valid: bool,
    pub email: String,
}

pub struct PasswordResetService;

impl PasswordResetService {
    /// Always answers with the same message so callers cannot learn which emails have accounts.
    pub async fn request(state: &AppState, email: Option<&str>) -> AppResult<String> {
        let email = email.map(str::trim).unwrap_or_default();
        if email.is_empty() {
            return Err(AppError::BadRequest(i18n::t(
                "password_reset.email_required",
            )));
        }
        if !is_valid_email(email) {
            return Err(AppError::BadRequest(i18n::t(
                "password_reset.email_invalid",
            )));
        }

        match UserRepository::find_by_email(&state.db, email).await? {
            Some(user) => Self::issue_and_send(state, &user).await?,
            None => tracing::info!("Password reset requested for unknown email"),
        }

        Ok(i18n::t("password_reset.requested"))
    }

    async fn issue_and_send(state: &AppState, user: &User) -> AppResult<()> {
        let invalidated = PasswordResetRepository::invalidate_for_user(&state.db, user.id).await?;
        if invalidated > 0 {
            tracing::debug!(
                "Invalidated {} outstanding reset tokens for user {}",
                invalidated,
                user.id
            );
        }

        let ttl_minutes = state.config.security.password_reset_ttl_minutes;
        let token =
            PasswordResetRepository::create(&state.db, user.id, Duration::minutes(ttl_minutes))
                .await?;

        let lang = Some(state.config.mail.lang.as_str());
        let url = format!(
            "{}/#/reset-password?token={}",
            state.config.server.frontend_url.trim_end_matches('/'),
            token.id
        );
        let expires = i18n::tr(
            lang,
            "email.expires_minutes",
            Some(&[("minutes", ttl_minutes.to_string().as_str())]),
        );
        let body = i18n::tr(
            lang,
            "email.reset.body",
            Some(&[
                ("name", user.name.as_str()),
                ("url", url.as_str()),
                ("expires", expires.as_str()),
            ]),
        );

        state
            .mailer
            .send(Email {
                to: user.email.clone(),
                subject: i18n::tr(lang, "email.reset.subject", None),
                body,
            })
            .await?;

        tracing::info!("Password reset email sent to user {}", user.id);
        Ok(())
    }

    async fn user_for_token(state: &AppState, token: &str) -> AppResult<(String, User)> {
        let invalid = || AppError::BadRequest(i18n::t("password_reset.invalid_token"));
        let stored = PasswordResetRepository::find_valid(&state.db, token, Utc::now().naive_utc())
            .await?
            .ok_or_else(invalid)?;
        let user = UserRepository::find_by_id(&state.db, stored.user_id)
            .await?
            .ok_or_else(invalid)?;
        Ok((stored.id, user))
    }

    pub async fn verify(state: &AppState, token: Option<&str>) -> AppResult<TokenCheck> {
        let token = token.map(str::trim).unwrap_or_default();
        if token.is_empty() {
            return Err(AppError::BadRequest(i18n::t(
                "password_reset.token_required",
            )));
        }
        let (_, user) = Self::user_for_token(state, token).await?;
        Ok(TokenCheck {
            valid: true,
            email: user.email,
        })
    }

    /// The token is checked before the password so an expired link is reported
    /// as such even when the new password is also unacceptable.
    pub async fn reset(
        state: &AppState,
        token: Option<&str>,
        password: Option<&str>,
    ) -> AppResult<String> {
        let token = token.map(str::trim).unwrap_or_default();
        let password = password.unwrap_or_default();
        if token.is_empty() || password.is_empty() {
            return Err(AppError::BadRequest(i18n::t(
                "password_reset.token_and_password_required",
            )));
        }

        let (token_id, user) = Self::user_for_token(state, token).await?;
        if password.chars().count() < PASSWORD_MIN_LENGTH {
            return Err(AppError::BadRequest(i18n::t(
                "password_reset.password_too_short",
            )));
        }

        let hash =
            AuthService::hash_password(password.to_string(), state.config.security.bcrypt_cost)
                .await?;
        if !PasswordResetRepository::mark_used(&state.db, &token_id).await? {
            return Err(AppError::BadRequest(i18n::t("password_reset.invalid_token")));
        }
        UserRepository::update_password(&state.db, user.id, &hash).await?;
        tracing::info!("Password reset completed for user {}", user.id);

        let lang = Some(state.config.mail.lang.as_str());
        let confirmation = Email {
            to: user.email.clone(),
            subject: i18n::tr(lang, "email.reset_confirmation.subject", None),
            body: i18n::tr(
                lang,
                "email.reset_confirmation.body",
                Some(&[("name", user.name.as_str())]),
            ),
        };
        if let Err(e) = state.mailer.send(confirmation).await {
            tracing::warn!(
                "Failed to send password change confirmation to user {}: {}",
                user.id,
                e
            );
        }

        Ok(i18n::t("password_reset.done"))
    }
}
