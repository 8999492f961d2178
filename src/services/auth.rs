use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::Config;
use crate::db::models::User;
use crate::db::repository::{RefreshTokenRepository, UserRepository};
use crate::error::{AppError, AppResult};
use crate::AppState;

/// Length of the opaque refresh token handed to clients.
pub const REFRESH_TOKEN_LENGTH: usize = 128;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub username: String,
    pub roles: Vec<String>,
    pub exp: usize,
    pub iat: usize,
}

/// Issued on login and on refresh.
#[derive(Debug, Serialize)]
pub struct TokenPair {
    pub token: String,
    pub refresh_token: String,
    /// Unix timestamp after which `refresh_token` is rejected.
    pub refresh_token_expiration: i64,
}

pub struct AuthService;

impl AuthService {
    /// Create a signed access token for a user
    pub fn create_jwt(config: &Config, user: &User) -> AppResult<String> {
        let now = Utc::now();
        let exp = now + Duration::hours(config.jwt.expiration_hours);
        let claims = Claims {
            sub: user.id.to_string(),
            username: user.username.clone(),
            roles: user.roles(),
            iat: now.timestamp() as usize,
            exp: exp.timestamp() as usize,
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.jwt.secret.as_bytes()),
        )?;
        Ok(token)
    }

    /// Decode and validate a JWT, returning the claims
    pub fn decode_jwt(config: &Config, token: &str) -> AppResult<Claims> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(config.jwt.secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(token_data.claims)
    }

    /// Get user from JWT token. The user must still exist.
    pub async fn get_user_from_token(state: &AppState, token: &str) -> AppResult<User> {
        let claims = Self::decode_jwt(&state.config, token)?;
        let user_id: i64 = claims.sub.parse().map_err(|_| AppError::Unauthorized)?;
        let user = UserRepository::find_by_id(&state.db, user_id)
            .await?
            .ok_or(AppError::Unauthorized)?;
        Ok(user)
    }

    pub async fn hash_password(password: String, cost: u32) -> AppResult<String> {
        tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("hashing task failed: {e}")))?
            .map_err(|e| AppError::Internal(e.into()))
    }

    pub async fn verify_password(password: String, hash: String) -> AppResult<bool> {
        tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("verification task failed: {e}")))?
            .map_err(|e| AppError::Internal(e.into()))
    }

    /// Check credentials and issue a token pair.
    pub async fn login(state: &AppState, username: &str, password: &str) -> AppResult<TokenPair> {
        let Some(user) = UserRepository::find_by_username(&state.db, username).await? else {
            tracing::debug!("Login attempt for unknown user");
            return Err(AppError::Unauthorized);
        };

        let valid = Self::verify_password(password.to_string(), user.password_hash.clone())
            .await
            .unwrap_or(false);
        if !valid {
            tracing::debug!("Invalid password for user {}", user.id);
            return Err(AppError::Unauthorized);
        }

        tracing::info!("User {} logged in", user.id);
        Self::issue_tokens(state, &user).await
    }

    pub async fn issue_tokens(state: &AppState, user: &User) -> AppResult<TokenPair> {
        let token = Self::create_jwt(&state.config, user)?;

        let refresh_token = Self::generate_random_string(REFRESH_TOKEN_LENGTH);
        let expires_at = Utc::now() + Duration::days(state.config.jwt.refresh_token_ttl_days);
        RefreshTokenRepository::create(
            &state.db,
            &Self::hash_token(&refresh_token),
            user.id,
            expires_at.naive_utc(),
        )
        .await?;

        Ok(TokenPair {
            token,
            refresh_token,
            refresh_token_expiration: expires_at.timestamp(),
        })
    }

    /// Redeem a refresh token. The presented token is consumed and a new pair issued.
    pub async fn refresh(state: &AppState, refresh_token: &str) -> AppResult<TokenPair> {
        let stored = RefreshTokenRepository::consume(
            &state.db,
            &Self::hash_token(refresh_token),
            Utc::now().naive_utc(),
        )
        .await?
        .ok_or(AppError::Unauthorized)?;

        let user = UserRepository::find_by_id(&state.db, stored.user_id)
            .await?
            .ok_or(AppError::Unauthorized)?;

        Self::issue_tokens(state, &user).await
    }

    /// SHA-256 hex digest; only this is persisted for refresh tokens.
    pub fn hash_token(raw: &str) -> String {
        hex::encode(Sha256::digest(raw.as_bytes()))
    }

    pub fn generate_random_string(length: usize) -> String {
        use rand::Rng;
        const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
        let mut rng = rand::thread_rng();
        (0..length)
            .map(|_| {
                let idx = rng.gen_range(0..CHARSET.len());
                CHARSET[idx] as char
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::ROLE_ADMIN;
    use crate::test_support::{seed_user, test_state, TEST_PASSWORD};

    #[tokio::test]
    async fn jwt_round_trip_carries_identity_and_roles() {
        let state = test_state().await;
        let user = seed_user(&state.db, "admin", &[ROLE_ADMIN]).await;

        let token = AuthService::create_jwt(&state.config, &user).unwrap();
        let claims = AuthService::decode_jwt(&state.config, &token).unwrap();
        assert_eq!(claims.sub, user.id.to_string());
        assert_eq!(claims.username, "admin");
        assert!(claims.roles.contains(&ROLE_ADMIN.to_string()));

        let loaded = AuthService::get_user_from_token(&state, &token).await.unwrap();
        assert_eq!(loaded.id, user.id);
    }

    #[tokio::test]
    async fn token_signed_with_other_secret_is_rejected() {
        let state = test_state().await;
        let user = seed_user(&state.db, "jan", &[]).await;
        let mut other = state.config.clone();
        other.jwt.secret = "another-secret".into();

        let token = AuthService::create_jwt(&other, &user).unwrap();
        assert!(matches!(
            AuthService::decode_jwt(&state.config, &token),
            Err(AppError::Jwt(_))
        ));
    }

    #[tokio::test]
    async fn login_rejects_bad_password_and_accepts_good_one() {
        let state = test_state().await;
        seed_user(&state.db, "jan", &[]).await;

        assert!(matches!(
            AuthService::login(&state, "jan", "wrong-password").await,
            Err(AppError::Unauthorized)
        ));
        assert!(matches!(
            AuthService::login(&state, "nobody", TEST_PASSWORD).await,
            Err(AppError::Unauthorized)
        ));

        let pair = AuthService::login(&state, "jan", TEST_PASSWORD).await.unwrap();
        assert_eq!(pair.refresh_token.len(), REFRESH_TOKEN_LENGTH);
        assert!(pair.refresh_token_expiration > Utc::now().timestamp());
    }

    #[tokio::test]
    async fn refresh_rotates_token() {
        let state = test_state().await;
        seed_user(&state.db, "jan", &[]).await;
        let pair = AuthService::login(&state, "jan", TEST_PASSWORD).await.unwrap();

        let rotated = AuthService::refresh(&state, &pair.refresh_token).await.unwrap();
        assert_ne!(rotated.refresh_token, pair.refresh_token);

        assert!(matches!(
            AuthService::refresh(&state, &pair.refresh_token).await,
            Err(AppError::Unauthorized)
        ));
    }

    #[test]
    fn token_hash_is_hex_sha256() {
        let hash = AuthService::hash_token("abc");
        assert_eq!(
            hash,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
