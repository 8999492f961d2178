//! Initialization helpers for the application:
//! - database connection + migrations
//! - optional bootstrap administrator
//! - background worker spawn helpers
//!
//! This module centralizes bits that would otherwise live in `main.rs`.

use std::{path::Path, sync::Arc};

use anyhow::Result;
use chrono::Utc;
use sqlx::SqlitePool;

use crate::config::{BootstrapAdminConfig, Config};
use crate::db::models::{NewUser, ROLE_ADMIN, ROLE_USER};
use crate::db::repository::{PasswordResetRepository, RefreshTokenRepository, UserRepository};
use crate::services::auth::AuthService;

/// Redact potentially sensitive information from a database URL before logging.
///
/// Attempts to parse the URL and remove userinfo (username:password) components.
/// Falls back to removing everything before '@' or returning "(redacted)".
pub fn redact_db_url(db_url: &str) -> String {
    if let Ok(url) = url::Url::parse(db_url) {
        let scheme = url.scheme();
        let host = url.host_str().unwrap_or("");
        let port_part = url.port().map(|p| format!(":{}", p)).unwrap_or_default();
        let path = url.path();
        format!("{}://{}{}{}", scheme, host, port_part, path)
    } else {
        if let Some(at_pos) = db_url.find('@') {
            let without_creds = &db_url[at_pos + 1..];
            return format!("(redacted){}", without_creds);
        }
        "(redacted)".to_string()
    }
}

/// Initialize SQLite database connection and run migrations.
///
/// Creates the parent directory for the database file (if applicable),
/// opens a connection pool using `create_if_missing(true)` with foreign keys
/// enforced, and runs migrations.
pub async fn init_db(config: &Config) -> Result<SqlitePool> {
    let db_url = &config.database.url;
    tracing::info!("Connecting to database: {}", redact_db_url(db_url));

    let db_path = db_url.strip_prefix("sqlite://").unwrap_or(db_url);
    let db_file_path = Path::new(db_path);

    if let Some(parent) = db_file_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| {
                anyhow::anyhow!(
                    "Failed to create database directory {}: {}",
                    parent.display(),
                    e
                )
            })?;
        }
    }

    let connect_options = sqlx::sqlite::SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect_with(connect_options)
        .await?;

    tracing::info!("Running database migrations");
    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}

/// Create the configured administrator unless the username is already taken.
/// Returns `true` when an account was created.
pub async fn ensure_bootstrap_admin(
    pool: &SqlitePool,
    admin: &BootstrapAdminConfig,
    bcrypt_cost: u32,
) -> Result<bool> {
    if UserRepository::find_by_username(pool, &admin.username)
        .await?
        .is_some()
    {
        tracing::debug!("Bootstrap admin {} already exists", admin.username);
        return Ok(false);
    }

    let password_hash = AuthService::hash_password(admin.password.clone(), bcrypt_cost).await?;
    let user = UserRepository::create(
        pool,
        &NewUser {
            username: admin.username.clone(),
            email: admin.email.clone(),
            name: "Admin".to_string(),
            surname: "Admin".to_string(),
            phone: None,
            roles: vec![ROLE_USER.to_string(), ROLE_ADMIN.to_string()],
            password_hash,
        },
    )
    .await?;

    tracing::info!("Created bootstrap admin {} (id {})", user.username, user.id);
    Ok(true)
}

/// Delete expired refresh tokens and used or expired reset tokens.
/// Returns the number of removed rows.
pub async fn purge_expired_tokens(pool: &SqlitePool) -> Result<u64> {
    let now = Utc::now().naive_utc();
    let refresh = RefreshTokenRepository::delete_expired(pool, now).await?;
    let reset = PasswordResetRepository::delete_stale(pool, now).await?;
    Ok(refresh + reset)
}

/// Spawn background workers:
/// - periodic sweep of expired refresh and password reset tokens
///
/// These are spawned as `tokio::spawn` tasks. The function returns a vector of
/// `JoinHandle<()>`s so callers can await task shutdown. Each worker listens
/// for a shutdown notification via a `tokio::sync::broadcast::Sender<()>`.
pub fn spawn_background_workers(
    state: Arc<crate::AppState>,
    shutdown: tokio::sync::broadcast::Sender<()>,
) -> Vec<tokio::task::JoinHandle<()>> {
    let mut handles = Vec::new();

    if state.config.maintenance.token_cleanup_enabled {
        let mut shutdown_rx = shutdown.subscribe();
        let state = state.clone();
        let interval =
            std::time::Duration::from_secs(state.config.maintenance.token_cleanup_interval_seconds);
        handles.push(tokio::spawn(async move {
            loop {
                match purge_expired_tokens(&state.db).await {
                    Ok(0) => tracing::debug!("Token sweep: nothing to remove"),
                    Ok(n) => tracing::info!("Token sweep removed {} expired tokens", n),
                    Err(e) => tracing::warn!("Token sweep failed: {:?}", e),
                }

                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        tracing::info!("Token sweeper shutting down");
                        break;
                    }
                    _ = tokio::time::sleep(interval) => {}
                }
            }
        }));
    } else {
        tracing::info!("Token sweeper disabled");
    }

    handles
}
