//! Shared fixtures for unit and router tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db::models::{Apartment, ApartmentData, NewUser, User};
use crate::db::repository::{ApartmentRepository, UserRepository};
use crate::services::auth::AuthService;
use crate::services::mailer::{Email, MailError, Mailer};
use crate::AppState;

pub const TEST_PASSWORD: &str = "secret123";

/// In-memory database with migrations applied. A single connection keeps
/// every query on the same memory database.
pub async fn test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    sqlx::migrate!("./migrations").run(&pool).await.unwrap();
    pool
}

pub fn test_config() -> Config {
    let mut config = Config::default();
    config.jwt.secret = "test-secret".to_string();
    config.security.bcrypt_cost = 4;
    config.server.frontend_url = "http://frontend.test".to_string();
    config.mail.lang = "en".to_string();
    config.storage.uploads_dir = std::env::temp_dir()
        .join(format!("extranet-uploads-{}", uuid::Uuid::new_v4()))
        .to_string_lossy()
        .into_owned();
    config
}

#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<Email>>,
    pub fail: bool,
}

impl RecordingMailer {
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<Email> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: Email) -> Result<(), MailError> {
        if self.fail {
            return Err(MailError::Transport("relay unavailable".into()));
        }
        self.sent.lock().unwrap().push(email);
        Ok(())
    }
}

pub async fn test_state_with_mailer(mailer: Arc<RecordingMailer>) -> Arc<AppState> {
    Arc::new(AppState {
        db: test_pool().await,
        config: test_config(),
        mailer,
        share_lock: tokio::sync::Mutex::new(()),
    })
}

pub async fn test_state() -> Arc<AppState> {
    test_state_with_mailer(Arc::new(RecordingMailer::default())).await
}

pub fn new_user(username: &str, roles: &[&str]) -> NewUser {
    NewUser {
        username: username.to_string(),
        email: format!("{username}@example.com"),
        name: "Jan".to_string(),
        surname: "Kowalski".to_string(),
        phone: None,
        roles: roles.iter().map(|r| r.to_string()).collect(),
        password_hash: "not-a-real-hash".to_string(),
    }
}

/// Persist a user whose password is [`TEST_PASSWORD`].
pub async fn seed_user(pool: &SqlitePool, username: &str, roles: &[&str]) -> User {
    let mut user = new_user(username, roles);
    user.password_hash = bcrypt::hash(TEST_PASSWORD, 4).unwrap();
    UserRepository::create(pool, &user).await.unwrap()
}

pub fn apartment_data(name: &str) -> ApartmentData {
    ApartmentData {
        name: name.to_string(),
        price_for_clean_cents: 15050,
        vat_bp: 2300,
        can_faktura: true,
        picture: None,
    }
}

pub async fn seed_apartment(pool: &SqlitePool, name: &str) -> Apartment {
    ApartmentRepository::create(pool, &apartment_data(name))
        .await
        .unwrap()
}

/// `Authorization` header value for the given user.
pub fn bearer(state: &AppState, user: &User) -> String {
    format!(
        "Bearer {}",
        AuthService::create_jwt(&state.config, user).unwrap()
    )
}

/// A solid-colour PNG of the given size.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([200, 120, 40]));
    let mut out = std::io::Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut out, image::ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

pub fn png_data_url(width: u32, height: u32) -> String {
    use base64::Engine;
    format!(
        "data:image/png;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(png_bytes(width, height))
    )
}
