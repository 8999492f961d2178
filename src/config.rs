use std::env;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub security: SecurityConfig,
    pub storage: StorageConfig,
    pub mail: MailConfig,
    pub rate_limit: RateLimitConfig,
    pub maintenance: MaintenanceConfig,
    pub bootstrap_admin: Option<BootstrapAdminConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Allowed CORS origin and base of links sent by email (password reset).
    pub frontend_url: String,
    /// Output format for logs: "plain" (default) or "json". Read from `LOG_FORMAT`.
    pub log_format: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub expiration_hours: i64,
    pub refresh_token_ttl_days: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    pub bcrypt_cost: u32,
    pub password_reset_ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Directory served under `/uploads`. Apartment pictures go to `<uploads_dir>/apartments`.
    pub uploads_dir: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    pub from_address: String,
    pub from_name: String,
    /// Language used for outgoing emails (`pl` or `en`).
    pub lang: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    /// Allowed requests per second (per IP) for public auth endpoints (login, refresh, password reset)
    pub auth_per_second: u32,
    /// Burst size for public auth endpoints
    pub auth_burst: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MaintenanceConfig {
    /// Whether the expired-token sweeper runs.
    pub token_cleanup_enabled: bool,
    /// How often (seconds) expired refresh/reset tokens are purged.
    pub token_cleanup_interval_seconds: u64,
}

/// Administrator account created at startup when no user with this username exists.
#[derive(Debug, Clone, Deserialize)]
pub struct BootstrapAdminConfig {
    pub username: String,
    pub password: String,
    pub email: String,
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" => Some(true),
        "0" | "false" | "no" => Some(false),
        _ => None,
    }
}

/// `MAIL_LANG` reduced to a supported short code (`pl-PL` -> `pl`); `pl` otherwise.
fn mail_language(raw: Option<String>) -> String {
    let Some(raw) = raw.filter(|v| !v.trim().is_empty()) else {
        return "pl".to_string();
    };
    let lang = crate::i18n::normalize_language(raw.trim());
    if crate::i18n::is_supported_language(&lang) {
        lang
    } else {
        tracing::warn!("Unsupported MAIL_LANG {:?}, falling back to pl", raw);
        "pl".to_string()
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let bootstrap_admin = match (env::var("ADMIN_USERNAME"), env::var("ADMIN_PASSWORD")) {
            (Ok(username), Ok(password)) if !username.is_empty() && !password.is_empty() => {
                Some(BootstrapAdminConfig {
                    email: env::var("ADMIN_EMAIL")
                        .unwrap_or_else(|_| format!("{}@localhost", username)),
                    username,
                    password,
                })
            }
            _ => None,
        };

        Ok(Config {
            server: ServerConfig {
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env::var("PORT")
                    .unwrap_or_else(|_| "8080".to_string())
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue("PORT".to_string()))?,
                frontend_url: env::var("FRONTEND_URL")
                    .unwrap_or_else(|_| "http://localhost:3000".to_string()),
                log_format: env::var("LOG_FORMAT").unwrap_or_else(|_| "plain".to_string()),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL")
                    .unwrap_or_else(|_| "sqlite://data/extranet.db".to_string()),
                max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                    .unwrap_or_else(|_| "5".to_string())
                    .parse()
                    .unwrap_or(5),
            },
            jwt: JwtConfig {
                secret: env::var("JWT_SECRET")
                    .map_err(|_| ConfigError::MissingEnv("JWT_SECRET".to_string()))?,
                expiration_hours: env::var("JWT_EXPIRATION_HOURS")
                    .unwrap_or_else(|_| "1".to_string())
                    .parse()
                    .unwrap_or(1),
                refresh_token_ttl_days: env::var("REFRESH_TOKEN_TTL_DAYS")
                    .unwrap_or_else(|_| "30".to_string())
                    .parse()
                    .unwrap_or(30),
            },
            security: SecurityConfig {
                bcrypt_cost: env::var("BCRYPT_COST")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(bcrypt::DEFAULT_COST),
                password_reset_ttl_minutes: env::var("PASSWORD_RESET_TTL_MINUTES")
                    .unwrap_or_else(|_| "60".to_string())
                    .parse()
                    .unwrap_or(60),
            },
            storage: StorageConfig {
                uploads_dir: env::var("UPLOADS_DIR")
                    .unwrap_or_else(|_| "public/uploads".to_string()),
            },
            mail: MailConfig {
                from_address: env::var("MAIL_FROM_ADDRESS")
                    .unwrap_or_else(|_| "extranet@localhost".to_string()),
                from_name: env::var("MAIL_FROM_NAME")
                    .unwrap_or_else(|_| "Extranet System".to_string()),
                lang: mail_language(env::var("MAIL_LANG").ok()),
            },
            rate_limit: RateLimitConfig {
                auth_per_second: env::var("RATE_LIMIT_AUTH_PER_SECOND")
                    .unwrap_or_else(|_| "3".to_string())
                    .parse()
                    .unwrap_or(3),
                auth_burst: env::var("RATE_LIMIT_AUTH_BURST")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse()
                    .unwrap_or(10),
            },
            maintenance: MaintenanceConfig {
                token_cleanup_enabled: env::var("TOKEN_CLEANUP_ENABLED")
                    .ok()
                    .and_then(|v| parse_bool(&v))
                    .unwrap_or(true),
                token_cleanup_interval_seconds: env::var("TOKEN_CLEANUP_INTERVAL_SECONDS")
                    .unwrap_or_else(|_| "3600".to_string())
                    .parse()
                    .unwrap_or(3600u64),
            },
            bootstrap_admin,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),

    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
                frontend_url: "http://localhost:3000".to_string(),
                log_format: "plain".to_string(),
            },
            database: DatabaseConfig {
                url: "sqlite://data/extranet.db".to_string(),
                max_connections: 5,
            },
            jwt: JwtConfig {
                secret: String::new(),
                expiration_hours: 1,
                refresh_token_ttl_days: 30,
            },
            security: SecurityConfig {
                bcrypt_cost: bcrypt::DEFAULT_COST,
                password_reset_ttl_minutes: 60,
            },
            storage: StorageConfig {
                uploads_dir: "public/uploads".to_string(),
            },
            mail: MailConfig {
                from_address: "extranet@localhost".to_string(),
                from_name: "Extranet System".to_string(),
                lang: "pl".to_string(),
            },
            rate_limit: RateLimitConfig {
                auth_per_second: 3,
                auth_burst: 10,
            },
            maintenance: MaintenanceConfig {
                token_cleanup_enabled: true,
                token_cleanup_interval_seconds: 3600,
            },
            bootstrap_admin: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_bool_accepts_common_spellings() {
        assert_eq!(parse_bool("YES"), Some(true));
        assert_eq!(parse_bool("1"), Some(true));
        assert_eq!(parse_bool("false"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn mail_language_is_normalized() {
        assert_eq!(mail_language(None), "pl");
        assert_eq!(mail_language(Some("EN-gb".into())), "en");
        assert_eq!(mail_language(Some("de".into())), "pl");
    }

    #[test]
    fn default_config_matches_documented_defaults() {
        let config = Config::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.jwt.refresh_token_ttl_days, 30);
        assert_eq!(config.security.password_reset_ttl_minutes, 60);
        assert!(config.bootstrap_admin.is_none());
    }
}
