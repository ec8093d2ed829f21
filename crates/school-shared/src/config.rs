//! Configuration management
//!
//! Sources are layered: built-in defaults, `config/default`, `config/{APP_ENV}`,
//! then `SCHOOL_*` environment variables (`SCHOOL_DATABASE__URL`,
//! `SCHOOL_JWT__SECRET`, ...). Secrets have no defaults.

use config::{Config, Environment, File};
use serde::Deserialize;
use validator::Validate;

use crate::constants::DEFAULT_ACCESS_TOKEN_EXPIRY;
use crate::error::AppError;

#[derive(Debug, Deserialize, Clone, Validate)]
pub struct AppConfig {
    pub app: AppSettings,
    #[validate(nested)]
    pub database: DatabaseSettings,
    #[validate(nested)]
    pub jwt: JwtSettings,
    #[validate(nested)]
    pub http: HttpSettings,
    #[serde(default)]
    pub log: LogSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppSettings {
    pub env: String,
    pub host: String,
    pub port: u16,
    pub name: String,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Deserialize, Clone, Validate)]
pub struct DatabaseSettings {
    pub backend: DatabaseBackend,
    /// Required for the postgres backend; never defaulted
    #[serde(default)]
    pub url: Option<String>,
    #[validate(range(min = 1, max = 1000))]
    pub max_connections: u32,
    pub min_connections: u32,
    #[validate(range(min = 1, max = 300))]
    pub acquire_timeout_secs: u64,
    pub auto_migrate: bool,
}

#[derive(Debug, Deserialize, Clone, Validate)]
pub struct JwtSettings {
    #[validate(length(min = 32, message = "JWT secret is too short"))]
    pub secret: String,
    #[validate(length(min = 1))]
    pub issuer: String,
    #[validate(length(min = 1))]
    pub audience: String,
    #[validate(range(min = 1))]
    pub access_token_expiry: i64,
    pub leeway_secs: u64,
}

#[derive(Debug, Deserialize, Clone, Validate)]
pub struct HttpSettings {
    #[validate(range(min = 1, max = 600))]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct LogSettings {
    /// When set, logs are also written to a daily rolling file in this directory
    pub directory: Option<String>,
}

impl AppConfig {
    pub fn load() -> Result<Self, AppError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".into());
        let config = Config::builder()
            .set_default("app.env", env.as_str())?
            .set_default("app.host", "127.0.0.1")?
            .set_default("app.port", 8080)?
            .set_default("app.name", "school-server")?
            .set_default("database.backend", "postgres")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 1)?
            .set_default("database.acquire_timeout_secs", 3)?
            .set_default("database.auto_migrate", true)?
            .set_default("jwt.access_token_expiry", DEFAULT_ACCESS_TOKEN_EXPIRY)?
            .set_default("jwt.leeway_secs", 0)?
            .set_default("http.request_timeout_secs", 30)?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(
                Environment::with_prefix("SCHOOL")
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("http.allowed_origins")
                    .try_parsing(true),
            )
            .build()?;

        let loaded: AppConfig = config.try_deserialize()?;
        loaded.check()?;
        Ok(loaded)
    }

    /// Field-level validation plus cross-field rules
    pub fn check(&self) -> Result<(), AppError> {
        self.validate()?;
        if self.database.backend == DatabaseBackend::Postgres && self.database.url.is_none() {
            return Err(AppError::InternalError(
                "database.url is required for the postgres backend".to_string(),
            ));
        }
        if self.database.min_connections > self.database.max_connections {
            return Err(AppError::InternalError(
                "database.min_connections exceeds database.max_connections".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> AppConfig {
        AppConfig {
            app: AppSettings {
                env: "test".into(),
                host: "127.0.0.1".into(),
                port: 8080,
                name: "school-server".into(),
            },
            database: DatabaseSettings {
                backend: DatabaseBackend::Postgres,
                url: Some("postgres://localhost/school".into()),
                max_connections: 5,
                min_connections: 1,
                acquire_timeout_secs: 3,
                auto_migrate: true,
            },
            jwt: JwtSettings {
                secret: "0123456789abcdef0123456789abcdef".into(),
                issuer: "school-auth".into(),
                audience: "school-api".into(),
                access_token_expiry: 3600,
                leeway_secs: 0,
            },
            http: HttpSettings {
                request_timeout_secs: 30,
                allowed_origins: vec![],
            },
            log: LogSettings::default(),
        }
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(sample().check().is_ok());
    }

    #[test]
    fn test_short_secret_rejected() {
        let mut cfg = sample();
        cfg.jwt.secret = "short".into();
        assert!(matches!(cfg.check(), Err(AppError::InvalidConfig(_))));
    }

    #[test]
    fn test_postgres_requires_url() {
        let mut cfg = sample();
        cfg.database.url = None;
        assert!(cfg.check().is_err());

        cfg.database.backend = DatabaseBackend::Memory;
        assert!(cfg.check().is_ok());
    }

    #[test]
    fn test_pool_bounds() {
        let mut cfg = sample();
        cfg.database.min_connections = 50;
        assert!(cfg.check().is_err());
    }
}
