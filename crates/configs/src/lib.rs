//! rusty-press/crates/configs/src/lib.rs
//!
//! Layered runtime settings. Later sources override earlier ones:
//!
//! 1. built-in defaults
//! 2. `config/default.toml`
//! 3. `config/{RUSTY_PRESS_ENV}.toml`
//! 4. `RUSTY_PRESS__SECTION__KEY` environment variables
//!
//! Binaries call [`load_dotenv`] before [`Settings::load`] so a `.env` file
//! can feed step 4.

use std::path::PathBuf;

use config::{Config, Environment, File};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;

pub const ENV_PREFIX: &str = "RUSTY_PRESS";

/// Loads `.env` into the process environment. Returns the file used, if any.
///
/// Runs before logging exists, so the caller reports the path once its
/// subscriber is installed.
pub fn load_dotenv() -> Option<PathBuf> {
    dotenvy::dotenv().ok()
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl ServerSettings {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    /// Without a URL the server runs on the in-memory store.
    pub url: Option<SecretString>,
    pub max_connections: u32,
    pub run_migrations: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthSettings {
    pub jwt_secret: SecretString,
    pub token_ttl_hours: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub auth: AuthSettings,
    pub logging: LoggingSettings,
}

impl Settings {
    /// Reads the layered sources for `RUSTY_PRESS_ENV`, then validates.
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var(format!("{ENV_PREFIX}_ENV")).unwrap_or_else(|_| "development".into());
        Self::from_sources("config", &env)
    }

    /// Builds settings from `{dir}/default.toml`, `{dir}/{env}.toml` and the environment.
    pub fn from_sources(dir: &str, env: &str) -> Result<Self, ConfigError> {
        Self::layered(dir, env, Environment::with_prefix(ENV_PREFIX))
    }

    fn layered(dir: &str, env: &str, variables: Environment) -> Result<Self, ConfigError> {
        let settings: Settings = Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("database.max_connections", 10)?
            .set_default("database.run_migrations", true)?
            .set_default("auth.token_ttl_hours", 24)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "json")?
            .add_source(File::with_name(&format!("{dir}/default")).required(false))
            .add_source(File::with_name(&format!("{dir}/{env}")).required(false))
            .add_source(variables.prefix_separator("__").separator("__"))
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Invalid("server.port must be non-zero".into()));
        }
        if self.auth.jwt_secret.expose_secret().trim().is_empty() {
            return Err(ConfigError::Invalid("auth.jwt_secret must be set".into()));
        }
        if self.auth.token_ttl_hours <= 0 {
            return Err(ConfigError::Invalid("auth.token_ttl_hours must be positive".into()));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid("database.max_connections must be non-zero".into()));
        }
        Ok(())
    }
}
