//! # Seed
//!
//! Prepares a PostgreSQL database: runs migrations, inserts any missing
//! standard statuses and makes sure a moderator account exists.
//!
//! The moderator is read from `SEED_MODERATOR_USERNAME`, `SEED_MODERATOR_EMAIL`
//! and `SEED_MODERATOR_PASSWORD`; if any is unset that step is skipped.

use std::sync::Arc;

use anyhow::Context;
use auth_adapters::{Argon2PasswordHasher, JwtTokenService};
use configs::Settings;
use secrecy::ExposeSecret;
use services::{AccountService, Registration};
use storage_adapters::PgStore;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let dotenv = configs::load_dotenv();
    let settings = Settings::load().context("failed to load configuration")?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.logging.level)))
        .init();
    if let Some(path) = dotenv {
        info!(path = %path.display(), "loaded .env");
    }

    let url = settings
        .database
        .url
        .as_ref()
        .context("RUSTY_PRESS__DATABASE__URL must be set to seed a database")?;
    let store = Arc::new(PgStore::connect(url.expose_secret(), settings.database.max_connections).await?);
    store.migrate().await?;

    let catalog = services::bootstrap(store.as_ref()).await.context("failed to seed statuses")?;
    info!(statuses = catalog.len(), "status catalog ready");

    let (Ok(username), Ok(email), Ok(password)) = (
        std::env::var("SEED_MODERATOR_USERNAME"),
        std::env::var("SEED_MODERATOR_EMAIL"),
        std::env::var("SEED_MODERATOR_PASSWORD"),
    ) else {
        warn!("SEED_MODERATOR_* not set; skipping moderator account");
        return Ok(());
    };

    let accounts = AccountService::new(
        store,
        Arc::new(Argon2PasswordHasher::new()),
        Arc::new(JwtTokenService::new(
            settings.auth.jwt_secret.expose_secret().as_bytes(),
            chrono::Duration::hours(settings.auth.token_ttl_hours),
        )),
    );
    let moderator = accounts
        .ensure_moderator(Registration { username, email, password })
        .await
        .context("failed to create moderator account")?;
    info!(username = %moderator.username, id = %moderator.id, "moderator account ready");
    Ok(())
}
