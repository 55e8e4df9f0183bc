//! # Rusty-Press Binary
//!
//! Assembles the server from configuration: storage is chosen at startup
//! (PostgreSQL when a database URL is configured, memory otherwise) and the
//! PostgreSQL adapter itself is a compile-time feature.

use std::sync::Arc;

use anyhow::Context;
use api_adapters::AppState;
use auth_adapters::{Argon2PasswordHasher, JwtTokenService};
use configs::{LogFormat, LoggingSettings, Settings};
use domains::{
    CommentRepository, PasswordHasher, PostRepository, StatusRepository, TaxonomyRepository,
    TokenService, TransitionTable, UserRepository,
};
use secrecy::ExposeSecret;
use services::{CatalogHandle, Registration};
use storage_adapters::MemoryStore;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[cfg(feature = "db-postgres")]
use storage_adapters::PgStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let dotenv = configs::load_dotenv();
    let settings = Settings::load().context("failed to load configuration")?;
    init_tracing(&settings.logging);
    if let Some(path) = dotenv {
        info!(path = %path.display(), "loaded .env");
    }

    // 1. Auth adapters
    let hasher: Arc<dyn PasswordHasher> = Arc::new(Argon2PasswordHasher::new());
    let tokens: Arc<dyn TokenService> = Arc::new(JwtTokenService::new(
        settings.auth.jwt_secret.expose_secret().as_bytes(),
        chrono::Duration::hours(settings.auth.token_ttl_hours),
    ));

    // 2. Storage, then the catalog loaded from it
    let state = match &settings.database.url {
        #[cfg(feature = "db-postgres")]
        Some(url) => {
            let store = PgStore::connect(url.expose_secret(), settings.database.max_connections).await?;
            if settings.database.run_migrations {
                store.migrate().await?;
            }
            assemble(Arc::new(store), hasher, tokens).await?
        }
        #[cfg(not(feature = "db-postgres"))]
        Some(_) => anyhow::bail!("a database URL is configured but this build lacks the db-postgres feature"),
        None => {
            warn!("no database configured; content lives in memory and is lost on exit");
            let state = assemble(Arc::new(MemoryStore::new()), hasher, tokens).await?;
            seed_moderator_from_env(&state).await?;
            state
        }
    };

    // 3. HTTP
    let app = api_adapters::router(state);
    let addr = settings.server.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!(%addr, "rusty-press listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("shut down cleanly");
    Ok(())
}

async fn assemble<S>(store: Arc<S>, hasher: Arc<dyn PasswordHasher>, tokens: Arc<dyn TokenService>) -> anyhow::Result<AppState>
where
    S: StatusRepository + PostRepository + CommentRepository + TaxonomyRepository + UserRepository + 'static,
{
    let catalog = services::bootstrap(store.as_ref()).await.context("failed to load status catalog")?;
    info!(statuses = catalog.len(), "status catalog loaded");
    Ok(AppState::wire(store, CatalogHandle::new(catalog), TransitionTable::standard(), hasher, tokens))
}

/// The memory store starts empty, so the moderator account comes from the same
/// variables the seed binary reads.
async fn seed_moderator_from_env(state: &AppState) -> anyhow::Result<()> {
    let (Ok(username), Ok(email), Ok(password)) = (
        std::env::var("SEED_MODERATOR_USERNAME"),
        std::env::var("SEED_MODERATOR_EMAIL"),
        std::env::var("SEED_MODERATOR_PASSWORD"),
    ) else {
        return Ok(());
    };
    let user = state
        .accounts
        .ensure_moderator(Registration { username, email, password })
        .await
        .context("failed to create moderator account")?;
    info!(username = %user.username, "moderator account ready");
    Ok(())
}

fn init_tracing(logging: &LoggingSettings) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match logging.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.pretty().init(),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
