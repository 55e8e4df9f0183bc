//! Shared, swappable snapshot of the status catalog.

use std::sync::{Arc, RwLock};

use domains::{Result, StatusCatalog, StatusRepository};
use tracing::info;

/// Every service holds a clone; a reload swaps the snapshot for all of them.
#[derive(Clone, Default)]
pub struct CatalogHandle {
    inner: Arc<RwLock<Arc<StatusCatalog>>>,
}

impl CatalogHandle {
    pub fn new(catalog: StatusCatalog) -> Self {
        Self { inner: Arc::new(RwLock::new(Arc::new(catalog))) }
    }

    /// Cheap clone of the current catalog; never held across an await.
    pub fn snapshot(&self) -> Arc<StatusCatalog> {
        match self.inner.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    pub fn replace(&self, catalog: StatusCatalog) {
        let next = Arc::new(catalog);
        match self.inner.write() {
            Ok(mut guard) => *guard = next,
            Err(poisoned) => *poisoned.into_inner() = next,
        }
    }
}

/// Inserts any standard status missing from storage, then loads the catalog.
///
/// Existing rows are left alone, so edits made by administrators survive.
pub async fn bootstrap(repo: &dyn StatusRepository) -> Result<StatusCatalog> {
    let existing = repo.list_statuses().await?;
    let mut inserted = 0;
    for status in StatusCatalog::defaults() {
        if !existing.iter().any(|s| s.slug == status.slug) {
            repo.upsert_status(status).await?;
            inserted += 1;
        }
    }
    if inserted > 0 {
        info!(inserted, "seeded missing statuses");
    }
    Ok(StatusCatalog::new(repo.list_statuses().await?))
}
