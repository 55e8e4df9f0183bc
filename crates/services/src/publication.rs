//! # Publication Service
//!
//! Moves posts through the status workflow. The policy lives in the
//! `TransitionTable`; this service resolves statuses, derives the caller's
//! role, and hands the compare-and-set to the repository.

use std::sync::Arc;

use chrono::Utc;
use domains::status::{DRAFT, PENDING, PUBLISHED};
use domains::{
    role_on_post, Actor, ContentStatus, DomainError, NewStatus, Post, PostFilter, PostOrdering,
    PostRepository, Result, StatusCatalog, StatusRepository, StatusUpdate, TransitionTable,
    DEFAULT_PAGE_SIZE,
};
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::catalog::CatalogHandle;
use crate::utils::{required_text, validate_slug};

pub struct PublicationService {
    posts: Arc<dyn PostRepository>,
    statuses: Arc<dyn StatusRepository>,
    catalog: CatalogHandle,
    table: TransitionTable,
}

impl PublicationService {
    pub fn new(
        posts: Arc<dyn PostRepository>,
        statuses: Arc<dyn StatusRepository>,
        catalog: CatalogHandle,
        table: TransitionTable,
    ) -> Self {
        Self { posts, statuses, catalog, table }
    }

    pub fn catalog(&self) -> Arc<StatusCatalog> {
        self.catalog.snapshot()
    }

    pub fn table(&self) -> &TransitionTable {
        &self.table
    }

    /// Re-reads the status table from storage and swaps it in for every service.
    pub async fn reload_catalog(&self) -> Result<usize> {
        let rows = self.statuses.list_statuses().await?;
        let count = rows.len();
        self.catalog.replace(StatusCatalog::new(rows));
        info!(statuses = count, "status catalog reloaded");
        Ok(count)
    }

    fn ensure_moderator(actor: &Actor) -> Result<()> {
        if actor.is_moderator() {
            Ok(())
        } else {
            Err(DomainError::NotAuthorized("moderator privilege required".into()))
        }
    }

    /// Adds a status to the catalog. It can be assigned only once the
    /// transition table has rules naming it.
    pub async fn create_status(&self, actor: &Actor, input: NewStatus) -> Result<ContentStatus> {
        Self::ensure_moderator(actor)?;
        input.validate()?;
        let slug = input.slug.trim().to_string();
        validate_slug(&slug)?;
        if self.statuses.list_statuses().await?.iter().any(|s| s.slug == slug) {
            return Err(DomainError::Conflict(format!("status '{slug}' already exists")));
        }

        let status = self
            .statuses
            .upsert_status(ContentStatus {
                id: Uuid::now_v7(),
                name: required_text("name", &input.name)?,
                slug,
                description: input.description.trim().to_string(),
                icon: input.icon.trim().to_string(),
                color: input.color,
                is_published: input.is_published,
                is_active: true,
                sort_order: input.sort_order,
            })
            .await?;
        info!(status = %status.slug, actor = %actor.id, "status created");
        self.reload_catalog().await?;
        Ok(status)
    }

    /// Edits a status in place. `draft` must stay active since new posts start there.
    pub async fn update_status(&self, actor: &Actor, slug: &str, changes: StatusUpdate) -> Result<ContentStatus> {
        Self::ensure_moderator(actor)?;
        changes.validate()?;
        let mut status = self
            .statuses
            .list_statuses()
            .await?
            .into_iter()
            .find(|s| s.slug == slug)
            .ok_or_else(|| DomainError::not_found("status", slug))?;

        if slug == DRAFT && changes.is_active == Some(false) {
            return Err(DomainError::Validation("the draft status cannot be deactivated".into()));
        }
        if let Some(name) = changes.name {
            status.name = required_text("name", &name)?;
        }
        if let Some(description) = changes.description {
            status.description = description.trim().to_string();
        }
        if let Some(icon) = changes.icon {
            status.icon = icon.trim().to_string();
        }
        if let Some(color) = changes.color {
            status.color = color;
        }
        if let Some(is_published) = changes.is_published {
            status.is_published = is_published;
        }
        if let Some(is_active) = changes.is_active {
            status.is_active = is_active;
        }
        if let Some(sort_order) = changes.sort_order {
            status.sort_order = sort_order;
        }

        let status = self.statuses.upsert_status(status).await?;
        info!(status = %status.slug, actor = %actor.id, "status updated");
        self.reload_catalog().await?;
        Ok(status)
    }

    /// Moves `post_id` into `target_slug` on behalf of `actor`.
    ///
    /// Status and first-publication timestamp are written in one atomic step.
    /// If another writer changed the status after we read it, the call fails
    /// with `Conflict` and nothing is written.
    pub async fn transition(&self, post_id: Uuid, target_slug: &str, actor: &Actor) -> Result<Post> {
        let catalog = self.catalog.snapshot();
        let target = catalog.assignable(target_slug)?;

        let post = self
            .posts
            .get_post(post_id)
            .await?
            .ok_or_else(|| DomainError::not_found("post", post_id))?;

        let role = role_on_post(actor, post.author_id)?;
        let current = catalog.current(post.status_id)?;

        if let Err(err) = self.table.authorize(&current.slug, &target.slug, role) {
            warn!(
                post_id = %post.id,
                actor = %actor.id,
                from = %current.slug,
                to = %target.slug,
                error = %err,
                "transition refused"
            );
            return Err(err);
        }

        let publish_at = target.is_published.then(Utc::now);
        let updated = self
            .posts
            .transition_status(post.id, current.id, target.id, publish_at)
            .await?
            .ok_or_else(|| {
                DomainError::Conflict(format!("post {} changed status concurrently; reload and retry", post.id))
            })?;

        info!(
            post_id = %updated.id,
            actor = %actor.id,
            from = %current.slug,
            to = %target.slug,
            published_at = ?updated.published_at,
            "post transitioned"
        );
        Ok(updated)
    }

    pub async fn publish_now(&self, post_id: Uuid, actor: &Actor) -> Result<Post> {
        self.transition(post_id, PUBLISHED, actor).await
    }

    /// Readers see a post only while its status is a publishing one.
    pub fn is_visible(&self, post: &Post) -> bool {
        self.catalog.snapshot().is_published(post.status_id)
    }

    /// Work in progress for `author_id`: draft and pending posts, newest first.
    pub async fn drafts_for(&self, author_id: Uuid, limit: Option<i64>, offset: Option<i64>) -> Result<Vec<Post>> {
        let catalog = self.catalog.snapshot();
        let filter = PostFilter {
            author_id: Some(author_id),
            status_ids: Some(catalog.ids_for(&[DRAFT, PENDING])),
            ordering: PostOrdering::NewestFirst,
            limit: limit.unwrap_or(DEFAULT_PAGE_SIZE),
            offset: offset.unwrap_or(0),
            ..Default::default()
        };
        self.posts.list_posts(filter.normalized()).await
    }

    /// Slugs `actor` may move `post` to next; empty for strangers.
    pub fn available_transitions(&self, post: &Post, actor: &Actor) -> Vec<String> {
        let catalog = self.catalog.snapshot();
        let (Ok(role), Some(current)) = (role_on_post(actor, post.author_id), catalog.by_id(post.status_id)) else {
            return Vec::new();
        };
        self.table
            .targets_from(&current.slug, role)
            .into_iter()
            .filter(|slug| catalog.assignable(slug).is_ok())
            .map(str::to_string)
            .collect()
    }
}
