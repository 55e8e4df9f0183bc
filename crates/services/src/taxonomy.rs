//! # Taxonomy Service
//!
//! Categories and tags. Anyone may browse them; only moderators curate them.

use std::sync::Arc;

use chrono::Utc;
use domains::{
    Actor, Category, DomainError, Post, PostFilter, PostOrdering, PostRepository, Result, Tag,
    TaxonomyRepository,
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::catalog::CatalogHandle;
use crate::utils::{optional_text, required_text, slugify, validate_slug};

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct NewCategory {
    #[validate(length(min = 1, max = 100, message = "name must be 1 to 100 characters"))]
    pub name: String,
    #[validate(length(max = 200, message = "slug must be at most 200 characters"))]
    pub slug: Option<String>,
    #[validate(length(max = 1000, message = "description must be at most 1000 characters"))]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct NewTag {
    #[validate(length(min = 1, max = 100, message = "name must be 1 to 100 characters"))]
    pub name: String,
    #[validate(length(max = 200, message = "slug must be at most 200 characters"))]
    pub slug: Option<String>,
}

pub struct TaxonomyService {
    taxonomy: Arc<dyn TaxonomyRepository>,
    posts: Arc<dyn PostRepository>,
    catalog: CatalogHandle,
}

fn ensure_moderator(actor: &Actor) -> Result<()> {
    if actor.is_moderator() {
        Ok(())
    } else {
        Err(DomainError::NotAuthorized("moderator privilege required".into()))
    }
}

fn name_and_slug(name: &str, slug: Option<String>) -> Result<(String, String)> {
    let name = required_text("name", name)?;
    let slug = slug.map(|s| s.trim().to_string()).unwrap_or_else(|| slugify(&name));
    validate_slug(&slug)?;
    Ok((name, slug))
}

impl TaxonomyService {
    pub fn new(taxonomy: Arc<dyn TaxonomyRepository>, posts: Arc<dyn PostRepository>, catalog: CatalogHandle) -> Self {
        Self { taxonomy, posts, catalog }
    }

    pub async fn create_category(&self, actor: &Actor, input: NewCategory) -> Result<Category> {
        ensure_moderator(actor)?;
        input.validate()?;
        let (name, slug) = name_and_slug(&input.name, input.slug)?;
        if self.taxonomy.get_category(&slug).await?.is_some() {
            return Err(DomainError::Conflict(format!("category '{slug}' already exists")));
        }

        let category = self
            .taxonomy
            .create_category(Category {
                id: Uuid::now_v7(),
                name,
                slug,
                description: optional_text(input.description).unwrap_or_default(),
                created_at: Utc::now(),
            })
            .await?;
        info!(category = %category.slug, "category created");
        Ok(category)
    }

    pub async fn categories(&self) -> Result<Vec<Category>> {
        self.taxonomy.list_categories().await
    }

    pub async fn category(&self, slug: &str) -> Result<Category> {
        self.taxonomy
            .get_category(slug)
            .await?
            .ok_or_else(|| DomainError::not_found("category", slug))
    }

    /// Posts of the category keep existing, uncategorized.
    pub async fn delete_category(&self, actor: &Actor, slug: &str) -> Result<()> {
        ensure_moderator(actor)?;
        let category = self.category(slug).await?;
        self.taxonomy.delete_category(category.id).await?;
        info!(category = %slug, "category deleted");
        Ok(())
    }

    pub async fn create_tag(&self, actor: &Actor, input: NewTag) -> Result<Tag> {
        ensure_moderator(actor)?;
        input.validate()?;
        let (name, slug) = name_and_slug(&input.name, input.slug)?;
        if self.taxonomy.get_tag(&slug).await?.is_some() {
            return Err(DomainError::Conflict(format!("tag '{slug}' already exists")));
        }

        let tag = self
            .taxonomy
            .create_tag(Tag { id: Uuid::now_v7(), name, slug, created_at: Utc::now() })
            .await?;
        info!(tag = %tag.slug, "tag created");
        Ok(tag)
    }

    pub async fn tags(&self) -> Result<Vec<Tag>> {
        self.taxonomy.list_tags().await
    }

    pub async fn tag(&self, slug: &str) -> Result<Tag> {
        self.taxonomy.get_tag(slug).await?.ok_or_else(|| DomainError::not_found("tag", slug))
    }

    pub async fn delete_tag(&self, actor: &Actor, slug: &str) -> Result<()> {
        ensure_moderator(actor)?;
        let tag = self.tag(slug).await?;
        self.taxonomy.delete_tag(tag.id).await?;
        info!(tag = %slug, "tag deleted");
        Ok(())
    }

    fn visible(&self) -> PostFilter {
        PostFilter {
            status_ids: Some(self.catalog.snapshot().published_ids()),
            ordering: PostOrdering::RecentlyPublished,
            ..Default::default()
        }
    }

    pub async fn posts_in_category(&self, slug: &str, limit: Option<i64>, offset: Option<i64>) -> Result<Vec<Post>> {
        let category = self.category(slug).await?;
        let mut filter = self.visible();
        filter.category_id = Some(category.id);
        filter.limit = limit.unwrap_or(filter.limit);
        filter.offset = offset.unwrap_or(0);
        self.posts.list_posts(filter.normalized()).await
    }

    pub async fn posts_with_tag(&self, slug: &str, limit: Option<i64>, offset: Option<i64>) -> Result<Vec<Post>> {
        let tag = self.tag(slug).await?;
        let mut filter = self.visible();
        filter.tag_ids = vec![tag.id];
        filter.limit = limit.unwrap_or(filter.limit);
        filter.offset = offset.unwrap_or(0);
        self.posts.list_posts(filter.normalized()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domains::{MockPostRepository, MockTaxonomyRepository, Role, StatusCatalog};

    fn service(taxonomy: MockTaxonomyRepository) -> TaxonomyService {
        TaxonomyService::new(
            Arc::new(taxonomy),
            Arc::new(MockPostRepository::new()),
            CatalogHandle::new(StatusCatalog::new(StatusCatalog::defaults())),
        )
    }

    #[tokio::test]
    async fn authors_cannot_create_categories() {
        let mut taxonomy = MockTaxonomyRepository::new();
        taxonomy.expect_create_category().never();
        let svc = service(taxonomy);

        let input = NewCategory { name: "Rust".into(), ..Default::default() };
        let err = svc.create_category(&Actor::new(Uuid::now_v7(), Role::Author), input).await.unwrap_err();
        assert!(matches!(err, DomainError::NotAuthorized(_)));
    }

    #[tokio::test]
    async fn tag_slug_is_derived_from_name() {
        let mut taxonomy = MockTaxonomyRepository::new();
        taxonomy.expect_get_tag().returning(|_| Ok(None));
        taxonomy.expect_create_tag().times(1).returning(|tag| Ok(tag));
        let svc = service(taxonomy);

        let tag = svc
            .create_tag(&Actor::new(Uuid::now_v7(), Role::Moderator), NewTag { name: "Async Rust".into(), slug: None })
            .await
            .unwrap();
        assert_eq!(tag.slug, "async-rust");
    }

    #[tokio::test]
    async fn missing_tag_is_not_found() {
        let mut taxonomy = MockTaxonomyRepository::new();
        taxonomy.expect_get_tag().returning(|_| Ok(None));
        let svc = service(taxonomy);

        let err = svc.posts_with_tag("ghost", None, None).await.unwrap_err();
        assert_eq!(err, DomainError::not_found("tag", "ghost"));
    }

    #[tokio::test]
    async fn long_category_description_is_rejected() {
        let mut taxonomy = MockTaxonomyRepository::new();
        taxonomy.expect_create_category().never();
        let svc = service(taxonomy);

        let input = NewCategory { name: "Rust".into(), description: Some("d".repeat(1_001)), ..Default::default() };
        let err = svc.create_category(&Actor::new(Uuid::now_v7(), Role::Moderator), input).await.unwrap_err();
        assert_eq!(err, DomainError::Validation("description must be at most 1000 characters".into()));
    }
}
