//! # Post Service
//!
//! Authoring and reading of posts. Status changes go through
//! `PublicationService`; this service never writes a status except the
//! initial `draft`.

use std::sync::Arc;

use chrono::Utc;
use domains::status::{DRAFT, FEATURED, TRASH};
use domains::{
    role_on_post, Actor, DomainError, NewPost, Post, PostFilter, PostOrdering, PostRepository,
    PostUpdate, Result, StatusCatalog, Tag, TaxonomyRepository, DEFAULT_PAGE_SIZE,
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::catalog::CatalogHandle;
use crate::utils::{derive_excerpt, optional_text, required_text, slugify, validate_slug};

/// Slugs that collide with fixed routes under `/posts`.
pub const RESERVED_SLUGS: &[&str] = &["search", "mine", "drafts", "featured", "popular"];

fn check_slug(slug: &str) -> Result<()> {
    validate_slug(slug)?;
    if RESERVED_SLUGS.contains(&slug) {
        return Err(DomainError::Validation(format!("'{slug}' is reserved")));
    }
    Ok(())
}

/// Slug from the title, or `post-<id>` when nothing survives transliteration.
fn derived_slug(title: &str, id: Uuid) -> String {
    let slug = slugify(title);
    if slug.is_empty() {
        format!("post-{}", id.simple())
    } else {
        slug
    }
}

/// Listing parameters as they arrive from callers.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostQuery {
    pub category: Option<String>,
    /// Comma-separated tag slugs; a post matches if it carries any of them
    pub tags: Option<String>,
    pub author: Option<Uuid>,
    pub status: Option<String>,
    pub q: Option<String>,
    #[serde(default)]
    pub ordering: PostOrdering,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

pub struct PostService {
    posts: Arc<dyn PostRepository>,
    taxonomy: Arc<dyn TaxonomyRepository>,
    catalog: CatalogHandle,
}

impl PostService {
    pub fn new(posts: Arc<dyn PostRepository>, taxonomy: Arc<dyn TaxonomyRepository>, catalog: CatalogHandle) -> Self {
        Self { posts, taxonomy, catalog }
    }

    async fn resolve_category(&self, slug: &str) -> Result<Uuid> {
        self.taxonomy
            .get_category(slug)
            .await?
            .map(|c| c.id)
            .ok_or_else(|| DomainError::Validation(format!("unknown category '{slug}'")))
    }

    async fn resolve_tags(&self, slugs: &[String]) -> Result<Vec<Tag>> {
        let mut tags: Vec<Tag> = Vec::with_capacity(slugs.len());
        for slug in slugs {
            let tag = self
                .taxonomy
                .get_tag(slug)
                .await?
                .ok_or_else(|| DomainError::Validation(format!("unknown tag '{slug}'")))?;
            if !tags.iter().any(|t| t.id == tag.id) {
                tags.push(tag);
            }
        }
        Ok(tags)
    }

    async fn ensure_slug_free(&self, slug: &str) -> Result<()> {
        if self.posts.get_post_by_slug(slug).await?.is_some() {
            return Err(DomainError::Conflict(format!("a post with slug '{slug}' already exists")));
        }
        Ok(())
    }

    fn can_see(catalog: &StatusCatalog, post: &Post, viewer: Option<&Actor>) -> bool {
        catalog.is_published(post.status_id)
            || viewer.is_some_and(|actor| role_on_post(actor, post.author_id).is_ok())
    }

    pub async fn create(&self, actor: &Actor, input: NewPost) -> Result<Post> {
        input.validate()?;
        let catalog = self.catalog.snapshot();
        let draft = catalog.assignable(DRAFT)?;

        let id = Uuid::now_v7();
        let title = required_text("title", &input.title)?;
        let slug = match input.slug {
            Some(slug) => slug.trim().to_string(),
            None => derived_slug(&title, id),
        };
        check_slug(&slug)?;
        self.ensure_slug_free(&slug).await?;

        let content = input.content.trim().to_string();
        let excerpt = match optional_text(input.excerpt) {
            Some(excerpt) => excerpt,
            None => derive_excerpt(&content),
        };
        let category_id = match input.category.as_deref() {
            Some(slug) => Some(self.resolve_category(slug).await?),
            None => None,
        };
        let tags = self.resolve_tags(&input.tags).await?;

        let now = Utc::now();
        let post = self
            .posts
            .create_post(Post {
                id,
                title,
                slug,
                author_id: actor.id,
                content,
                excerpt,
                category_id,
                tags,
                status_id: draft.id,
                featured_image: optional_text(input.featured_image),
                meta_description: optional_text(input.meta_description),
                created_at: now,
                updated_at: now,
                published_at: None,
            })
            .await?;

        info!(post_id = %post.id, slug = %post.slug, author = %actor.id, "post created");
        Ok(post)
    }

    /// Hidden posts are reported as missing to anyone but their author and moderators.
    pub async fn get_by_slug(&self, slug: &str, viewer: Option<&Actor>) -> Result<Post> {
        let catalog = self.catalog.snapshot();
        match self.posts.get_post_by_slug(slug).await? {
            Some(post) if Self::can_see(&catalog, &post, viewer) => Ok(post),
            _ => Err(DomainError::not_found("post", slug)),
        }
    }

    pub async fn update(&self, slug: &str, actor: &Actor, changes: PostUpdate) -> Result<Post> {
        changes.validate()?;
        let mut post = self
            .posts
            .get_post_by_slug(slug)
            .await?
            .ok_or_else(|| DomainError::not_found("post", slug))?;
        role_on_post(actor, post.author_id)?;

        if let Some(title) = changes.title {
            post.title = required_text("title", &title)?;
        }
        if let Some(new_slug) = changes.slug.map(|s| s.trim().to_string()) {
            if new_slug != post.slug {
                if post.published_at.is_some() {
                    return Err(DomainError::Validation("slug cannot change once the post has been published".into()));
                }
                check_slug(&new_slug)?;
                self.ensure_slug_free(&new_slug).await?;
                post.slug = new_slug;
            }
        }
        if let Some(content) = changes.content {
            post.content = content.trim().to_string();
        }
        if let Some(excerpt) = changes.excerpt {
            post.excerpt = optional_text(Some(excerpt)).unwrap_or_else(|| derive_excerpt(&post.content));
        }
        if let Some(category) = changes.category {
            post.category_id = match category {
                Some(slug) => Some(self.resolve_category(&slug).await?),
                None => None,
            };
        }
        if let Some(tags) = changes.tags {
            post.tags = self.resolve_tags(&tags).await?;
        }
        if let Some(image) = changes.featured_image {
            post.featured_image = optional_text(image);
        }
        if let Some(meta) = changes.meta_description {
            post.meta_description = optional_text(meta);
        }
        post.updated_at = Utc::now();

        self.posts.update_post(post).await
    }

    /// Physical removal, cascading to comments. Soft deletion is the `trash` status.
    pub async fn delete(&self, slug: &str, actor: &Actor) -> Result<()> {
        let post = self
            .posts
            .get_post_by_slug(slug)
            .await?
            .ok_or_else(|| DomainError::not_found("post", slug))?;
        role_on_post(actor, post.author_id)?;

        self.posts.delete_post(post.id).await?;
        info!(post_id = %post.id, actor = %actor.id, "post deleted");
        Ok(())
    }

    /// Public listing. Non-publishing statuses may only be listed by moderators.
    pub async fn list(&self, query: PostQuery, viewer: Option<&Actor>) -> Result<Vec<Post>> {
        let catalog = self.catalog.snapshot();
        let status_ids = match query.status.as_deref() {
            None => catalog.published_ids(),
            Some(slug) => {
                let status = catalog.get(slug).ok_or_else(|| DomainError::UnknownStatus(slug.to_string()))?;
                if !status.is_published && !viewer.is_some_and(Actor::is_moderator) {
                    return Err(DomainError::NotAuthorized(format!("listing '{slug}' posts requires moderator privilege")));
                }
                vec![status.id]
            }
        };

        let category_id = match query.category.as_deref() {
            Some(slug) => Some(self.resolve_category(slug).await?),
            None => None,
        };
        let tag_slugs: Vec<String> = query
            .tags
            .as_deref()
            .map(|raw| raw.split(',').map(str::trim).filter(|s| !s.is_empty()).map(String::from).collect())
            .unwrap_or_default();
        let tag_ids = self.resolve_tags(&tag_slugs).await?.into_iter().map(|t| t.id).collect();

        let filter = PostFilter {
            author_id: query.author,
            category_id,
            tag_ids,
            status_ids: Some(status_ids),
            search: query.q.map(|q| q.trim().to_string()).filter(|q| !q.is_empty()),
            ordering: query.ordering,
            limit: query.limit.unwrap_or(DEFAULT_PAGE_SIZE),
            offset: query.offset.unwrap_or(0),
        };
        self.posts.list_posts(filter.normalized()).await
    }

    /// Full-text search over visible posts.
    pub async fn search(&self, q: &str, limit: Option<i64>, offset: Option<i64>) -> Result<Vec<Post>> {
        let q = q.trim();
        if q.is_empty() {
            return Err(DomainError::Validation("search query must not be empty".into()));
        }
        let filter = PostFilter {
            status_ids: Some(self.catalog.snapshot().published_ids()),
            search: Some(q.to_string()),
            limit: limit.unwrap_or(DEFAULT_PAGE_SIZE),
            offset: offset.unwrap_or(0),
            ..Default::default()
        };
        self.posts.list_posts(filter.normalized()).await
    }

    pub async fn featured(&self, limit: i64) -> Result<Vec<Post>> {
        let filter = PostFilter {
            status_ids: Some(self.catalog.snapshot().ids_for(&[FEATURED])),
            ordering: PostOrdering::RecentlyPublished,
            limit,
            ..Default::default()
        };
        self.posts.list_posts(filter.normalized()).await
    }

    /// Visible posts with the most approved comments.
    pub async fn popular(&self, limit: i64) -> Result<Vec<Post>> {
        let filter = PostFilter {
            status_ids: Some(self.catalog.snapshot().published_ids()),
            ordering: PostOrdering::MostCommented,
            limit,
            ..Default::default()
        };
        self.posts.list_posts(filter.normalized()).await
    }

    /// Every post the actor wrote, except those in the trash. Paged like any listing.
    pub async fn my_posts(&self, actor: &Actor, limit: Option<i64>, offset: Option<i64>) -> Result<Vec<Post>> {
        let catalog = self.catalog.snapshot();
        let status_ids = catalog.ordered().into_iter().filter(|s| s.slug != TRASH).map(|s| s.id).collect();
        let filter = PostFilter {
            author_id: Some(actor.id),
            status_ids: Some(status_ids),
            limit: limit.unwrap_or(DEFAULT_PAGE_SIZE),
            offset: offset.unwrap_or(0),
            ..Default::default()
        };
        self.posts.list_posts(filter.normalized()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domains::{MockPostRepository, MockTaxonomyRepository, Role, MAX_PAGE_SIZE};
    use mockall::predicate::eq;

    fn service(posts: MockPostRepository, taxonomy: MockTaxonomyRepository) -> PostService {
        PostService::new(
            Arc::new(posts),
            Arc::new(taxonomy),
            CatalogHandle::new(StatusCatalog::new(StatusCatalog::defaults())),
        )
    }

    #[tokio::test]
    async fn duplicate_slug_is_a_conflict() {
        let mut posts = MockPostRepository::new();
        posts.expect_get_post_by_slug().with(eq("taken")).returning(|_| {
            Ok(Some(Post {
                id: Uuid::now_v7(),
                title: "t".into(),
                slug: "taken".into(),
                author_id: Uuid::now_v7(),
                content: String::new(),
                excerpt: String::new(),
                category_id: None,
                tags: vec![],
                status_id: Uuid::now_v7(),
                featured_image: None,
                meta_description: None,
                created_at: Utc::now(),
                updated_at: Utc::now(),
                published_at: None,
            }))
        });
        posts.expect_create_post().never();

        let svc = service(posts, MockTaxonomyRepository::new());
        let input = NewPost { title: "Taken".into(), slug: Some("taken".into()), ..Default::default() };
        let err = svc.create(&Actor::new(Uuid::now_v7(), Role::Author), input).await.unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[tokio::test]
    async fn unknown_tag_is_rejected_before_insert() {
        let mut posts = MockPostRepository::new();
        posts.expect_get_post_by_slug().returning(|_| Ok(None));
        posts.expect_create_post().never();
        let mut taxonomy = MockTaxonomyRepository::new();
        taxonomy.expect_get_tag().returning(|_| Ok(None));

        let svc = service(posts, taxonomy);
        let input = NewPost { title: "Tagged".into(), tags: vec!["nope".into()], ..Default::default() };
        let err = svc.create(&Actor::new(Uuid::now_v7(), Role::Author), input).await.unwrap_err();
        assert_eq!(err, DomainError::Validation("unknown tag 'nope'".into()));
    }

    #[tokio::test]
    async fn route_names_are_not_valid_slugs() {
        let svc = service(MockPostRepository::new(), MockTaxonomyRepository::new());
        let input = NewPost { title: "Featured".into(), ..Default::default() };
        let err = svc.create(&Actor::new(Uuid::now_v7(), Role::Author), input).await.unwrap_err();
        assert_eq!(err, DomainError::Validation("'featured' is reserved".into()));
    }

    #[tokio::test]
    async fn readers_cannot_list_drafts() {
        let svc = service(MockPostRepository::new(), MockTaxonomyRepository::new());
        let query = PostQuery { status: Some(DRAFT.into()), ..Default::default() };
        let err = svc.list(query, None).await.unwrap_err();
        assert!(matches!(err, DomainError::NotAuthorized(_)));
    }

    #[tokio::test]
    async fn blank_search_is_a_validation_error() {
        let svc = service(MockPostRepository::new(), MockTaxonomyRepository::new());
        assert!(matches!(svc.search("   ", None, None).await, Err(DomainError::Validation(_))));
    }

    #[tokio::test]
    async fn untransliterable_title_gets_an_id_slug() {
        let mut posts = MockPostRepository::new();
        posts.expect_get_post_by_slug().returning(|_| Ok(None));
        posts.expect_create_post().times(1).returning(|post| Ok(post));

        let svc = service(posts, MockTaxonomyRepository::new());
        let input = NewPost { title: "!!!".into(), content: "body".into(), ..Default::default() };
        let post = svc.create(&Actor::new(Uuid::now_v7(), Role::Author), input).await.unwrap();
        assert_eq!(post.slug, format!("post-{}", post.id.simple()));
        assert!(validate_slug(&post.slug).is_ok());
    }

    #[tokio::test]
    async fn cyrillic_title_is_transliterated() {
        let mut posts = MockPostRepository::new();
        posts.expect_get_post_by_slug().with(eq("privet-mir")).returning(|_| Ok(None));
        posts.expect_create_post().times(1).returning(|post| Ok(post));

        let svc = service(posts, MockTaxonomyRepository::new());
        let input = NewPost { title: "Привет мир".into(), content: "body".into(), ..Default::default() };
        let post = svc.create(&Actor::new(Uuid::now_v7(), Role::Author), input).await.unwrap();
        assert_eq!(post.slug, "privet-mir");
    }

    #[tokio::test]
    async fn overlong_meta_description_is_rejected_before_storage() {
        let mut posts = MockPostRepository::new();
        posts.expect_get_post_by_slug().never();
        posts.expect_create_post().never();

        let svc = service(posts, MockTaxonomyRepository::new());
        let input = NewPost { title: "Fine".into(), meta_description: Some("m".repeat(161)), ..Default::default() };
        let err = svc.create(&Actor::new(Uuid::now_v7(), Role::Author), input).await.unwrap_err();
        assert_eq!(err, DomainError::Validation("meta_description must be at most 160 characters".into()));
    }

    #[tokio::test]
    async fn own_posts_are_paged() {
        let mut posts = MockPostRepository::new();
        posts
            .expect_list_posts()
            .withf(|filter| filter.limit == MAX_PAGE_SIZE && filter.offset == 40)
            .times(1)
            .returning(|_| Ok(vec![]));

        let svc = service(posts, MockTaxonomyRepository::new());
        let actor = Actor::new(Uuid::now_v7(), Role::Author);
        assert!(svc.my_posts(&actor, Some(5_000), Some(40)).await.unwrap().is_empty());
    }
}
