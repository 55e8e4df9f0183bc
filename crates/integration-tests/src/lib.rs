//! rusty-press/crates/integration-tests/src/lib.rs
//!
//! Shared fixtures: an in-memory store seeded with the standard statuses,
//! services wired onto it, and helpers for users, posts and HTTP calls.

use std::sync::Arc;

use auth_adapters::JwtTokenService;
use chrono::{Duration, Utc};
use domains::{
    Actor, NewPost, Post, Role, TokenService, TransitionTable, User, UserRepository,
};
use fake::faker::internet::en::SafeEmail;
use fake::faker::lorem::en::{Paragraph, Sentence};
use fake::Fake;
use services::{CatalogHandle, ModerationService, PostService, PublicationService, TaxonomyService};
use storage_adapters::MemoryStore;
use uuid::Uuid;

pub const TEST_SECRET: &[u8] = b"integration-test-secret";

pub struct World {
    pub store: Arc<MemoryStore>,
    pub catalog: CatalogHandle,
    pub posts: PostService,
    pub publication: PublicationService,
    pub moderation: ModerationService,
    pub taxonomy: TaxonomyService,
    pub tokens: Arc<JwtTokenService>,
}

impl World {
    pub async fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let catalog = CatalogHandle::new(services::bootstrap(store.as_ref()).await.expect("seed statuses"));

        Self {
            posts: PostService::new(store.clone(), store.clone(), catalog.clone()),
            publication: PublicationService::new(store.clone(), store.clone(), catalog.clone(), TransitionTable::standard()),
            moderation: ModerationService::new(store.clone(), store.clone(), catalog.clone()),
            taxonomy: TaxonomyService::new(store.clone(), store.clone(), catalog.clone()),
            tokens: Arc::new(JwtTokenService::new(TEST_SECRET, Duration::hours(1))),
            store,
            catalog,
        }
    }

    /// Inserts an account directly; its password hash is not usable for login.
    pub async fn user(&self, role: Role) -> User {
        let id = Uuid::now_v7();
        self.store
            .create_user(User {
                id,
                username: format!("user-{}", id.simple()),
                email: SafeEmail().fake(),
                password_hash: String::new(),
                role,
                created_at: Utc::now(),
            })
            .await
            .expect("create user")
    }

    pub async fn author(&self) -> Actor {
        let user = self.user(Role::Author).await;
        Actor::new(user.id, user.role)
    }

    pub async fn moderator(&self) -> Actor {
        let user = self.user(Role::Moderator).await;
        Actor::new(user.id, user.role)
    }

    pub fn token(&self, user: &User) -> String {
        self.tokens.issue(user).expect("issue token")
    }

    pub async fn draft(&self, author: &Actor) -> Post {
        let input = NewPost {
            title: Sentence(3..7).fake(),
            slug: Some(format!("post-{}", Uuid::now_v7().simple())),
            content: Paragraph(3..6).fake(),
            ..Default::default()
        };
        self.posts.create(author, input).await.expect("create draft")
    }

    pub async fn published(&self, author: &Actor) -> Post {
        let draft = self.draft(author).await;
        self.publication.publish_now(draft.id, author).await.expect("publish")
    }

    pub fn status_id(&self, slug: &str) -> Uuid {
        self.catalog.snapshot().get(slug).map(|s| s.id).expect("known status")
    }

    pub fn status_of(&self, post: &Post) -> String {
        self.catalog.snapshot().by_id(post.status_id).map(|s| s.slug.clone()).expect("known status")
    }
}

#[cfg(feature = "web-axum")]
pub mod http {
    use super::*;

    use api_adapters::AppState;
    use auth_adapters::Argon2PasswordHasher;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request, StatusCode};
    use axum::Router;
    use serde_json::Value;
    use tower::ServiceExt;

    pub fn app(world: &World) -> Router {
        let state = AppState::wire(
            world.store.clone(),
            world.catalog.clone(),
            TransitionTable::standard(),
            Arc::new(Argon2PasswordHasher::new()),
            world.tokens.clone(),
        );
        api_adapters::router(state)
    }

    /// Sends one request through the router and decodes the JSON body (`Null` if empty).
    pub async fn send(app: &Router, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(json) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => request.body(Body::empty()),
        }
        .expect("build request");

        let response = app.clone().oneshot(request).await.expect("router is infallible");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("read body");
        let json = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).expect("json body") };
        (status, json)
    }
}
