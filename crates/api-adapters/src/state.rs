//! Shared application state handed to every handler.

use std::sync::Arc;

use domains::{
    CommentRepository, PasswordHasher, PostRepository, StatusRepository, TaxonomyRepository,
    TokenService, TransitionTable, UserRepository,
};
use services::{
    AccountService, CatalogHandle, ModerationService, PostService, PublicationService,
    TaxonomyService,
};

use crate::metrics::Metrics;

#[derive(Clone)]
pub struct AppState {
    pub posts: Arc<PostService>,
    pub publication: Arc<PublicationService>,
    pub moderation: Arc<ModerationService>,
    pub taxonomy: Arc<TaxonomyService>,
    pub accounts: Arc<AccountService>,
    pub tokens: Arc<dyn TokenService>,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    /// Wires every service onto one store that implements all repository ports.
    pub fn wire<S>(
        store: Arc<S>,
        catalog: CatalogHandle,
        table: TransitionTable,
        hasher: Arc<dyn PasswordHasher>,
        tokens: Arc<dyn TokenService>,
    ) -> Self
    where
        S: StatusRepository + PostRepository + CommentRepository + TaxonomyRepository + UserRepository + 'static,
    {
        let posts: Arc<dyn PostRepository> = store.clone();
        let statuses: Arc<dyn StatusRepository> = store.clone();
        let comments: Arc<dyn CommentRepository> = store.clone();
        let taxonomy: Arc<dyn TaxonomyRepository> = store.clone();
        let users: Arc<dyn UserRepository> = store;

        Self {
            posts: Arc::new(PostService::new(posts.clone(), taxonomy.clone(), catalog.clone())),
            publication: Arc::new(PublicationService::new(posts.clone(), statuses, catalog.clone(), table)),
            moderation: Arc::new(ModerationService::new(posts.clone(), comments, catalog.clone())),
            taxonomy: Arc::new(TaxonomyService::new(taxonomy, posts, catalog)),
            accounts: Arc::new(AccountService::new(users, hasher, tokens.clone())),
            tokens,
            metrics: Arc::new(Metrics::new()),
        }
    }
}
