//! # Ports
//!
//! Any adapter must implement these traits to be wired into the binary.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::errors::Result;
use crate::models::{
    Category, Comment, CommentReport, ContentStatus, ModerationAction, Post, PostFilter,
    ReportStatus, Role, Tag, User,
};

#[cfg(any(test, feature = "testing"))]
use mockall::automock;

/// Persistence of the status reference table.
#[cfg_attr(any(test, feature = "testing"), automock)]
#[async_trait]
pub trait StatusRepository: Send + Sync {
    async fn list_statuses(&self) -> Result<Vec<ContentStatus>>;
    /// Inserts or updates by slug. The slug itself is never rewritten.
    async fn upsert_status(&self, status: ContentStatus) -> Result<ContentStatus>;
}

/// Persistence of posts and their tag associations.
#[cfg_attr(any(test, feature = "testing"), automock)]
#[async_trait]
pub trait PostRepository: Send + Sync {
    async fn create_post(&self, post: Post) -> Result<Post>;
    async fn get_post(&self, id: Uuid) -> Result<Option<Post>>;
    async fn get_post_by_slug(&self, slug: &str) -> Result<Option<Post>>;
    /// Rewrites editable fields. Status, author and `published_at` are ignored.
    async fn update_post(&self, post: Post) -> Result<Post>;
    async fn list_posts(&self, filter: PostFilter) -> Result<Vec<Post>>;

    /// Atomically moves a post from `expected` to `target`.
    ///
    /// `published_at` is set to `publish_at` only when it is currently empty.
    /// Returns `None` when the stored status is no longer `expected`.
    async fn transition_status(
        &self,
        post_id: Uuid,
        expected: Uuid,
        target: Uuid,
        publish_at: Option<DateTime<Utc>>,
    ) -> Result<Option<Post>>;

    /// Hard delete; cascades to the post's whole comment tree.
    async fn delete_post(&self, id: Uuid) -> Result<bool>;
}

/// Persistence of comments, moderation history and reader reports.
///
/// Every moderation decision is written together with its audit row: either
/// both land or neither does.
#[cfg_attr(any(test, feature = "testing"), automock)]
#[async_trait]
pub trait CommentRepository: Send + Sync {
    async fn create_comment(&self, comment: Comment) -> Result<Comment>;
    async fn get_comment(&self, id: Uuid) -> Result<Option<Comment>>;
    /// All comments on a post, oldest first, approved or not.
    async fn comments_for_post(&self, post_id: Uuid) -> Result<Vec<Comment>>;
    async fn replies_to(&self, parent_id: Uuid) -> Result<Vec<Comment>>;
    async fn comments_by_author(&self, author_id: Uuid) -> Result<Vec<Comment>>;
    async fn pending_comments(&self) -> Result<Vec<Comment>>;
    async fn update_content(&self, id: Uuid, content: String) -> Result<Comment>;
    /// Removes the comment and every reply below it. Returns how many rows went.
    async fn delete_comment_tree(&self, id: Uuid) -> Result<u64>;

    /// Sets `is_approved` on `action.comment_id` and appends `action`, atomically.
    async fn set_approval_with_audit(&self, action: ModerationAction, approved: bool) -> Result<Comment>;
    /// Appends `action` and deletes the comment subtree, atomically.
    async fn remove_with_audit(&self, action: ModerationAction) -> Result<u64>;
    /// Oldest first. Survives the comment itself.
    async fn moderation_history(&self, comment_id: Uuid) -> Result<Vec<ModerationAction>>;

    /// `Conflict` when the reporter already reported this comment.
    async fn create_report(&self, report: CommentReport) -> Result<CommentReport>;
    async fn get_report(&self, id: Uuid) -> Result<Option<CommentReport>>;
    /// Newest first, optionally restricted to one status.
    async fn list_reports(&self, status: Option<ReportStatus>) -> Result<Vec<CommentReport>>;
    async fn update_report(&self, report: CommentReport) -> Result<CommentReport>;
}

/// Persistence of categories and tags.
#[cfg_attr(any(test, feature = "testing"), automock)]
#[async_trait]
pub trait TaxonomyRepository: Send + Sync {
    async fn create_category(&self, category: Category) -> Result<Category>;
    async fn get_category(&self, slug: &str) -> Result<Option<Category>>;
    async fn list_categories(&self) -> Result<Vec<Category>>;
    /// Deletes the category; its posts keep existing with no category.
    async fn delete_category(&self, id: Uuid) -> Result<bool>;

    async fn create_tag(&self, tag: Tag) -> Result<Tag>;
    async fn get_tag(&self, slug: &str) -> Result<Option<Tag>>;
    async fn list_tags(&self) -> Result<Vec<Tag>>;
    async fn delete_tag(&self, id: Uuid) -> Result<bool>;
}

/// Persistence of accounts.
#[cfg_attr(any(test, feature = "testing"), automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create_user(&self, user: User) -> Result<User>;
    async fn get_user(&self, id: Uuid) -> Result<Option<User>>;
    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>>;
    async fn set_role(&self, id: Uuid, role: Role) -> Result<User>;
}

/// Password hashing contract.
#[cfg_attr(any(test, feature = "testing"), automock)]
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, password: &str) -> Result<String>;
    fn verify(&self, password: &str, hash: &str) -> bool;
}

/// Claims carried by an access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenClaims {
    pub user_id: Uuid,
    pub role: Role,
    pub expires_at: DateTime<Utc>,
}

/// Access token issuing and verification.
#[cfg_attr(any(test, feature = "testing"), automock)]
pub trait TokenService: Send + Sync {
    fn issue(&self, user: &User) -> Result<String>;
    fn verify(&self, token: &str) -> Result<TokenClaims>;
}
