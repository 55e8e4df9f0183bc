//! # Moderation Service
//!
//! Comment creation, moderation and reader reports. Comments start
//! unapproved and only approved subtrees on visible posts are ever handed to
//! public listings. Every moderation decision is stored together with its
//! audit row.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use domains::{
    role_on_post, Actor, Comment, CommentEdit, CommentNode, CommentReport, CommentRepository,
    DomainError, ModerationAction, ModerationKind, NewComment, NewReport, Post, PostRepository,
    ReportStatus, Result,
};
use tracing::{debug, info};
use uuid::Uuid;
use validator::Validate;

use crate::catalog::CatalogHandle;
use crate::utils::{optional_text, required_text};

pub struct ModerationService {
    posts: Arc<dyn PostRepository>,
    comments: Arc<dyn CommentRepository>,
    catalog: CatalogHandle,
}

fn audit(comment_id: Uuid, actor: &Actor, action: ModerationKind, reason: Option<String>) -> ModerationAction {
    ModerationAction {
        id: Uuid::now_v7(),
        comment_id,
        moderator_id: actor.id,
        action,
        reason: optional_text(reason).unwrap_or_default(),
        created_at: Utc::now(),
    }
}

impl ModerationService {
    pub fn new(posts: Arc<dyn PostRepository>, comments: Arc<dyn CommentRepository>, catalog: CatalogHandle) -> Self {
        Self { posts, comments, catalog }
    }

    async fn visible_post(&self, post_id: Uuid) -> Result<Post> {
        match self.posts.get_post(post_id).await? {
            Some(post) if self.catalog.snapshot().is_published(post.status_id) => Ok(post),
            _ => Err(DomainError::not_found("post", post_id)),
        }
    }

    async fn comment(&self, id: Uuid) -> Result<Comment> {
        self.comments.get_comment(id).await?.ok_or_else(|| DomainError::not_found("comment", id))
    }

    /// Moderators, and the author of the post the comment sits on.
    async fn ensure_can_moderate(&self, comment: &Comment, actor: &Actor) -> Result<()> {
        let post = self
            .posts
            .get_post(comment.post_id)
            .await?
            .ok_or_else(|| DomainError::not_found("post", comment.post_id))?;
        role_on_post(actor, post.author_id)
            .map(|_| ())
            .map_err(|_| DomainError::NotAuthorized("only moderators or the post author may moderate comments".into()))
    }

    fn ensure_moderator(actor: &Actor) -> Result<()> {
        if actor.is_moderator() {
            Ok(())
        } else {
            Err(DomainError::NotAuthorized("moderator privilege required".into()))
        }
    }

    /// Adds an unapproved comment to a publicly visible post.
    pub async fn add_comment(&self, post_id: Uuid, actor: &Actor, input: NewComment) -> Result<Comment> {
        input.validate()?;
        let post = self.visible_post(post_id).await?;
        let content = required_text("content", &input.content)?;

        if let Some(parent_id) = input.parent_id {
            let parent = self.comment(parent_id).await?;
            if parent.post_id != post.id {
                return Err(DomainError::Validation("parent comment must belong to the same post".into()));
            }
        }

        let now = Utc::now();
        let comment = self
            .comments
            .create_comment(Comment {
                id: Uuid::now_v7(),
                post_id: post.id,
                author_id: actor.id,
                content,
                parent_id: input.parent_id,
                is_approved: false,
                created_at: now,
                updated_at: now,
            })
            .await?;

        debug!(comment_id = %comment.id, post_id = %post.id, "comment queued for moderation");
        Ok(comment)
    }

    /// Only the comment's author may rewrite it.
    pub async fn edit_comment(&self, id: Uuid, actor: &Actor, edit: CommentEdit) -> Result<Comment> {
        edit.validate()?;
        let comment = self.comment(id).await?;
        if comment.author_id != actor.id {
            return Err(DomainError::NotAuthorized("you can only edit your own comments".into()));
        }
        let content = required_text("content", &edit.content)?;
        self.comments.update_content(id, content).await
    }

    /// The author withdraws their comment, replies included. No audit row.
    pub async fn delete_comment(&self, id: Uuid, actor: &Actor) -> Result<u64> {
        let comment = self.comment(id).await?;
        if comment.author_id != actor.id {
            return Err(DomainError::NotAuthorized("you can only delete your own comments".into()));
        }
        let removed = self.comments.delete_comment_tree(id).await?;
        info!(comment_id = %id, author = %actor.id, removed, "comment deleted by author");
        Ok(removed)
    }

    /// Marks a comment approved. Approving twice is a no-op and writes no audit row.
    pub async fn approve(&self, id: Uuid, actor: &Actor, reason: Option<String>) -> Result<Comment> {
        let comment = self.comment(id).await?;
        self.ensure_can_moderate(&comment, actor).await?;

        if comment.is_approved {
            return Ok(comment);
        }

        let approved = self
            .comments
            .set_approval_with_audit(audit(id, actor, ModerationKind::Approved, reason), true)
            .await?;
        info!(comment_id = %id, moderator = %actor.id, "comment approved");
        Ok(approved)
    }

    /// Takes a comment back out of public view without deleting it.
    pub async fn flag(&self, id: Uuid, actor: &Actor, reason: Option<String>) -> Result<Comment> {
        let comment = self.comment(id).await?;
        self.ensure_can_moderate(&comment, actor).await?;

        let flagged = self
            .comments
            .set_approval_with_audit(audit(id, actor, ModerationKind::Flagged, reason), false)
            .await?;
        info!(comment_id = %id, moderator = %actor.id, "comment flagged");
        Ok(flagged)
    }

    /// Deletes the comment together with every reply below it.
    pub async fn reject(&self, id: Uuid, actor: &Actor, reason: Option<String>) -> Result<u64> {
        self.remove(id, actor, ModerationKind::Rejected, reason).await
    }

    /// Like `reject`, recorded as spam.
    pub async fn mark_spam(&self, id: Uuid, actor: &Actor, reason: Option<String>) -> Result<u64> {
        self.remove(id, actor, ModerationKind::Spam, reason).await
    }

    async fn remove(&self, id: Uuid, actor: &Actor, kind: ModerationKind, reason: Option<String>) -> Result<u64> {
        let comment = self.comment(id).await?;
        self.ensure_can_moderate(&comment, actor).await?;

        let removed = self.comments.remove_with_audit(audit(id, actor, kind, reason)).await?;
        info!(comment_id = %id, moderator = %actor.id, action = kind.as_str(), removed, "comment removed");
        Ok(removed)
    }

    pub async fn pending(&self, actor: &Actor) -> Result<Vec<Comment>> {
        Self::ensure_moderator(actor)?;
        self.comments.pending_comments().await
    }

    pub async fn history(&self, id: Uuid, actor: &Actor) -> Result<Vec<ModerationAction>> {
        Self::ensure_moderator(actor)?;
        self.comments.moderation_history(id).await
    }

    /// Everything `author_id` wrote, approved or not.
    pub async fn comments_by(&self, author_id: Uuid) -> Result<Vec<Comment>> {
        self.comments.comments_by_author(author_id).await
    }

    /// Approved direct replies of an approved comment on a visible post.
    pub async fn replies(&self, id: Uuid) -> Result<Vec<Comment>> {
        let parent = self.comment(id).await?;
        self.visible_post(parent.post_id).await?;
        if !parent.is_approved {
            return Ok(Vec::new());
        }
        let replies = self.comments.replies_to(id).await?;
        Ok(replies.into_iter().filter(|c| c.is_approved).collect())
    }

    /// The public comment tree of a visible post.
    pub async fn public_thread(&self, post_id: Uuid) -> Result<Vec<CommentNode>> {
        let post = self.visible_post(post_id).await?;
        let comments = self.comments.comments_for_post(post.id).await?;
        Ok(approved_tree(comments))
    }

    /// Files a report against a comment the reader can see.
    pub async fn report(&self, comment_id: Uuid, actor: &Actor, input: NewReport) -> Result<CommentReport> {
        input.validate()?;
        let comment = self.comment(comment_id).await?;
        self.visible_post(comment.post_id).await?;
        if !comment.is_approved {
            return Err(DomainError::not_found("comment", comment_id));
        }

        let report = self
            .comments
            .create_report(CommentReport {
                id: Uuid::now_v7(),
                comment_id,
                reporter_id: actor.id,
                reason: input.reason,
                description: optional_text(input.description).unwrap_or_default(),
                status: ReportStatus::Pending,
                resolved_by: None,
                resolved_at: None,
                created_at: Utc::now(),
            })
            .await?;
        info!(report_id = %report.id, comment_id = %comment_id, reason = report.reason.as_str(), "comment reported");
        Ok(report)
    }

    pub async fn reports(&self, actor: &Actor, status: Option<ReportStatus>) -> Result<Vec<CommentReport>> {
        Self::ensure_moderator(actor)?;
        self.comments.list_reports(status).await
    }

    /// Moves a report out of `pending`, stamping who handled it and when.
    pub async fn review_report(&self, id: Uuid, actor: &Actor, status: ReportStatus) -> Result<CommentReport> {
        Self::ensure_moderator(actor)?;
        if status == ReportStatus::Pending {
            return Err(DomainError::Validation("a review must move the report out of 'pending'".into()));
        }
        let mut report = self.comments.get_report(id).await?.ok_or_else(|| DomainError::not_found("report", id))?;
        report.status = status;
        report.resolved_by = Some(actor.id);
        report.resolved_at = Some(Utc::now());

        let report = self.comments.update_report(report).await?;
        info!(report_id = %id, moderator = %actor.id, status = status.as_str(), "report reviewed");
        Ok(report)
    }
}

/// Builds the nested tree of approved comments, oldest first at every level.
///
/// A node is emitted only if it and every ancestor are approved.
pub fn approved_tree(comments: Vec<Comment>) -> Vec<CommentNode> {
    let mut children: HashMap<Option<Uuid>, Vec<Comment>> = HashMap::new();
    for comment in comments.into_iter().filter(|c| c.is_approved) {
        children.entry(comment.parent_id).or_default().push(comment);
    }
    for siblings in children.values_mut() {
        siblings.sort_by_key(|c| (c.created_at, c.id));
    }

    fn build(parent: Option<Uuid>, children: &mut HashMap<Option<Uuid>, Vec<Comment>>) -> Vec<CommentNode> {
        let Some(level) = children.remove(&parent) else {
            return Vec::new();
        };
        level
            .into_iter()
            .map(|comment| {
                let replies = build(Some(comment.id), children);
                CommentNode { comment, replies }
            })
            .collect()
    }

    build(None, &mut children)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use domains::{MockCommentRepository, MockPostRepository, Role, StatusCatalog};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn comment(parent: Option<&Comment>, approved: bool, offset: i64) -> Comment {
        let at = Utc::now() + Duration::seconds(offset);
        Comment {
            id: Uuid::now_v7(),
            post_id: Uuid::nil(),
            author_id: Uuid::nil(),
            content: "hi".into(),
            parent_id: parent.map(|p| p.id),
            is_approved: approved,
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn unapproved_parent_hides_whole_subtree() {
        let root = comment(None, true, 0);
        let hidden = comment(Some(&root), false, 1);
        let under_hidden = comment(Some(&hidden), true, 2);
        let visible = comment(Some(&root), true, 3);

        let tree = approved_tree(vec![under_hidden, visible.clone(), hidden, root.clone()]);
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].comment.id, root.id);
        assert_eq!(tree[0].replies.len(), 1);
        assert_eq!(tree[0].replies[0].comment.id, visible.id);
    }

    #[test]
    fn siblings_are_oldest_first() {
        let late = comment(None, true, 10);
        let early = comment(None, true, -10);
        let tree = approved_tree(vec![late.clone(), early.clone()]);
        let ids: Vec<_> = tree.iter().map(|n| n.comment.id).collect();
        assert_eq!(ids, vec![early.id, late.id]);
    }

    fn post_by(author_id: Uuid) -> Post {
        let now = Utc::now();
        Post {
            id: Uuid::nil(),
            title: "t".into(),
            slug: "t".into(),
            author_id,
            content: String::new(),
            excerpt: String::new(),
            category_id: None,
            tags: vec![],
            status_id: Uuid::now_v7(),
            featured_image: None,
            meta_description: None,
            created_at: now,
            updated_at: now,
            published_at: None,
        }
    }

    fn service(posts: MockPostRepository, comments: MockCommentRepository) -> ModerationService {
        ModerationService::new(
            Arc::new(posts),
            Arc::new(comments),
            CatalogHandle::new(StatusCatalog::new(StatusCatalog::defaults())),
        )
    }

    #[tokio::test]
    async fn failed_approval_leaves_the_comment_retryable() {
        let moderator = Actor::new(Uuid::now_v7(), Role::Moderator);
        let pending = comment(None, false, 0);
        let id = pending.id;

        let mut posts = MockPostRepository::new();
        posts.expect_get_post().returning(|_| Ok(Some(post_by(Uuid::now_v7()))));
        let mut comments = MockCommentRepository::new();
        comments.expect_get_comment().returning(move |_| Ok(Some(pending.clone())));
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        comments
            .expect_set_approval_with_audit()
            .withf(move |action, approved| action.comment_id == id && action.action == ModerationKind::Approved && *approved)
            .returning(move |action, _| {
                if seen.fetch_add(1, Ordering::SeqCst) == 0 {
                    return Err(DomainError::Internal("connection reset".into()));
                }
                let mut approved = comment(None, true, 0);
                approved.id = action.comment_id;
                Ok(approved)
            });

        let svc = service(posts, comments);
        let err = svc.approve(id, &moderator, None).await.unwrap_err();
        assert!(matches!(err, DomainError::Internal(_)));

        let approved = svc.approve(id, &moderator, Some("fine".into())).await.unwrap();
        assert!(approved.is_approved);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn rejection_is_one_storage_call() {
        let moderator = Actor::new(Uuid::now_v7(), Role::Moderator);
        let target = comment(None, true, 0);
        let id = target.id;

        let mut posts = MockPostRepository::new();
        posts.expect_get_post().returning(|_| Ok(Some(post_by(Uuid::now_v7()))));
        let mut comments = MockCommentRepository::new();
        comments.expect_get_comment().returning(move |_| Ok(Some(target.clone())));
        comments.expect_delete_comment_tree().never();
        comments
            .expect_remove_with_audit()
            .withf(move |action| action.comment_id == id && action.action == ModerationKind::Rejected && action.reason == "off topic")
            .times(1)
            .returning(|_| Ok(3));

        let svc = service(posts, comments);
        assert_eq!(svc.reject(id, &moderator, Some(" off topic ".into())).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn only_the_author_deletes_without_moderating() {
        let author = Uuid::now_v7();
        let mut own = comment(None, true, 0);
        own.author_id = author;
        let id = own.id;

        let mut comments = MockCommentRepository::new();
        comments.expect_get_comment().returning(move |_| Ok(Some(own.clone())));
        comments.expect_delete_comment_tree().times(1).returning(|_| Ok(1));
        let svc = service(MockPostRepository::new(), comments);

        let stranger = Actor::new(Uuid::now_v7(), Role::Moderator);
        assert!(matches!(svc.delete_comment(id, &stranger).await, Err(DomainError::NotAuthorized(_))));
        assert_eq!(svc.delete_comment(id, &Actor::new(author, Role::Author)).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn reviews_must_leave_pending() {
        let mut comments = MockCommentRepository::new();
        comments.expect_get_report().never();
        let svc = service(MockPostRepository::new(), comments);

        let moderator = Actor::new(Uuid::now_v7(), Role::Moderator);
        let err = svc.review_report(Uuid::now_v7(), &moderator, ReportStatus::Pending).await.unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        let author = Actor::new(Uuid::now_v7(), Role::Author);
        let err = svc.review_report(Uuid::now_v7(), &author, ReportStatus::Resolved).await.unwrap_err();
        assert!(matches!(err, DomainError::NotAuthorized(_)));
    }
}
