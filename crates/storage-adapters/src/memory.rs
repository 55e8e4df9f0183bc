//! # In-memory store
//!
//! A `DashMap`-backed implementation of every repository port. Used by the
//! test suites and by the binary when no database URL is configured.
//!
//! Single-row reads go straight to the maps. Anything that must observe or
//! change several rows at once (slug uniqueness, the status compare-and-set,
//! cascading deletes, moderation with its audit row) runs under `write_lock`.

use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use domains::{
    Category, Comment, CommentReport, CommentRepository, ContentStatus, DomainError,
    ModerationAction, Post, PostFilter, PostOrdering, PostRepository, ReportStatus, Result, Role,
    StatusRepository, Tag, TaxonomyRepository, User, UserRepository,
};
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

#[derive(Default)]
pub struct MemoryStore {
    statuses: DashMap<Uuid, ContentStatus>,
    posts: DashMap<Uuid, Post>,
    comments: DashMap<Uuid, Comment>,
    moderation: DashMap<Uuid, ModerationAction>,
    reports: DashMap<Uuid, CommentReport>,
    categories: DashMap<Uuid, Category>,
    tags: DashMap<Uuid, Tag>,
    users: DashMap<Uuid, User>,
    write_lock: Mutex<()>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn slug_taken(&self, slug: &str, except: Option<Uuid>) -> bool {
        self.posts.iter().any(|p| p.slug == slug && Some(p.id) != except)
    }

    fn approved_comment_counts(&self) -> HashMap<Uuid, usize> {
        let mut counts = HashMap::new();
        for comment in self.comments.iter().filter(|c| c.is_approved) {
            *counts.entry(comment.post_id).or_insert(0) += 1;
        }
        counts
    }

    /// Ids of `root` and every comment below it.
    fn subtree(&self, root: Uuid) -> Vec<Uuid> {
        let mut by_parent: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        for comment in self.comments.iter() {
            if let Some(parent) = comment.parent_id {
                by_parent.entry(parent).or_default().push(comment.id);
            }
        }

        let mut ids = vec![root];
        let mut cursor = 0;
        while cursor < ids.len() {
            if let Some(children) = by_parent.get(&ids[cursor]) {
                ids.extend(children);
            }
            cursor += 1;
        }
        ids
    }

    /// Deletes `root` and its replies along with their reports. Caller holds `write_lock`.
    fn remove_subtree(&self, root: Uuid) -> u64 {
        let mut removed = 0;
        let doomed: HashSet<Uuid> = self.subtree(root).into_iter().collect();
        for cid in &doomed {
            if self.comments.remove(cid).is_some() {
                removed += 1;
            }
        }
        self.reports.retain(|_, report| !doomed.contains(&report.comment_id));
        removed
    }

    fn sorted_comments(&self, keep: impl Fn(&Comment) -> bool) -> Vec<Comment> {
        let mut comments: Vec<Comment> = self.comments.iter().filter(|c| keep(c.value())).map(|c| c.clone()).collect();
        comments.sort_by_key(|c| (c.created_at, c.id));
        comments
    }
}

fn matches_search(post: &Post, needle: &str) -> bool {
    let needle = needle.to_lowercase();
    [&post.title, &post.excerpt, &post.content]
        .iter()
        .any(|field| field.to_lowercase().contains(&needle))
}

fn matches_filter(post: &Post, filter: &PostFilter) -> bool {
    filter.author_id.map_or(true, |id| post.author_id == id)
        && filter.category_id.map_or(true, |id| post.category_id == Some(id))
        && (filter.tag_ids.is_empty() || filter.tag_ids.iter().any(|id| post.has_tag(*id)))
        && filter.status_ids.as_ref().map_or(true, |ids| ids.contains(&post.status_id))
        && filter.search.as_deref().map_or(true, |q| matches_search(post, q))
}

// ── Statuses ─────────────────────────────────────────────────────────────────

#[async_trait]
impl StatusRepository for MemoryStore {
    async fn list_statuses(&self) -> Result<Vec<ContentStatus>> {
        let mut statuses: Vec<_> = self.statuses.iter().map(|s| s.clone()).collect();
        statuses.sort_by(|a, b| a.sort_order.cmp(&b.sort_order).then_with(|| a.name.cmp(&b.name)));
        Ok(statuses)
    }

    async fn upsert_status(&self, status: ContentStatus) -> Result<ContentStatus> {
        let _guard = self.write_lock.lock().await;
        let existing = self.statuses.iter().find(|s| s.slug == status.slug).map(|s| s.id);
        let stored = ContentStatus { id: existing.unwrap_or(status.id), ..status };
        self.statuses.insert(stored.id, stored.clone());
        Ok(stored)
    }
}

// ── Posts ────────────────────────────────────────────────────────────────────

#[async_trait]
impl PostRepository for MemoryStore {
    async fn create_post(&self, post: Post) -> Result<Post> {
        let _guard = self.write_lock.lock().await;
        if self.slug_taken(&post.slug, None) {
            return Err(DomainError::Conflict(format!("a post with slug '{}' already exists", post.slug)));
        }
        self.posts.insert(post.id, post.clone());
        Ok(post)
    }

    async fn get_post(&self, id: Uuid) -> Result<Option<Post>> {
        Ok(self.posts.get(&id).map(|p| p.clone()))
    }

    async fn get_post_by_slug(&self, slug: &str) -> Result<Option<Post>> {
        Ok(self.posts.iter().find(|p| p.slug == slug).map(|p| p.clone()))
    }

    async fn update_post(&self, post: Post) -> Result<Post> {
        let _guard = self.write_lock.lock().await;
        if self.slug_taken(&post.slug, Some(post.id)) {
            return Err(DomainError::Conflict(format!("a post with slug '{}' already exists", post.slug)));
        }
        let mut stored = self.posts.get_mut(&post.id).ok_or_else(|| DomainError::not_found("post", post.id))?;
        let updated = Post {
            status_id: stored.status_id,
            author_id: stored.author_id,
            published_at: stored.published_at,
            created_at: stored.created_at,
            ..post
        };
        *stored = updated.clone();
        Ok(updated)
    }

    async fn list_posts(&self, filter: PostFilter) -> Result<Vec<Post>> {
        let mut posts: Vec<Post> = self.posts.iter().filter(|p| matches_filter(p, &filter)).map(|p| p.clone()).collect();

        match filter.ordering {
            PostOrdering::NewestFirst => posts.sort_by_key(|p| Reverse((p.created_at, p.id))),
            PostOrdering::OldestFirst => posts.sort_by_key(|p| (p.created_at, p.id)),
            PostOrdering::RecentlyPublished => posts.sort_by_key(|p| Reverse((p.published_at, p.created_at, p.id))),
            PostOrdering::Title => posts.sort_by(|a, b| a.title.to_lowercase().cmp(&b.title.to_lowercase()).then(a.id.cmp(&b.id))),
            PostOrdering::MostCommented => {
                let counts = self.approved_comment_counts();
                posts.sort_by_key(|p| Reverse((counts.get(&p.id).copied().unwrap_or(0), p.created_at, p.id)));
            }
        }

        Ok(posts
            .into_iter()
            .skip(filter.offset.max(0) as usize)
            .take(filter.limit.max(0) as usize)
            .collect())
    }

    async fn transition_status(
        &self,
        post_id: Uuid,
        expected: Uuid,
        target: Uuid,
        publish_at: Option<DateTime<Utc>>,
    ) -> Result<Option<Post>> {
        let _guard = self.write_lock.lock().await;
        let mut post = self.posts.get_mut(&post_id).ok_or_else(|| DomainError::not_found("post", post_id))?;
        if post.status_id != expected {
            debug!(post_id = %post_id, "status compare-and-set lost");
            return Ok(None);
        }
        post.status_id = target;
        post.published_at = post.published_at.or(publish_at);
        post.updated_at = Utc::now();
        Ok(Some(post.clone()))
    }

    async fn delete_post(&self, id: Uuid) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        if self.posts.remove(&id).is_none() {
            return Ok(false);
        }
        let doomed: HashSet<Uuid> = self.comments.iter().filter(|c| c.post_id == id).map(|c| c.id).collect();
        self.comments.retain(|cid, _| !doomed.contains(cid));
        self.moderation.retain(|_, action| !doomed.contains(&action.comment_id));
        self.reports.retain(|_, report| !doomed.contains(&report.comment_id));
        Ok(true)
    }
}

// ── Comments ─────────────────────────────────────────────────────────────────

#[async_trait]
impl CommentRepository for MemoryStore {
    async fn create_comment(&self, comment: Comment) -> Result<Comment> {
        let _guard = self.write_lock.lock().await;
        if !self.posts.contains_key(&comment.post_id) {
            return Err(DomainError::not_found("post", comment.post_id));
        }
        self.comments.insert(comment.id, comment.clone());
        Ok(comment)
    }

    async fn get_comment(&self, id: Uuid) -> Result<Option<Comment>> {
        Ok(self.comments.get(&id).map(|c| c.clone()))
    }

    async fn comments_for_post(&self, post_id: Uuid) -> Result<Vec<Comment>> {
        Ok(self.sorted_comments(|c| c.post_id == post_id))
    }

    async fn replies_to(&self, parent_id: Uuid) -> Result<Vec<Comment>> {
        Ok(self.sorted_comments(|c| c.parent_id == Some(parent_id)))
    }

    async fn comments_by_author(&self, author_id: Uuid) -> Result<Vec<Comment>> {
        let mut comments = self.sorted_comments(|c| c.author_id == author_id);
        comments.reverse();
        Ok(comments)
    }

    async fn pending_comments(&self) -> Result<Vec<Comment>> {
        Ok(self.sorted_comments(|c| !c.is_approved))
    }

    async fn update_content(&self, id: Uuid, content: String) -> Result<Comment> {
        let mut comment = self.comments.get_mut(&id).ok_or_else(|| DomainError::not_found("comment", id))?;
        comment.content = content;
        comment.updated_at = Utc::now();
        Ok(comment.clone())
    }

    async fn delete_comment_tree(&self, id: Uuid) -> Result<u64> {
        let _guard = self.write_lock.lock().await;
        if !self.comments.contains_key(&id) {
            return Ok(0);
        }
        Ok(self.remove_subtree(id))
    }

    async fn set_approval_with_audit(&self, action: ModerationAction, approved: bool) -> Result<Comment> {
        let _guard = self.write_lock.lock().await;
        let updated = {
            let mut comment = self
                .comments
                .get_mut(&action.comment_id)
                .ok_or_else(|| DomainError::not_found("comment", action.comment_id))?;
            comment.is_approved = approved;
            comment.updated_at = Utc::now();
            comment.clone()
        };
        self.moderation.insert(action.id, action);
        Ok(updated)
    }

    async fn remove_with_audit(&self, action: ModerationAction) -> Result<u64> {
        let _guard = self.write_lock.lock().await;
        if !self.comments.contains_key(&action.comment_id) {
            return Err(DomainError::not_found("comment", action.comment_id));
        }
        let removed = self.remove_subtree(action.comment_id);
        self.moderation.insert(action.id, action);
        Ok(removed)
    }

    async fn moderation_history(&self, comment_id: Uuid) -> Result<Vec<ModerationAction>> {
        let mut history: Vec<_> = self
            .moderation
            .iter()
            .filter(|a| a.comment_id == comment_id)
            .map(|a| a.clone())
            .collect();
        history.sort_by_key(|a| (a.created_at, a.id));
        Ok(history)
    }

    async fn create_report(&self, report: CommentReport) -> Result<CommentReport> {
        let _guard = self.write_lock.lock().await;
        if !self.comments.contains_key(&report.comment_id) {
            return Err(DomainError::not_found("comment", report.comment_id));
        }
        if self
            .reports
            .iter()
            .any(|r| r.comment_id == report.comment_id && r.reporter_id == report.reporter_id)
        {
            return Err(DomainError::Conflict("you already reported this comment".into()));
        }
        self.reports.insert(report.id, report.clone());
        Ok(report)
    }

    async fn get_report(&self, id: Uuid) -> Result<Option<CommentReport>> {
        Ok(self.reports.get(&id).map(|r| r.clone()))
    }

    async fn list_reports(&self, status: Option<ReportStatus>) -> Result<Vec<CommentReport>> {
        let mut reports: Vec<_> = self
            .reports
            .iter()
            .filter(|r| status.map_or(true, |s| r.status == s))
            .map(|r| r.clone())
            .collect();
        reports.sort_by_key(|r| Reverse((r.created_at, r.id)));
        Ok(reports)
    }

    async fn update_report(&self, report: CommentReport) -> Result<CommentReport> {
        let mut stored = self.reports.get_mut(&report.id).ok_or_else(|| DomainError::not_found("report", report.id))?;
        *stored = report.clone();
        Ok(report)
    }
}

// ── Taxonomy ─────────────────────────────────────────────────────────────────

#[async_trait]
impl TaxonomyRepository for MemoryStore {
    async fn create_category(&self, category: Category) -> Result<Category> {
        let _guard = self.write_lock.lock().await;
        if self.categories.iter().any(|c| c.slug == category.slug) {
            return Err(DomainError::Conflict(format!("category '{}' already exists", category.slug)));
        }
        self.categories.insert(category.id, category.clone());
        Ok(category)
    }

    async fn get_category(&self, slug: &str) -> Result<Option<Category>> {
        Ok(self.categories.iter().find(|c| c.slug == slug).map(|c| c.clone()))
    }

    async fn list_categories(&self) -> Result<Vec<Category>> {
        let mut categories: Vec<_> = self.categories.iter().map(|c| c.clone()).collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn delete_category(&self, id: Uuid) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        if self.categories.remove(&id).is_none() {
            return Ok(false);
        }
        for mut post in self.posts.iter_mut().filter(|p| p.category_id == Some(id)) {
            post.category_id = None;
        }
        Ok(true)
    }

    async fn create_tag(&self, tag: Tag) -> Result<Tag> {
        let _guard = self.write_lock.lock().await;
        if self.tags.iter().any(|t| t.slug == tag.slug) {
            return Err(DomainError::Conflict(format!("tag '{}' already exists", tag.slug)));
        }
        self.tags.insert(tag.id, tag.clone());
        Ok(tag)
    }

    async fn get_tag(&self, slug: &str) -> Result<Option<Tag>> {
        Ok(self.tags.iter().find(|t| t.slug == slug).map(|t| t.clone()))
    }

    async fn list_tags(&self) -> Result<Vec<Tag>> {
        let mut tags: Vec<_> = self.tags.iter().map(|t| t.clone()).collect();
        tags.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(tags)
    }

    async fn delete_tag(&self, id: Uuid) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        if self.tags.remove(&id).is_none() {
            return Ok(false);
        }
        for mut post in self.posts.iter_mut() {
            post.tags.retain(|t| t.id != id);
        }
        Ok(true)
    }
}

// ── Users ────────────────────────────────────────────────────────────────────

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create_user(&self, user: User) -> Result<User> {
        let _guard = self.write_lock.lock().await;
        if self.users.iter().any(|u| u.username == user.username) {
            return Err(DomainError::Conflict(format!("username '{}' is taken", user.username)));
        }
        self.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.users.get(&id).map(|u| u.clone()))
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        Ok(self.users.iter().find(|u| u.username == username).map(|u| u.clone()))
    }

    async fn set_role(&self, id: Uuid, role: Role) -> Result<User> {
        let mut user = self.users.get_mut(&id).ok_or_else(|| DomainError::not_found("user", id))?;
        user.role = role;
        Ok(user.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::assert_ok;

    fn post(slug: &str, status: Uuid) -> Post {
        let now = Utc::now();
        Post {
            id: Uuid::now_v7(),
            title: slug.to_uppercase(),
            slug: slug.into(),
            author_id: Uuid::now_v7(),
            content: "Ownership and borrowing".into(),
            excerpt: String::new(),
            category_id: None,
            tags: vec![],
            status_id: status,
            featured_image: None,
            meta_description: None,
            created_at: now,
            updated_at: now,
            published_at: None,
        }
    }

    fn comment(post_id: Uuid, parent: Option<Uuid>) -> Comment {
        let now = Utc::now();
        Comment {
            id: Uuid::now_v7(),
            post_id,
            author_id: Uuid::now_v7(),
            content: "nice".into(),
            parent_id: parent,
            is_approved: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn compare_and_set_keeps_first_publication_date() {
        let store = MemoryStore::new();
        let (draft, published, archived) = (Uuid::now_v7(), Uuid::now_v7(), Uuid::now_v7());
        let p = assert_ok!(store.create_post(post("cas", draft)).await);

        let first = Utc::now();
        let moved = store.transition_status(p.id, draft, published, Some(first)).await.unwrap().unwrap();
        assert_eq!(moved.published_at, Some(first));

        // stale expectation
        assert!(store.transition_status(p.id, draft, archived, None).await.unwrap().is_none());

        let later = first + chrono::Duration::hours(1);
        let back = store.transition_status(p.id, published, draft, None).await.unwrap().unwrap();
        let again = store.transition_status(back.id, draft, published, Some(later)).await.unwrap().unwrap();
        assert_eq!(again.published_at, Some(first));
    }

    #[tokio::test]
    async fn duplicate_slug_conflicts() {
        let store = MemoryStore::new();
        let status = Uuid::now_v7();
        assert_ok!(store.create_post(post("same", status)).await);
        let err = store.create_post(post("same", status)).await.unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[tokio::test]
    async fn deleting_a_comment_takes_its_replies() {
        let store = MemoryStore::new();
        let p = store.create_post(post("thread", Uuid::now_v7())).await.unwrap();
        let root = store.create_comment(comment(p.id, None)).await.unwrap();
        let child = store.create_comment(comment(p.id, Some(root.id))).await.unwrap();
        store.create_comment(comment(p.id, Some(child.id))).await.unwrap();
        let sibling = store.create_comment(comment(p.id, None)).await.unwrap();

        assert_eq!(store.delete_comment_tree(root.id).await.unwrap(), 3);
        let left = store.comments_for_post(p.id).await.unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].id, sibling.id);
    }

    #[tokio::test]
    async fn deleting_a_post_cascades_to_comments() {
        let store = MemoryStore::new();
        let p = store.create_post(post("gone", Uuid::now_v7())).await.unwrap();
        store.create_comment(comment(p.id, None)).await.unwrap();

        assert!(store.delete_post(p.id).await.unwrap());
        assert!(store.comments_for_post(p.id).await.unwrap().is_empty());
        assert!(!store.delete_post(p.id).await.unwrap());
    }

    #[tokio::test]
    async fn search_is_case_insensitive_and_paginated() {
        let store = MemoryStore::new();
        let status = Uuid::now_v7();
        for slug in ["a", "b", "c"] {
            store.create_post(post(slug, status)).await.unwrap();
        }
        let filter = PostFilter { search: Some("BORROW".into()), limit: 2, ..Default::default() };
        assert_eq!(store.list_posts(filter.clone()).await.unwrap().len(), 2);
        let rest = PostFilter { offset: 2, ..filter };
        assert_eq!(store.list_posts(rest).await.unwrap().len(), 1);
    }

    fn audit(comment_id: Uuid, action: domains::ModerationKind) -> ModerationAction {
        ModerationAction {
            id: Uuid::now_v7(),
            comment_id,
            moderator_id: Uuid::now_v7(),
            action,
            reason: String::new(),
            created_at: Utc::now(),
        }
    }

    fn report(comment_id: Uuid, reporter_id: Uuid) -> CommentReport {
        CommentReport {
            id: Uuid::now_v7(),
            comment_id,
            reporter_id,
            reason: domains::ReportReason::Spam,
            description: String::new(),
            status: ReportStatus::Pending,
            resolved_by: None,
            resolved_at: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn approval_and_audit_row_land_together() {
        let store = MemoryStore::new();
        let p = store.create_post(post("audited", Uuid::now_v7())).await.unwrap();
        let c = store.create_comment(comment(p.id, None)).await.unwrap();

        let approved = store.set_approval_with_audit(audit(c.id, domains::ModerationKind::Approved), true).await.unwrap();
        assert!(approved.is_approved);
        assert_eq!(store.moderation_history(c.id).await.unwrap().len(), 1);

        // a missing comment writes no audit row
        let ghost = Uuid::now_v7();
        let err = store.set_approval_with_audit(audit(ghost, domains::ModerationKind::Approved), true).await.unwrap_err();
        assert_eq!(err, DomainError::not_found("comment", ghost));
        assert!(store.moderation_history(ghost).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn removal_keeps_audit_and_drops_reports() {
        let store = MemoryStore::new();
        let p = store.create_post(post("spam", Uuid::now_v7())).await.unwrap();
        let root = store.create_comment(comment(p.id, None)).await.unwrap();
        let reply = store.create_comment(comment(p.id, Some(root.id))).await.unwrap();
        store.create_report(report(reply.id, Uuid::now_v7())).await.unwrap();

        let removed = store.remove_with_audit(audit(root.id, domains::ModerationKind::Spam)).await.unwrap();
        assert_eq!(removed, 2);
        assert_eq!(store.moderation_history(root.id).await.unwrap().len(), 1);
        assert!(store.list_reports(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn one_report_per_reader_and_comment() {
        let store = MemoryStore::new();
        let p = store.create_post(post("reported", Uuid::now_v7())).await.unwrap();
        let c = store.create_comment(comment(p.id, None)).await.unwrap();
        let reader = Uuid::now_v7();

        assert_ok!(store.create_report(report(c.id, reader)).await);
        let err = store.create_report(report(c.id, reader)).await.unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
        assert_ok!(store.create_report(report(c.id, Uuid::now_v7())).await);

        assert_eq!(store.list_reports(Some(ReportStatus::Pending)).await.unwrap().len(), 2);
        assert!(store.list_reports(Some(ReportStatus::Resolved)).await.unwrap().is_empty());
    }
}
