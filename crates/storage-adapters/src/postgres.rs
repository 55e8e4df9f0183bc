//! # PostgreSQL store
//!
//! Maps the relational schema in `migrations/` onto the domain models.
//! Multi-statement writes run inside a transaction; the status change is a
//! single conditional `UPDATE` so two writers can never both win.

use std::collections::HashMap;

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domains::{
    Category, Comment, CommentReport, CommentRepository, ContentStatus, DomainError,
    ModerationAction, ModerationKind, Post, PostFilter, PostOrdering, PostRepository,
    ReportReason, ReportStatus, Result, Role, StatusRepository, Tag, TaxonomyRepository, User,
    UserRepository,
};
use sqlx::postgres::{PgConnection, PgPool, PgPoolOptions, PgRow};
use sqlx::{Postgres, QueryBuilder, Row};
use tracing::{debug, info};
use uuid::Uuid;

const POST_COLUMNS: &str = "p.id, p.title, p.slug, p.author_id, p.content, p.excerpt, p.category_id, \
     p.status_id, p.featured_image, p.meta_description, p.created_at, p.updated_at, p.published_at";

const COMMENT_COLUMNS: &str =
    "id, post_id, author_id, content, parent_id, is_approved, created_at, updated_at";

const REPORT_COLUMNS: &str =
    "id, comment_id, reporter_id, reason, description, status, resolved_by, resolved_at, created_at";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

/// Unique violations become `Conflict`; everything else is an infrastructure fault.
fn db_err(err: sqlx::Error) -> DomainError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return DomainError::Conflict(db.message().to_string());
        }
    }
    DomainError::Internal(err.to_string())
}

fn post_from_row(row: &PgRow) -> Post {
    Post {
        id: row.get("id"),
        title: row.get("title"),
        slug: row.get("slug"),
        author_id: row.get("author_id"),
        content: row.get("content"),
        excerpt: row.get("excerpt"),
        category_id: row.get("category_id"),
        tags: Vec::new(),
        status_id: row.get("status_id"),
        featured_image: row.get("featured_image"),
        meta_description: row.get("meta_description"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        published_at: row.get("published_at"),
    }
}

fn comment_from_row(row: &PgRow) -> Comment {
    Comment {
        id: row.get("id"),
        post_id: row.get("post_id"),
        author_id: row.get("author_id"),
        content: row.get("content"),
        parent_id: row.get("parent_id"),
        is_approved: row.get("is_approved"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn tag_from_row(row: &PgRow) -> Tag {
    Tag { id: row.get("id"), name: row.get("name"), slug: row.get("slug"), created_at: row.get("created_at") }
}

fn category_from_row(row: &PgRow) -> Category {
    Category {
        id: row.get("id"),
        name: row.get("name"),
        slug: row.get("slug"),
        description: row.get("description"),
        created_at: row.get("created_at"),
    }
}

fn status_from_row(row: &PgRow) -> ContentStatus {
    ContentStatus {
        id: row.get("id"),
        name: row.get("name"),
        slug: row.get("slug"),
        description: row.get("description"),
        icon: row.get("icon"),
        color: row.get("color"),
        is_published: row.get("is_published"),
        is_active: row.get("is_active"),
        sort_order: row.get("sort_order"),
    }
}

fn user_from_row(row: &PgRow) -> Result<User> {
    let role: String = row.get("role");
    Ok(User {
        id: row.get("id"),
        username: row.get("username"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        role: Role::parse(&role).ok_or_else(|| DomainError::Internal(format!("unknown role '{role}'")))?,
        created_at: row.get("created_at"),
    })
}

fn moderation_from_row(row: &PgRow) -> Result<ModerationAction> {
    let raw: String = row.get("action");
    let action = ModerationKind::parse(&raw)
        .ok_or_else(|| DomainError::Internal(format!("unknown moderation action '{raw}'")))?;
    Ok(ModerationAction {
        id: row.get("id"),
        comment_id: row.get("comment_id"),
        moderator_id: row.get("moderator_id"),
        action,
        reason: row.get("reason"),
        created_at: row.get("created_at"),
    })
}

fn report_from_row(row: &PgRow) -> Result<CommentReport> {
    let reason: String = row.get("reason");
    let status: String = row.get("status");
    Ok(CommentReport {
        id: row.get("id"),
        comment_id: row.get("comment_id"),
        reporter_id: row.get("reporter_id"),
        reason: ReportReason::parse(&reason)
            .ok_or_else(|| DomainError::Internal(format!("unknown report reason '{reason}'")))?,
        description: row.get("description"),
        status: ReportStatus::parse(&status)
            .ok_or_else(|| DomainError::Internal(format!("unknown report status '{status}'")))?,
        resolved_by: row.get("resolved_by"),
        resolved_at: row.get("resolved_at"),
        created_at: row.get("created_at"),
    })
}

/// `ILIKE` pattern matching `q` literally anywhere in the column.
///
/// Pairs with `ESCAPE '\'` in the query.
fn like_pattern(q: &str) -> String {
    let mut pattern = String::with_capacity(q.len() + 2);
    pattern.push('%');
    for c in q.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

async fn insert_audit(conn: &mut PgConnection, action: &ModerationAction) -> Result<()> {
    sqlx::query(
        "INSERT INTO moderation_actions (id, comment_id, moderator_id, action, reason, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(action.id)
    .bind(action.comment_id)
    .bind(action.moderator_id)
    .bind(action.action.as_str())
    .bind(&action.reason)
    .bind(action.created_at)
    .execute(conn)
    .await
    .map_err(db_err)?;
    Ok(())
}

/// Size of the reply tree rooted at `id`, root included; zero when it is gone.
async fn subtree_size(conn: &mut PgConnection, id: Uuid) -> Result<u64> {
    let count: i64 = sqlx::query_scalar(
        "WITH RECURSIVE tree AS ( \
             SELECT id FROM comments WHERE id = $1 \
             UNION ALL SELECT c.id FROM comments c JOIN tree t ON c.parent_id = t.id \
         ) SELECT count(*) FROM tree",
    )
    .bind(id)
    .fetch_one(conn)
    .await
    .map_err(db_err)?;
    Ok(count as u64)
}

impl PgStore {
    pub async fn connect(url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
            .context("connecting to PostgreSQL")?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await.context("running migrations")?;
        info!("database migrations applied");
        Ok(())
    }

    /// Fills `tags` on each post with one query for the whole batch.
    async fn attach_tags(&self, mut posts: Vec<Post>) -> Result<Vec<Post>> {
        if posts.is_empty() {
            return Ok(posts);
        }
        let ids: Vec<Uuid> = posts.iter().map(|p| p.id).collect();
        let rows = sqlx::query(
            "SELECT pt.post_id, t.id, t.name, t.slug, t.created_at \
             FROM post_tags pt JOIN tags t ON t.id = pt.tag_id \
             WHERE pt.post_id = ANY($1) ORDER BY t.name",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let mut by_post: HashMap<Uuid, Vec<Tag>> = HashMap::new();
        for row in &rows {
            by_post.entry(row.get("post_id")).or_default().push(tag_from_row(row));
        }
        for post in &mut posts {
            post.tags = by_post.remove(&post.id).unwrap_or_default();
        }
        Ok(posts)
    }

    async fn fetch_post(&self, clause: &str, bind: PostKey<'_>) -> Result<Option<Post>> {
        let sql = format!("SELECT {POST_COLUMNS} FROM posts p WHERE {clause}");
        let query = sqlx::query(&sql);
        let query = match bind {
            PostKey::Id(id) => query.bind(id),
            PostKey::Slug(slug) => query.bind(slug),
        };
        let row = query.fetch_optional(&self.pool).await.map_err(db_err)?;
        match row {
            Some(row) => Ok(self.attach_tags(vec![post_from_row(&row)]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn comments_where(&self, clause: &str, id: Uuid, order: &str) -> Result<Vec<Comment>> {
        let sql = format!("SELECT {COMMENT_COLUMNS} FROM comments WHERE {clause} ORDER BY {order}");
        let rows = sqlx::query(&sql).bind(id).fetch_all(&self.pool).await.map_err(db_err)?;
        Ok(rows.iter().map(comment_from_row).collect())
    }
}

enum PostKey<'a> {
    Id(Uuid),
    Slug(&'a str),
}

// ── Statuses ─────────────────────────────────────────────────────────────────

#[async_trait]
impl StatusRepository for PgStore {
    async fn list_statuses(&self) -> Result<Vec<ContentStatus>> {
        let rows = sqlx::query("SELECT * FROM content_statuses ORDER BY sort_order, name")
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(rows.iter().map(status_from_row).collect())
    }

    async fn upsert_status(&self, status: ContentStatus) -> Result<ContentStatus> {
        let row = sqlx::query(
            "INSERT INTO content_statuses (id, name, slug, description, icon, color, is_published, is_active, sort_order) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             ON CONFLICT (slug) DO UPDATE SET name = EXCLUDED.name, description = EXCLUDED.description, \
                 icon = EXCLUDED.icon, color = EXCLUDED.color, is_published = EXCLUDED.is_published, \
                 is_active = EXCLUDED.is_active, sort_order = EXCLUDED.sort_order \
             RETURNING *",
        )
        .bind(status.id)
        .bind(&status.name)
        .bind(&status.slug)
        .bind(&status.description)
        .bind(&status.icon)
        .bind(&status.color)
        .bind(status.is_published)
        .bind(status.is_active)
        .bind(status.sort_order)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(status_from_row(&row))
    }
}

// ── Posts ────────────────────────────────────────────────────────────────────

#[async_trait]
impl PostRepository for PgStore {
    async fn create_post(&self, post: Post) -> Result<Post> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        sqlx::query(
            "INSERT INTO posts (id, title, slug, author_id, content, excerpt, category_id, status_id, \
                 featured_image, meta_description, created_at, updated_at, published_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
        )
        .bind(post.id)
        .bind(&post.title)
        .bind(&post.slug)
        .bind(post.author_id)
        .bind(&post.content)
        .bind(&post.excerpt)
        .bind(post.category_id)
        .bind(post.status_id)
        .bind(&post.featured_image)
        .bind(&post.meta_description)
        .bind(post.created_at)
        .bind(post.updated_at)
        .bind(post.published_at)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        for tag in &post.tags {
            sqlx::query("INSERT INTO post_tags (post_id, tag_id) VALUES ($1, $2)")
                .bind(post.id)
                .bind(tag.id)
                .execute(&mut *tx)
                .await
                .map_err(db_err)?;
        }

        tx.commit().await.map_err(db_err)?;
        Ok(post)
    }

    async fn get_post(&self, id: Uuid) -> Result<Option<Post>> {
        self.fetch_post("p.id = $1", PostKey::Id(id)).await
    }

    async fn get_post_by_slug(&self, slug: &str) -> Result<Option<Post>> {
        self.fetch_post("p.slug = $1", PostKey::Slug(slug)).await
    }

    async fn update_post(&self, post: Post) -> Result<Post> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let updated = sqlx::query(
            "UPDATE posts SET title = $2, slug = $3, content = $4, excerpt = $5, category_id = $6, \
                 featured_image = $7, meta_description = $8, updated_at = $9 \
             WHERE id = $1",
        )
        .bind(post.id)
        .bind(&post.title)
        .bind(&post.slug)
        .bind(&post.content)
        .bind(&post.excerpt)
        .bind(post.category_id)
        .bind(&post.featured_image)
        .bind(&post.meta_description)
        .bind(post.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;
        if updated.rows_affected() == 0 {
            return Err(DomainError::not_found("post", post.id));
        }

        sqlx::query("DELETE FROM post_tags WHERE post_id = $1")
            .bind(post.id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        for tag in &post.tags {
            sqlx::query("INSERT INTO post_tags (post_id, tag_id) VALUES ($1, $2)")
                .bind(post.id)
                .bind(tag.id)
                .execute(&mut *tx)
                .await
                .map_err(db_err)?;
        }

        tx.commit().await.map_err(db_err)?;
        self.get_post(post.id).await?.ok_or_else(|| DomainError::not_found("post", post.id))
    }

    async fn list_posts(&self, filter: PostFilter) -> Result<Vec<Post>> {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(format!("SELECT {POST_COLUMNS} FROM posts p WHERE TRUE"));

        if let Some(author_id) = filter.author_id {
            qb.push(" AND p.author_id = ").push_bind(author_id);
        }
        if let Some(category_id) = filter.category_id {
            qb.push(" AND p.category_id = ").push_bind(category_id);
        }
        if !filter.tag_ids.is_empty() {
            qb.push(" AND EXISTS (SELECT 1 FROM post_tags pt WHERE pt.post_id = p.id AND pt.tag_id = ANY(")
                .push_bind(filter.tag_ids.clone())
                .push("))");
        }
        if let Some(status_ids) = &filter.status_ids {
            qb.push(" AND p.status_id = ANY(").push_bind(status_ids.clone()).push(")");
        }
        if let Some(q) = &filter.search {
            qb.push(" AND (p.search @@ plainto_tsquery('english', ")
                .push_bind(q.clone())
                .push(") OR p.title ILIKE ")
                .push_bind(like_pattern(q))
                .push(" ESCAPE '\\')");
        }

        qb.push(match filter.ordering {
            PostOrdering::NewestFirst => " ORDER BY p.created_at DESC, p.id DESC",
            PostOrdering::OldestFirst => " ORDER BY p.created_at ASC, p.id ASC",
            PostOrdering::RecentlyPublished => " ORDER BY p.published_at DESC NULLS LAST, p.created_at DESC",
            PostOrdering::Title => " ORDER BY lower(p.title), p.id",
            PostOrdering::MostCommented => {
                " ORDER BY (SELECT count(*) FROM comments c WHERE c.post_id = p.id AND c.is_approved) DESC, \
                 p.created_at DESC"
            }
        });
        qb.push(" LIMIT ").push_bind(filter.limit).push(" OFFSET ").push_bind(filter.offset);

        let rows = qb.build().fetch_all(&self.pool).await.map_err(db_err)?;
        self.attach_tags(rows.iter().map(post_from_row).collect()).await
    }

    async fn transition_status(
        &self,
        post_id: Uuid,
        expected: Uuid,
        target: Uuid,
        publish_at: Option<DateTime<Utc>>,
    ) -> Result<Option<Post>> {
        let updated = sqlx::query(
            "UPDATE posts SET status_id = $3, published_at = COALESCE(published_at, $4), updated_at = now() \
             WHERE id = $1 AND status_id = $2",
        )
        .bind(post_id)
        .bind(expected)
        .bind(target)
        .bind(publish_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        let post = self.get_post(post_id).await?.ok_or_else(|| DomainError::not_found("post", post_id))?;
        if updated.rows_affected() == 0 {
            debug!(post_id = %post_id, "status compare-and-set lost");
            return Ok(None);
        }
        Ok(Some(post))
    }

    async fn delete_post(&self, id: Uuid) -> Result<bool> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        sqlx::query("DELETE FROM moderation_actions WHERE comment_id IN (SELECT id FROM comments WHERE post_id = $1)")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        // comments and post_tags go with the post via ON DELETE CASCADE
        let deleted = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;
        Ok(deleted.rows_affected() > 0)
    }
}

// ── Comments ─────────────────────────────────────────────────────────────────

#[async_trait]
impl CommentRepository for PgStore {
    async fn create_comment(&self, comment: Comment) -> Result<Comment> {
        sqlx::query(
            "INSERT INTO comments (id, post_id, author_id, content, parent_id, is_approved, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(comment.id)
        .bind(comment.post_id)
        .bind(comment.author_id)
        .bind(&comment.content)
        .bind(comment.parent_id)
        .bind(comment.is_approved)
        .bind(comment.created_at)
        .bind(comment.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(comment)
    }

    async fn get_comment(&self, id: Uuid) -> Result<Option<Comment>> {
        let sql = format!("SELECT {COMMENT_COLUMNS} FROM comments WHERE id = $1");
        let row = sqlx::query(&sql).bind(id).fetch_optional(&self.pool).await.map_err(db_err)?;
        Ok(row.as_ref().map(comment_from_row))
    }

    async fn comments_for_post(&self, post_id: Uuid) -> Result<Vec<Comment>> {
        self.comments_where("post_id = $1", post_id, "created_at, id").await
    }

    async fn replies_to(&self, parent_id: Uuid) -> Result<Vec<Comment>> {
        self.comments_where("parent_id = $1", parent_id, "created_at, id").await
    }

    async fn comments_by_author(&self, author_id: Uuid) -> Result<Vec<Comment>> {
        self.comments_where("author_id = $1", author_id, "created_at DESC, id DESC").await
    }

    async fn pending_comments(&self) -> Result<Vec<Comment>> {
        let sql = format!("SELECT {COMMENT_COLUMNS} FROM comments WHERE NOT is_approved ORDER BY created_at, id");
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await.map_err(db_err)?;
        Ok(rows.iter().map(comment_from_row).collect())
    }

    async fn update_content(&self, id: Uuid, content: String) -> Result<Comment> {
        let sql = format!("UPDATE comments SET content = $2, updated_at = now() WHERE id = $1 RETURNING {COMMENT_COLUMNS}");
        let row = sqlx::query(&sql).bind(id).bind(content).fetch_optional(&self.pool).await.map_err(db_err)?;
        row.as_ref().map(comment_from_row).ok_or_else(|| DomainError::not_found("comment", id))
    }

    async fn delete_comment_tree(&self, id: Uuid) -> Result<u64> {
        // replies and reports follow through ON DELETE CASCADE; count first
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        let count = subtree_size(&mut tx, id).await?;
        sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        tx.commit().await.map_err(db_err)?;
        Ok(count)
    }

    async fn set_approval_with_audit(&self, action: ModerationAction, approved: bool) -> Result<Comment> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        let sql = format!("UPDATE comments SET is_approved = $2, updated_at = now() WHERE id = $1 RETURNING {COMMENT_COLUMNS}");
        let row = sqlx::query(&sql)
            .bind(action.comment_id)
            .bind(approved)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_err)?;
        let comment = row
            .as_ref()
            .map(comment_from_row)
            .ok_or_else(|| DomainError::not_found("comment", action.comment_id))?;
        insert_audit(&mut tx, &action).await?;
        tx.commit().await.map_err(db_err)?;
        Ok(comment)
    }

    async fn remove_with_audit(&self, action: ModerationAction) -> Result<u64> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        let count = subtree_size(&mut tx, action.comment_id).await?;
        if count == 0 {
            return Err(DomainError::not_found("comment", action.comment_id));
        }
        sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(action.comment_id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        insert_audit(&mut tx, &action).await?;
        tx.commit().await.map_err(db_err)?;
        Ok(count)
    }

    async fn moderation_history(&self, comment_id: Uuid) -> Result<Vec<ModerationAction>> {
        let rows = sqlx::query("SELECT * FROM moderation_actions WHERE comment_id = $1 ORDER BY created_at, id")
            .bind(comment_id)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        rows.iter().map(moderation_from_row).collect()
    }

    async fn create_report(&self, report: CommentReport) -> Result<CommentReport> {
        sqlx::query(
            "INSERT INTO comment_reports (id, comment_id, reporter_id, reason, description, status, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(report.id)
        .bind(report.comment_id)
        .bind(report.reporter_id)
        .bind(report.reason.as_str())
        .bind(&report.description)
        .bind(report.status.as_str())
        .bind(report.created_at)
        .execute(&self.pool)
        .await
        .map_err(|err| match db_err(err) {
            DomainError::Conflict(_) => DomainError::Conflict("you already reported this comment".into()),
            other => other,
        })?;
        Ok(report)
    }

    async fn get_report(&self, id: Uuid) -> Result<Option<CommentReport>> {
        let sql = format!("SELECT {REPORT_COLUMNS} FROM comment_reports WHERE id = $1");
        let row = sqlx::query(&sql).bind(id).fetch_optional(&self.pool).await.map_err(db_err)?;
        row.as_ref().map(report_from_row).transpose()
    }

    async fn list_reports(&self, status: Option<ReportStatus>) -> Result<Vec<CommentReport>> {
        let sql = format!(
            "SELECT {REPORT_COLUMNS} FROM comment_reports \
             WHERE $1::text IS NULL OR status = $1 ORDER BY created_at DESC, id DESC"
        );
        let rows = sqlx::query(&sql)
            .bind(status.map(|s| s.as_str()))
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        rows.iter().map(report_from_row).collect()
    }

    async fn update_report(&self, report: CommentReport) -> Result<CommentReport> {
        let sql = format!(
            "UPDATE comment_reports SET status = $2, resolved_by = $3, resolved_at = $4 \
             WHERE id = $1 RETURNING {REPORT_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(report.id)
            .bind(report.status.as_str())
            .bind(report.resolved_by)
            .bind(report.resolved_at)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.as_ref()
            .map(report_from_row)
            .transpose()?
            .ok_or_else(|| DomainError::not_found("report", report.id))
    }
}

// ── Taxonomy ─────────────────────────────────────────────────────────────────

#[async_trait]
impl TaxonomyRepository for PgStore {
    async fn create_category(&self, category: Category) -> Result<Category> {
        sqlx::query("INSERT INTO categories (id, name, slug, description, created_at) VALUES ($1, $2, $3, $4, $5)")
            .bind(category.id)
            .bind(&category.name)
            .bind(&category.slug)
            .bind(&category.description)
            .bind(category.created_at)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(category)
    }

    async fn get_category(&self, slug: &str) -> Result<Option<Category>> {
        let row = sqlx::query("SELECT * FROM categories WHERE slug = $1")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(row.as_ref().map(category_from_row))
    }

    async fn list_categories(&self) -> Result<Vec<Category>> {
        let rows = sqlx::query("SELECT * FROM categories ORDER BY name").fetch_all(&self.pool).await.map_err(db_err)?;
        Ok(rows.iter().map(category_from_row).collect())
    }

    async fn delete_category(&self, id: Uuid) -> Result<bool> {
        let deleted = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(deleted.rows_affected() > 0)
    }

    async fn create_tag(&self, tag: Tag) -> Result<Tag> {
        sqlx::query("INSERT INTO tags (id, name, slug, created_at) VALUES ($1, $2, $3, $4)")
            .bind(tag.id)
            .bind(&tag.name)
            .bind(&tag.slug)
            .bind(tag.created_at)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(tag)
    }

    async fn get_tag(&self, slug: &str) -> Result<Option<Tag>> {
        let row = sqlx::query("SELECT * FROM tags WHERE slug = $1")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(row.as_ref().map(tag_from_row))
    }

    async fn list_tags(&self) -> Result<Vec<Tag>> {
        let rows = sqlx::query("SELECT * FROM tags ORDER BY name").fetch_all(&self.pool).await.map_err(db_err)?;
        Ok(rows.iter().map(tag_from_row).collect())
    }

    async fn delete_tag(&self, id: Uuid) -> Result<bool> {
        let deleted = sqlx::query("DELETE FROM tags WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(deleted.rows_affected() > 0)
    }
}

// ── Users ────────────────────────────────────────────────────────────────────

#[async_trait]
impl UserRepository for PgStore {
    async fn create_user(&self, user: User) -> Result<User> {
        sqlx::query(
            "INSERT INTO users (id, username, email, password_hash, role, created_at) VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(user)
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn set_role(&self, id: Uuid, role: Role) -> Result<User> {
        let row = sqlx::query("UPDATE users SET role = $2 WHERE id = $1 RETURNING *")
            .bind(id)
            .bind(role.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.as_ref().map(user_from_row).transpose()?.ok_or_else(|| DomainError::not_found("user", id))
    }
}
