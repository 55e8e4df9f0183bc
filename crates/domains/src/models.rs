//! # Domain Models
//!
//! These structs represent the core entities of rusty-press.
//! We use UUID v7 for time-ordered, globally unique identification.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// Privilege level of an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Author,
    Moderator,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Author => "author",
            Role::Moderator => "moderator",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "author" => Some(Role::Author),
            "moderator" => Some(Role::Moderator),
            _ => None,
        }
    }
}

/// A registered account. Every account may author posts and comments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// The authenticated caller, as resolved by the API layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: Uuid,
    pub role: Role,
}

impl Actor {
    pub fn new(id: Uuid, role: Role) -> Self {
        Self { id, role }
    }

    pub fn is_moderator(&self) -> bool {
        self.role == Role::Moderator
    }
}

/// A named lifecycle stage for a post (e.g. draft, published).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentStatus {
    pub id: Uuid,
    pub name: String,
    /// Unique and immutable once created
    pub slug: String,
    pub description: String,
    pub icon: String,
    /// Hex color for admin display (e.g. "#16a34a")
    pub color: String,
    /// Posts in this status are visible to the public
    pub is_published: bool,
    /// The status may still be assigned
    pub is_active: bool,
    pub sort_order: i32,
}

/// Single-level classification label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// Free-form label, many-to-many with posts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub created_at: DateTime<Utc>,
}

/// The central content item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub title: String,
    /// Globally unique; stable once published
    pub slug: String,
    pub author_id: Uuid,
    pub content: String,
    pub excerpt: String,
    pub category_id: Option<Uuid>,
    pub tags: Vec<Tag>,
    pub status_id: Uuid,
    /// Path or URL of the featured image, served elsewhere
    pub featured_image: Option<String>,
    /// SEO meta description
    pub meta_description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// First moment the post entered a publishing status. Never cleared.
    pub published_at: Option<DateTime<Utc>>,
}

impl Post {
    /// Estimated reading time in minutes at 200 words per minute.
    pub fn reading_time(&self) -> usize {
        (self.content.split_whitespace().count() / 200).max(1)
    }

    pub fn has_tag(&self, tag_id: Uuid) -> bool {
        self.tags.iter().any(|t| t.id == tag_id)
    }
}

/// Feedback attached to a post, optionally threaded under another comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub post_id: Uuid,
    pub author_id: Uuid,
    pub content: String,
    /// Must reference a comment on the same post
    pub parent_id: Option<Uuid>,
    pub is_approved: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Comment {
    pub fn is_reply(&self) -> bool {
        self.parent_id.is_some()
    }
}

/// An approved comment together with its approved replies.
#[derive(Debug, Clone, Serialize)]
pub struct CommentNode {
    #[serde(flatten)]
    pub comment: Comment,
    pub replies: Vec<CommentNode>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModerationKind {
    Approved,
    Rejected,
    /// Pulled back out of public view, pending another look
    Flagged,
    /// Removed together with its replies as spam
    Spam,
}

impl ModerationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModerationKind::Approved => "approved",
            ModerationKind::Rejected => "rejected",
            ModerationKind::Flagged => "flagged",
            ModerationKind::Spam => "spam",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "approved" => Some(ModerationKind::Approved),
            "rejected" => Some(ModerationKind::Rejected),
            "flagged" => Some(ModerationKind::Flagged),
            "spam" => Some(ModerationKind::Spam),
            _ => None,
        }
    }

    /// Whether the action deletes the comment subtree.
    pub fn removes_comment(&self) -> bool {
        matches!(self, ModerationKind::Rejected | ModerationKind::Spam)
    }
}

/// Audit row for a moderation decision. Outlives the comment on rejection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModerationAction {
    pub id: Uuid,
    pub comment_id: Uuid,
    pub moderator_id: Uuid,
    pub action: ModerationKind,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportReason {
    Spam,
    Harassment,
    Inappropriate,
    OffTopic,
    Other,
}

impl ReportReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportReason::Spam => "spam",
            ReportReason::Harassment => "harassment",
            ReportReason::Inappropriate => "inappropriate",
            ReportReason::OffTopic => "off_topic",
            ReportReason::Other => "other",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "spam" => Some(ReportReason::Spam),
            "harassment" => Some(ReportReason::Harassment),
            "inappropriate" => Some(ReportReason::Inappropriate),
            "off_topic" => Some(ReportReason::OffTopic),
            "other" => Some(ReportReason::Other),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    #[default]
    Pending,
    Reviewed,
    Resolved,
    Dismissed,
}

impl ReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Pending => "pending",
            ReportStatus::Reviewed => "reviewed",
            ReportStatus::Resolved => "resolved",
            ReportStatus::Dismissed => "dismissed",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "pending" => Some(ReportStatus::Pending),
            "reviewed" => Some(ReportStatus::Reviewed),
            "resolved" => Some(ReportStatus::Resolved),
            "dismissed" => Some(ReportStatus::Dismissed),
            _ => None,
        }
    }
}

/// A reader's complaint about a comment. One per reporter and comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentReport {
    pub id: Uuid,
    pub comment_id: Uuid,
    pub reporter_id: Uuid,
    pub reason: ReportReason,
    pub description: String,
    pub status: ReportStatus,
    pub resolved_by: Option<Uuid>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

// ── Inputs ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct NewPost {
    #[validate(length(min = 1, max = 200, message = "title must be 1 to 200 characters"))]
    pub title: String,
    /// Derived from the title when absent
    #[validate(length(max = 200, message = "slug must be at most 200 characters"))]
    pub slug: Option<String>,
    pub content: String,
    /// Derived from the content when absent
    #[validate(length(max = 300, message = "excerpt must be at most 300 characters"))]
    pub excerpt: Option<String>,
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[validate(length(max = 500, message = "featured_image must be at most 500 characters"))]
    pub featured_image: Option<String>,
    #[validate(length(max = 160, message = "meta_description must be at most 160 characters"))]
    pub meta_description: Option<String>,
}

/// Partial update; `None` leaves the field untouched.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct PostUpdate {
    #[validate(length(min = 1, max = 200, message = "title must be 1 to 200 characters"))]
    pub title: Option<String>,
    #[validate(length(max = 200, message = "slug must be at most 200 characters"))]
    pub slug: Option<String>,
    pub content: Option<String>,
    #[validate(length(max = 300, message = "excerpt must be at most 300 characters"))]
    pub excerpt: Option<String>,
    /// `Some(None)` clears the category
    #[serde(default, with = "double_option")]
    pub category: Option<Option<String>>,
    pub tags: Option<Vec<String>>,
    #[serde(default, with = "double_option")]
    #[validate(length(max = 500, message = "featured_image must be at most 500 characters"))]
    pub featured_image: Option<Option<String>>,
    #[serde(default, with = "double_option")]
    #[validate(length(max = 160, message = "meta_description must be at most 160 characters"))]
    pub meta_description: Option<Option<String>>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewComment {
    #[validate(length(min = 1, max = 5000, message = "content must be 1 to 5000 characters"))]
    pub content: String,
    pub parent_id: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CommentEdit {
    #[validate(length(min = 1, max = 5000, message = "content must be 1 to 5000 characters"))]
    pub content: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewReport {
    pub reason: ReportReason,
    #[serde(default)]
    #[validate(length(max = 1000, message = "description must be at most 1000 characters"))]
    pub description: Option<String>,
}

fn hex_color(value: &str) -> Result<(), ValidationError> {
    let well_formed = value.is_empty()
        || (value.len() == 7 && value.starts_with('#') && value[1..].chars().all(|c| c.is_ascii_hexdigit()));
    if well_formed {
        Ok(())
    } else {
        Err(ValidationError::new("hex_color").with_message("color must look like #1a2b3c".into()))
    }
}

/// A status added by an administrator. Starts active.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct NewStatus {
    #[validate(length(min = 1, max = 50, message = "name must be 1 to 50 characters"))]
    pub name: String,
    #[validate(length(min = 1, max = 50, message = "slug must be 1 to 50 characters"))]
    pub slug: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    #[validate(length(max = 50, message = "icon must be at most 50 characters"))]
    pub icon: String,
    #[serde(default)]
    #[validate(custom(function = "hex_color"))]
    pub color: String,
    #[serde(default)]
    pub is_published: bool,
    #[serde(default)]
    pub sort_order: i32,
}

/// Partial edit of a status. The slug is not editable.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct StatusUpdate {
    #[validate(length(min = 1, max = 50, message = "name must be 1 to 50 characters"))]
    pub name: Option<String>,
    pub description: Option<String>,
    #[validate(length(max = 50, message = "icon must be at most 50 characters"))]
    pub icon: Option<String>,
    #[validate(custom(function = "hex_color"))]
    pub color: Option<String>,
    pub is_published: Option<bool>,
    pub is_active: Option<bool>,
    pub sort_order: Option<i32>,
}

// ── Queries ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PostOrdering {
    #[default]
    #[serde(rename = "-created_at")]
    NewestFirst,
    #[serde(rename = "created_at")]
    OldestFirst,
    #[serde(rename = "-published_at")]
    RecentlyPublished,
    #[serde(rename = "title")]
    Title,
    #[serde(rename = "-comments")]
    MostCommented,
}

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;

/// Storage-level listing filter. Slugs are resolved to ids by the services.
#[derive(Debug, Clone, PartialEq)]
pub struct PostFilter {
    pub author_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    /// Matches posts carrying any of these tags
    pub tag_ids: Vec<Uuid>,
    /// Restrict to these statuses; `None` means any status
    pub status_ids: Option<Vec<Uuid>>,
    /// Case-insensitive match over title, excerpt and content
    pub search: Option<String>,
    pub ordering: PostOrdering,
    pub limit: i64,
    pub offset: i64,
}

impl Default for PostFilter {
    fn default() -> Self {
        Self {
            author_id: None,
            category_id: None,
            tag_ids: Vec::new(),
            status_ids: None,
            search: None,
            ordering: PostOrdering::default(),
            limit: DEFAULT_PAGE_SIZE,
            offset: 0,
        }
    }
}

impl PostFilter {
    /// Clamps pagination into the accepted window.
    pub fn normalized(mut self) -> Self {
        self.limit = self.limit.clamp(1, MAX_PAGE_SIZE);
        self.offset = self.offset.max(0);
        self
    }
}

/// Serde helper distinguishing an absent field from an explicit `null`.
mod double_option {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
    where
        T: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Some)
    }
}
