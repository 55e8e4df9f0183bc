//! Request and response bodies that only exist at the HTTP edge.

use domains::{ContentStatus, Post, ReportStatus, Role, StatusCatalog, TransitionTable};
use serde::{Deserialize, Serialize};

/// A post as returned to clients, with derived fields.
#[derive(Debug, Serialize)]
pub struct PostView {
    #[serde(flatten)]
    pub post: Post,
    pub status: String,
    pub is_visible: bool,
    pub reading_time: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub available_transitions: Vec<String>,
}

impl PostView {
    pub fn new(post: Post, catalog: &StatusCatalog, available_transitions: Vec<String>) -> Self {
        let status = catalog.by_id(post.status_id).map(|s| s.slug.clone()).unwrap_or_default();
        Self {
            is_visible: catalog.is_published(post.status_id),
            reading_time: post.reading_time(),
            status,
            post,
            available_transitions,
        }
    }

    pub fn list(posts: Vec<Post>, catalog: &StatusCatalog) -> Vec<Self> {
        posts.into_iter().map(|p| Self::new(p, catalog, Vec::new())).collect()
    }
}

#[derive(Debug, Deserialize)]
pub struct TransitionRequest {
    pub status: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ModerationRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReportFilter {
    pub status: Option<ReportStatus>,
}

#[derive(Debug, Deserialize)]
pub struct ReportReview {
    pub status: ReportStatus,
}

#[derive(Debug, Default, Deserialize)]
pub struct Page {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct RuleView {
    pub from: String,
    pub to: String,
    pub required: Role,
}

#[derive(Debug, Serialize)]
pub struct StatusesView {
    pub statuses: Vec<ContentStatus>,
    pub transitions: Vec<RuleView>,
}

impl StatusesView {
    pub fn new(catalog: &StatusCatalog, table: &TransitionTable) -> Self {
        Self {
            statuses: catalog.ordered().into_iter().cloned().collect(),
            transitions: table
                .rules()
                .map(|r| RuleView { from: r.from, to: r.to, required: r.required })
                .collect(),
        }
    }
}

/// Size of a deleted comment subtree.
#[derive(Debug, Serialize)]
pub struct Removed {
    pub removed: u64,
}
