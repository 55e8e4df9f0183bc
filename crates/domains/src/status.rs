//! # Status Catalog
//!
//! The set of `ContentStatus` rows is reference data: loaded once from the
//! status repository and swapped wholesale when an administrator edits it.
//! Every `is_published` / ordering decision goes through this table.

use std::collections::HashMap;

use uuid::Uuid;

use crate::errors::{DomainError, Result};
use crate::models::ContentStatus;

pub const DRAFT: &str = "draft";
pub const PENDING: &str = "pending";
pub const REVIEW: &str = "review";
pub const SCHEDULED: &str = "scheduled";
pub const PUBLISHED: &str = "published";
pub const FEATURED: &str = "featured";
pub const PRIVATE: &str = "private";
pub const REJECTED: &str = "rejected";
pub const ARCHIVED: &str = "archived";
pub const TRASH: &str = "trash";

/// Immutable snapshot of every known status, indexed by slug and id.
#[derive(Debug, Clone, Default)]
pub struct StatusCatalog {
    by_slug: HashMap<String, ContentStatus>,
    slug_by_id: HashMap<Uuid, String>,
}

impl StatusCatalog {
    pub fn new(statuses: impl IntoIterator<Item = ContentStatus>) -> Self {
        let mut catalog = Self::default();
        for status in statuses {
            catalog.slug_by_id.insert(status.id, status.slug.clone());
            catalog.by_slug.insert(status.slug.clone(), status);
        }
        catalog
    }

    /// The ten standard workflow statuses.
    pub fn defaults() -> Vec<ContentStatus> {
        let rows: [(&str, &str, &str, &str, &str, bool); 10] = [
            ("Draft", DRAFT, "Work in progress, visible to the author only", "pencil", "#6b7280", false),
            ("Pending", PENDING, "Waiting to be picked up for publication", "clock", "#f59e0b", false),
            ("Under Review", REVIEW, "Under editorial review", "eye", "#3b82f6", false),
            ("Scheduled", SCHEDULED, "Queued for future publication", "calendar", "#8b5cf6", false),
            ("Published", PUBLISHED, "Publicly visible", "globe", "#16a34a", true),
            ("Featured", FEATURED, "Publicly visible and promoted", "star", "#eab308", true),
            ("Private", PRIVATE, "Visible to the author only", "lock", "#475569", false),
            ("Rejected", REJECTED, "Declined during review", "x-circle", "#dc2626", false),
            ("Archived", ARCHIVED, "Retired from circulation, kept for history", "archive", "#78716c", false),
            ("Trash", TRASH, "Soft-deleted", "trash", "#991b1b", false),
        ];

        rows.iter()
            .enumerate()
            .map(|(idx, (name, slug, description, icon, color, is_published))| ContentStatus {
                id: Uuid::now_v7(),
                name: (*name).to_string(),
                slug: (*slug).to_string(),
                description: (*description).to_string(),
                icon: (*icon).to_string(),
                color: (*color).to_string(),
                is_published: *is_published,
                is_active: true,
                sort_order: idx as i32 + 1,
            })
            .collect()
    }

    pub fn get(&self, slug: &str) -> Option<&ContentStatus> {
        self.by_slug.get(slug)
    }

    pub fn by_id(&self, id: Uuid) -> Option<&ContentStatus> {
        self.slug_by_id.get(&id).and_then(|slug| self.by_slug.get(slug))
    }

    /// Resolves a slug that may be assigned to a post right now.
    pub fn assignable(&self, slug: &str) -> Result<&ContentStatus> {
        match self.by_slug.get(slug) {
            Some(status) if status.is_active => Ok(status),
            _ => Err(DomainError::UnknownStatus(slug.to_string())),
        }
    }

    /// Resolves the status a post currently holds. A dangling id means the
    /// catalog and the store disagree, which is an infrastructure fault.
    pub fn current(&self, id: Uuid) -> Result<&ContentStatus> {
        self.by_id(id)
            .ok_or_else(|| DomainError::Internal(format!("post references unknown status id {id}")))
    }

    pub fn is_published(&self, id: Uuid) -> bool {
        self.by_id(id).map(|s| s.is_published).unwrap_or(false)
    }

    pub fn published_ids(&self) -> Vec<Uuid> {
        self.by_slug.values().filter(|s| s.is_published).map(|s| s.id).collect()
    }

    pub fn ids_for(&self, slugs: &[&str]) -> Vec<Uuid> {
        slugs.iter().filter_map(|slug| self.by_slug.get(*slug)).map(|s| s.id).collect()
    }

    /// Statuses in administrative display order.
    pub fn ordered(&self) -> Vec<&ContentStatus> {
        let mut statuses: Vec<_> = self.by_slug.values().collect();
        statuses.sort_by(|a, b| a.sort_order.cmp(&b.sort_order).then_with(|| a.name.cmp(&b.name)));
        statuses
    }

    pub fn len(&self) -> usize {
        self.by_slug.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_slug.is_empty()
    }
}
