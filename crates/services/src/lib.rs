//! rusty-press/crates/services/src/lib.rs
//!
//! Application services. Each one orchestrates domain ports and owns the
//! authorization decisions for its slice of the API.

pub mod accounts;
pub mod catalog;
pub mod moderation;
pub mod posts;
pub mod publication;
pub mod taxonomy;
pub mod utils;

// Re-exporting for easier access in adapters and binaries
pub use accounts::{AccountService, Credentials, Registration, Session};
pub use catalog::{bootstrap, CatalogHandle};
pub use moderation::{approved_tree, ModerationService};
pub use posts::{PostQuery, PostService};
pub use publication::PublicationService;
pub use taxonomy::{NewCategory, NewTag, TaxonomyService};
