//! rusty-press/crates/domains/src/lib.rs
//!
//! The central domain logic and interface definitions for rusty-press.

pub mod errors;
pub mod models;
pub mod ports;
pub mod status;
pub mod workflow;

// Re-exporting for easier access in other crates
pub use errors::*;
pub use models::*;
pub use ports::*;
pub use status::StatusCatalog;
pub use workflow::{role_on_post, TransitionRule, TransitionTable};
