//! rusty-press/crates/storage-adapters/src/lib.rs
//!
//! Repository implementations for the domain ports.
//! The in-memory store is always compiled; PostgreSQL sits behind `db-postgres`.

pub mod memory;

#[cfg(feature = "db-postgres")]
pub mod postgres;

// Re-exporting for easier access in binaries
pub use memory::MemoryStore;

#[cfg(feature = "db-postgres")]
pub use postgres::PgStore;
