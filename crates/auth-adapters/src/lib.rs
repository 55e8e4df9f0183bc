//! rusty-press/crates/auth-adapters/src/lib.rs
//!
//! Implementations of the `PasswordHasher` and `TokenService` ports.

pub mod password;

#[cfg(feature = "auth-jwt")]
pub mod jwt;

// Re-exporting for easier access in binaries
pub use password::Argon2PasswordHasher;

#[cfg(feature = "auth-jwt")]
pub use jwt::JwtTokenService;
