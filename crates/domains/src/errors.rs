//! # DomainError
//!
//! Centralized error handling for the rusty-press core.
//! Every port and service returns this type; adapters map it to their own
//! surface (HTTP status codes, exit codes).

use thiserror::Error;
use validator::ValidationErrors;

/// The primary error type for all domain operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Resource not found (e.g., Post, Comment, Category)
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The `(current, target)` move is not in the transition table
    #[error("invalid transition from '{from}' to '{to}'")]
    InvalidTransition { from: String, to: String },

    /// Target status is missing from the catalog or no longer assignable
    #[error("unknown or inactive status '{0}'")]
    UnknownStatus(String),

    /// Actor lacks ownership or moderator privilege
    #[error("not authorized: {0}")]
    NotAuthorized(String),

    /// Input failed validation (e.g., empty title, cross-post reply)
    #[error("validation error: {0}")]
    Validation(String),

    /// Uniqueness violation or a concurrent write won the race
    #[error("conflict: {0}")]
    Conflict(String),

    /// Infrastructure failure (e.g., DB down)
    #[error("internal error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound { entity, id: id.to_string() }
    }

    /// Short machine-readable tag, used in API bodies and metric labels.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::UnknownStatus(_) => "unknown_status",
            Self::NotAuthorized(_) => "not_authorized",
            Self::Validation(_) => "validation",
            Self::Conflict(_) => "conflict",
            Self::Internal(_) => "internal",
        }
    }
}

/// Flattens derive-level field errors into one readable message.
///
/// Fields are sorted so the message is stable across runs.
impl From<ValidationErrors> for DomainError {
    fn from(errors: ValidationErrors) -> Self {
        let mut messages: Vec<String> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter()
                    .map(|e| match &e.message {
                        Some(message) => message.to_string(),
                        None => format!("{field} is invalid ({})", e.code),
                    })
                    .collect::<Vec<_>>()
            })
            .collect();
        messages.sort();
        messages.dedup();
        Self::Validation(messages.join("; "))
    }
}

/// A specialized Result type for domain logic.
pub type Result<T> = std::result::Result<T, DomainError>;
