//! HTTP mapping of domain errors.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use domains::DomainError;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Missing, malformed or expired bearer token
    #[error("{0}")]
    Unauthorized(&'static str),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Domain(err) => match err {
                DomainError::NotFound { .. } => StatusCode::NOT_FOUND,
                DomainError::Validation(_) => StatusCode::BAD_REQUEST,
                DomainError::InvalidTransition { .. } | DomainError::Conflict(_) => StatusCode::CONFLICT,
                DomainError::UnknownStatus(_) => StatusCode::UNPROCESSABLE_ENTITY,
                DomainError::NotAuthorized(_) => StatusCode::FORBIDDEN,
                DomainError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Unauthorized(_) => "unauthorized",
            ApiError::Domain(err) => err.kind(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ApiError::Domain(DomainError::Internal(detail)) => {
                tracing::error!(error = %detail, "internal error");
                "internal server error".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(json!({ "error": self.kind(), "message": message }))).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_errors_map_to_status_codes() {
        let cases = [
            (DomainError::not_found("post", "x"), StatusCode::NOT_FOUND),
            (DomainError::Validation("bad".into()), StatusCode::BAD_REQUEST),
            (DomainError::InvalidTransition { from: "trash".into(), to: "featured".into() }, StatusCode::CONFLICT),
            (DomainError::Conflict("race".into()), StatusCode::CONFLICT),
            (DomainError::UnknownStatus("bogus".into()), StatusCode::UNPROCESSABLE_ENTITY),
            (DomainError::NotAuthorized("no".into()), StatusCode::FORBIDDEN),
            (DomainError::Internal("db".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
        assert_eq!(ApiError::Unauthorized("missing token").status(), StatusCode::UNAUTHORIZED);
    }
}
