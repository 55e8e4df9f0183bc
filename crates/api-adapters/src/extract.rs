//! Bearer-token extractors.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use domains::Actor;

use crate::error::ApiError;
use crate::state::AppState;

fn bearer(parts: &Parts) -> Result<Option<&str>, ApiError> {
    let Some(value) = parts.headers.get(AUTHORIZATION) else {
        return Ok(None);
    };
    let value = value.to_str().map_err(|_| ApiError::Unauthorized("malformed authorization header"))?;
    value
        .strip_prefix("Bearer ")
        .map(Some)
        .ok_or(ApiError::Unauthorized("expected a bearer token"))
}

fn actor(state: &AppState, token: &str) -> Result<Actor, ApiError> {
    let claims = state
        .tokens
        .verify(token)
        .map_err(|_| ApiError::Unauthorized("invalid or expired token"))?;
    Ok(Actor::new(claims.user_id, claims.role))
}

/// Rejects the request with 401 unless a valid token is present.
pub struct AuthUser(pub Actor);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer(parts)?.ok_or(ApiError::Unauthorized("missing bearer token"))?;
        actor(state, token).map(AuthUser)
    }
}

/// Anonymous callers pass through; a token that is present must still be valid.
pub struct MaybeAuth(pub Option<Actor>);

impl FromRequestParts<AppState> for MaybeAuth {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match bearer(parts)? {
            Some(token) => actor(state, token).map(|a| MaybeAuth(Some(a))),
            None => Ok(MaybeAuth(None)),
        }
    }
}
