use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use domains::{ContentStatus, DomainError, NewStatus, StatusUpdate};
use serde_json::{json, Value};

use crate::dto::StatusesView;
use crate::error::ApiResult;
use crate::extract::AuthUser;
use crate::state::AppState;

pub async fn list(State(state): State<AppState>) -> Json<StatusesView> {
    Json(StatusesView::new(&state.publication.catalog(), state.publication.table()))
}

/// Moderators only. Picks up edits made to the status table out of band.
pub async fn reload(State(state): State<AppState>, AuthUser(actor): AuthUser) -> ApiResult<Json<Value>> {
    if !actor.is_moderator() {
        return Err(DomainError::NotAuthorized("moderator privilege required".into()).into());
    }
    let count = state.publication.reload_catalog().await?;
    Ok(Json(json!({ "statuses": count })))
}

pub async fn create(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Json(input): Json<NewStatus>,
) -> ApiResult<(StatusCode, Json<ContentStatus>)> {
    let status = state.publication.create_status(&actor, input).await?;
    Ok((StatusCode::CREATED, Json(status)))
}

pub async fn update(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(slug): Path<String>,
    Json(changes): Json<StatusUpdate>,
) -> ApiResult<Json<ContentStatus>> {
    Ok(Json(state.publication.update_status(&actor, &slug, changes).await?))
}
