//! Comment threads and moderation.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use domains::{Comment, CommentEdit, CommentNode, CommentReport, ModerationAction, NewComment, NewReport};
use uuid::Uuid;

use crate::dto::{ModerationRequest, Removed, ReportFilter, ReportReview};
use crate::error::ApiResult;
use crate::extract::{AuthUser, MaybeAuth};
use crate::state::AppState;

pub async fn thread(
    State(state): State<AppState>,
    MaybeAuth(viewer): MaybeAuth,
    Path(slug): Path<String>,
) -> ApiResult<Json<Vec<CommentNode>>> {
    let post = state.posts.get_by_slug(&slug, viewer.as_ref()).await?;
    Ok(Json(state.moderation.public_thread(post.id).await?))
}

pub async fn add(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(slug): Path<String>,
    Json(input): Json<NewComment>,
) -> ApiResult<(StatusCode, Json<Comment>)> {
    let post = state.posts.get_by_slug(&slug, None).await?;
    let comment = state.moderation.add_comment(post.id, &actor, input).await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

pub async fn mine(State(state): State<AppState>, AuthUser(actor): AuthUser) -> ApiResult<Json<Vec<Comment>>> {
    Ok(Json(state.moderation.comments_by(actor.id).await?))
}

pub async fn pending(State(state): State<AppState>, AuthUser(actor): AuthUser) -> ApiResult<Json<Vec<Comment>>> {
    Ok(Json(state.moderation.pending(&actor).await?))
}

pub async fn edit(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<CommentEdit>,
) -> ApiResult<Json<Comment>> {
    Ok(Json(state.moderation.edit_comment(id, &actor, body).await?))
}

/// The author withdraws a comment and its replies.
pub async fn delete(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Removed>> {
    let removed = state.moderation.delete_comment(id, &actor).await?;
    Ok(Json(Removed { removed }))
}

pub async fn replies(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<Vec<Comment>>> {
    Ok(Json(state.moderation.replies(id).await?))
}

pub async fn approve(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(id): Path<Uuid>,
    Query(body): Query<ModerationRequest>,
) -> ApiResult<Json<Comment>> {
    let comment = state.moderation.approve(id, &actor, body.reason).await?;
    state.metrics.record_moderation("approved");
    Ok(Json(comment))
}

pub async fn reject(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(id): Path<Uuid>,
    Query(body): Query<ModerationRequest>,
) -> ApiResult<Json<Removed>> {
    let removed = state.moderation.reject(id, &actor, body.reason).await?;
    state.metrics.record_moderation("rejected");
    Ok(Json(Removed { removed }))
}

pub async fn flag(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(id): Path<Uuid>,
    Query(body): Query<ModerationRequest>,
) -> ApiResult<Json<Comment>> {
    let comment = state.moderation.flag(id, &actor, body.reason).await?;
    state.metrics.record_moderation("flagged");
    Ok(Json(comment))
}

pub async fn spam(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(id): Path<Uuid>,
    Query(body): Query<ModerationRequest>,
) -> ApiResult<Json<Removed>> {
    let removed = state.moderation.mark_spam(id, &actor, body.reason).await?;
    state.metrics.record_moderation("spam");
    Ok(Json(Removed { removed }))
}

pub async fn report(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(id): Path<Uuid>,
    Json(input): Json<NewReport>,
) -> ApiResult<(StatusCode, Json<CommentReport>)> {
    let report = state.moderation.report(id, &actor, input).await?;
    Ok((StatusCode::CREATED, Json(report)))
}

pub async fn reports(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Query(filter): Query<ReportFilter>,
) -> ApiResult<Json<Vec<CommentReport>>> {
    Ok(Json(state.moderation.reports(&actor, filter.status).await?))
}

pub async fn review(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<ReportReview>,
) -> ApiResult<Json<CommentReport>> {
    Ok(Json(state.moderation.review_report(id, &actor, body.status).await?))
}

pub async fn history(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<ModerationAction>>> {
    Ok(Json(state.moderation.history(id, &actor).await?))
}
