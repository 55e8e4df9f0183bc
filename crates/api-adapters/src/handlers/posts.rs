//! `/api/posts` handlers.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use domains::{Actor, NewPost, Post, PostUpdate};
use services::PostQuery;
use tracing::info;

use crate::dto::{Page, PostView, SearchQuery, TransitionRequest};
use crate::error::ApiResult;
use crate::extract::{AuthUser, MaybeAuth};
use crate::metrics::UNKNOWN_TARGET;
use crate::state::AppState;

const SHOWCASE_SIZE: i64 = 5;

fn detail(state: &AppState, post: Post, viewer: Option<&Actor>) -> PostView {
    let transitions = viewer.map(|actor| state.publication.available_transitions(&post, actor)).unwrap_or_default();
    PostView::new(post, &state.publication.catalog(), transitions)
}

fn listing(state: &AppState, posts: Vec<Post>) -> Json<Vec<PostView>> {
    Json(PostView::list(posts, &state.publication.catalog()))
}

pub async fn list(
    State(state): State<AppState>,
    MaybeAuth(viewer): MaybeAuth,
    Query(query): Query<PostQuery>,
) -> ApiResult<Json<Vec<PostView>>> {
    let posts = state.posts.list(query, viewer.as_ref()).await?;
    Ok(listing(&state, posts))
}

pub async fn create(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Json(input): Json<NewPost>,
) -> ApiResult<(StatusCode, Json<PostView>)> {
    let post = state.posts.create(&actor, input).await?;
    Ok((StatusCode::CREATED, Json(detail(&state, post, Some(&actor)))))
}

pub async fn search(State(state): State<AppState>, Query(query): Query<SearchQuery>) -> ApiResult<Json<Vec<PostView>>> {
    let posts = state.posts.search(&query.q, query.limit, query.offset).await?;
    Ok(listing(&state, posts))
}

pub async fn mine(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Query(page): Query<Page>,
) -> ApiResult<Json<Vec<PostView>>> {
    let posts = state.posts.my_posts(&actor, page.limit, page.offset).await?;
    Ok(listing(&state, posts))
}

pub async fn drafts(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Query(page): Query<Page>,
) -> ApiResult<Json<Vec<PostView>>> {
    let posts = state.publication.drafts_for(actor.id, page.limit, page.offset).await?;
    Ok(listing(&state, posts))
}

pub async fn featured(State(state): State<AppState>) -> ApiResult<Json<Vec<PostView>>> {
    let posts = state.posts.featured(SHOWCASE_SIZE).await?;
    Ok(listing(&state, posts))
}

pub async fn popular(State(state): State<AppState>) -> ApiResult<Json<Vec<PostView>>> {
    let posts = state.posts.popular(SHOWCASE_SIZE).await?;
    Ok(listing(&state, posts))
}

pub async fn get(
    State(state): State<AppState>,
    MaybeAuth(viewer): MaybeAuth,
    Path(slug): Path<String>,
) -> ApiResult<Json<PostView>> {
    let post = state.posts.get_by_slug(&slug, viewer.as_ref()).await?;
    Ok(Json(detail(&state, post, viewer.as_ref())))
}

pub async fn update(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(slug): Path<String>,
    Json(changes): Json<PostUpdate>,
) -> ApiResult<Json<PostView>> {
    let post = state.posts.update(&slug, &actor, changes).await?;
    Ok(Json(detail(&state, post, Some(&actor))))
}

pub async fn delete(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(slug): Path<String>,
) -> ApiResult<StatusCode> {
    state.posts.delete(&slug, &actor).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn move_to(state: &AppState, actor: &Actor, slug: &str, target: &str) -> ApiResult<Json<PostView>> {
    let post = state.posts.get_by_slug(slug, Some(actor)).await?;
    let result = state.publication.transition(post.id, target, actor).await;
    let outcome = match &result {
        Ok(_) => "ok",
        Err(err) => err.kind(),
    };
    let catalog = state.publication.catalog();
    let label = catalog.get(target).map_or(UNKNOWN_TARGET, |s| s.slug.as_str());
    state.metrics.record_transition(label, outcome);

    let post = result?;
    info!(slug = %post.slug, status = %target, "transition served");
    Ok(Json(detail(state, post, Some(actor))))
}

pub async fn transition(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(slug): Path<String>,
    Json(body): Json<TransitionRequest>,
) -> ApiResult<Json<PostView>> {
    move_to(&state, &actor, &slug, &body.status).await
}

pub async fn publish(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(slug): Path<String>,
) -> ApiResult<Json<PostView>> {
    move_to(&state, &actor, &slug, domains::status::PUBLISHED).await
}
