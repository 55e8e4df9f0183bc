//! Categories and tags.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use domains::{Category, Tag};
use services::{NewCategory, NewTag};

use crate::dto::{Page, PostView};
use crate::error::ApiResult;
use crate::extract::AuthUser;
use crate::state::AppState;

pub async fn list_categories(State(state): State<AppState>) -> ApiResult<Json<Vec<Category>>> {
    Ok(Json(state.taxonomy.categories().await?))
}

pub async fn create_category(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Json(input): Json<NewCategory>,
) -> ApiResult<(StatusCode, Json<Category>)> {
    let category = state.taxonomy.create_category(&actor, input).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn get_category(State(state): State<AppState>, Path(slug): Path<String>) -> ApiResult<Json<Category>> {
    Ok(Json(state.taxonomy.category(&slug).await?))
}

pub async fn delete_category(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(slug): Path<String>,
) -> ApiResult<StatusCode> {
    state.taxonomy.delete_category(&actor, &slug).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn category_posts(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(page): Query<Page>,
) -> ApiResult<Json<Vec<PostView>>> {
    let posts = state.taxonomy.posts_in_category(&slug, page.limit, page.offset).await?;
    Ok(Json(PostView::list(posts, &state.publication.catalog())))
}

pub async fn list_tags(State(state): State<AppState>) -> ApiResult<Json<Vec<Tag>>> {
    Ok(Json(state.taxonomy.tags().await?))
}

pub async fn create_tag(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Json(input): Json<NewTag>,
) -> ApiResult<(StatusCode, Json<Tag>)> {
    let tag = state.taxonomy.create_tag(&actor, input).await?;
    Ok((StatusCode::CREATED, Json(tag)))
}

pub async fn get_tag(State(state): State<AppState>, Path(slug): Path<String>) -> ApiResult<Json<Tag>> {
    Ok(Json(state.taxonomy.tag(&slug).await?))
}

pub async fn delete_tag(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(slug): Path<String>,
) -> ApiResult<StatusCode> {
    state.taxonomy.delete_tag(&actor, &slug).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn tag_posts(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(page): Query<Page>,
) -> ApiResult<Json<Vec<PostView>>> {
    let posts = state.taxonomy.posts_with_tag(&slug, page.limit, page.offset).await?;
    Ok(Json(PostView::list(posts, &state.publication.catalog())))
}
