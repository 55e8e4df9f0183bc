use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use domains::User;
use services::{Credentials, Registration, Session};

use crate::error::ApiResult;
use crate::extract::AuthUser;
use crate::state::AppState;

pub async fn register(State(state): State<AppState>, Json(input): Json<Registration>) -> ApiResult<(StatusCode, Json<User>)> {
    let user = state.accounts.register(input).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn login(State(state): State<AppState>, Json(credentials): Json<Credentials>) -> ApiResult<Json<Session>> {
    Ok(Json(state.accounts.login(credentials).await?))
}

pub async fn me(State(state): State<AppState>, AuthUser(actor): AuthUser) -> ApiResult<Json<User>> {
    Ok(Json(state.accounts.profile(actor.id).await?))
}
