use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::{
    dto::{RecipesLimit, SubscriptionView, UserView},
    repo, services,
};
use crate::{
    auth::services::{AuthUser, MaybeAuthUser},
    error::ApiError,
    pagination::{Page, PageParams},
    state::AppState,
};

pub fn users_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/me", get(get_me))
        .route("/users/subscriptions", get(list_subscriptions))
        .route("/users/:id", get(get_user))
        .route(
            "/users/:id/subscribe",
            post(subscribe).delete(unsubscribe),
        )
}

#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
    MaybeAuthUser(viewer): MaybeAuthUser,
    Query(p): Query<PageParams>,
) -> Result<Json<Page<UserView>>, ApiError> {
    let (users, count) = repo::list(&state.db, viewer, p.limit(), p.offset()).await?;
    Ok(Json(Page::new(users, count, p)))
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    MaybeAuthUser(viewer): MaybeAuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<UserView>, ApiError> {
    repo::find(&state.db, viewer, id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("User"))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<UserView>, ApiError> {
    repo::find(&state.db, Some(user_id), user_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::Unauthorized("User not found".into()))
}

#[instrument(skip(state))]
pub async fn list_subscriptions(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(p): Query<PageParams>,
    Query(l): Query<RecipesLimit>,
) -> Result<Json<Page<SubscriptionView>>, ApiError> {
    Ok(Json(
        services::subscriptions(&state.db, user_id, p, l.recipes_limit).await?,
    ))
}

#[instrument(skip(state))]
pub async fn subscribe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Query(l): Query<RecipesLimit>,
) -> Result<(StatusCode, Json<SubscriptionView>), ApiError> {
    let view = services::subscribe(&state.db, user_id, id, l.recipes_limit).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

#[instrument(skip(state))]
pub async fn unsubscribe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    services::unsubscribe(&state.db, user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
