use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::{
    dto::{RecipeDetails, RecipePayload},
    filters::RecipeFilter,
    repo::RecipeList,
    repo_types::RecipeShort,
    services,
    shopping_list::{ShoppingList, FILENAME},
};
use crate::{
    auth::services::{AuthUser, MaybeAuthUser},
    error::ApiError,
    pagination::Page,
    state::AppState,
};

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/recipes", get(list_recipes))
        .route("/recipes/:id", get(get_recipe))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/recipes", post(create_recipe))
        .route("/recipes/:id", patch(update_recipe).delete(delete_recipe))
        .route(
            "/recipes/:id/favorite",
            post(add_favorite).delete(remove_favorite),
        )
        .route(
            "/recipes/:id/shopping_cart",
            post(add_to_cart).delete(remove_from_cart),
        )
        .route(
            "/recipes/download_shopping_cart",
            get(download_shopping_cart),
        )
}

#[instrument(skip(state))]
pub async fn list_recipes(
    State(state): State<AppState>,
    MaybeAuthUser(viewer): MaybeAuthUser,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<Page<RecipeDetails>>, ApiError> {
    let filter = RecipeFilter::from_pairs(pairs)?;
    Ok(Json(services::list_recipes(&state.db, viewer, filter).await?))
}

#[instrument(skip(state))]
pub async fn get_recipe(
    State(state): State<AppState>,
    MaybeAuthUser(viewer): MaybeAuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<RecipeDetails>, ApiError> {
    Ok(Json(services::get_recipe(&state.db, viewer, id).await?))
}

#[instrument(skip(state, payload))]
pub async fn create_recipe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<RecipePayload>,
) -> Result<(StatusCode, HeaderMap, Json<RecipeDetails>), ApiError> {
    let recipe = services::create_recipe(&state.db, user_id, payload).await?;

    let mut headers = HeaderMap::new();
    if let Ok(location) = format!("/api/recipes/{}", recipe.id).parse() {
        headers.insert(header::LOCATION, location);
    }
    Ok((StatusCode::CREATED, headers, Json(recipe)))
}

#[instrument(skip(state, payload))]
pub async fn update_recipe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<RecipePayload>,
) -> Result<Json<RecipeDetails>, ApiError> {
    Ok(Json(
        services::update_recipe(&state.db, user_id, id, payload).await?,
    ))
}

#[instrument(skip(state))]
pub async fn delete_recipe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    services::delete_recipe(&state.db, user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn add(
    state: &AppState,
    list: RecipeList,
    user_id: Uuid,
    id: Uuid,
) -> Result<(StatusCode, Json<RecipeShort>), ApiError> {
    let recipe = services::add_to_list(&state.db, list, user_id, id).await?;
    Ok((StatusCode::CREATED, Json(recipe)))
}

async fn remove(
    state: &AppState,
    list: RecipeList,
    user_id: Uuid,
    id: Uuid,
) -> Result<StatusCode, ApiError> {
    services::remove_from_list(&state.db, list, user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn add_favorite(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<RecipeShort>), ApiError> {
    add(&state, RecipeList::Favorites, user_id, id).await
}

#[instrument(skip(state))]
pub async fn remove_favorite(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    remove(&state, RecipeList::Favorites, user_id, id).await
}

#[instrument(skip(state))]
pub async fn add_to_cart(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<RecipeShort>), ApiError> {
    add(&state, RecipeList::ShoppingCart, user_id, id).await
}

#[instrument(skip(state))]
pub async fn remove_from_cart(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    remove(&state, RecipeList::ShoppingCart, user_id, id).await
}

/// Plain-text attachment with the aggregated shopping list.
fn attachment(list: &ShoppingList) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{FILENAME}\""),
            ),
        ],
        list.render(),
    )
        .into_response()
}

#[instrument(skip(state))]
pub async fn download_shopping_cart(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Response, ApiError> {
    let list = services::shopping_list(&state.db, user_id).await?;
    Ok(attachment(&list))
}
