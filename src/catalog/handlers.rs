use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use tracing::instrument;

use super::repo_types::{Ingredient, Tag};
use crate::{error::ApiError, state::AppState};

pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/tags", get(list_tags))
        .route("/tags/:id", get(get_tag))
        .route("/ingredients", get(list_ingredients))
        .route("/ingredients/:id", get(get_ingredient))
}

#[derive(Debug, Deserialize)]
pub struct IngredientQuery {
    pub name: Option<String>,
}

#[instrument(skip(state))]
pub async fn list_tags(State(state): State<AppState>) -> Result<Json<Vec<Tag>>, ApiError> {
    Ok(Json(Tag::list(&state.db).await?))
}

#[instrument(skip(state))]
pub async fn get_tag(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Tag>, ApiError> {
    Tag::find(&state.db, id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("Tag"))
}

#[instrument(skip(state))]
pub async fn list_ingredients(
    State(state): State<AppState>,
    Query(q): Query<IngredientQuery>,
) -> Result<Json<Vec<Ingredient>>, ApiError> {
    let prefix = q.name.as_deref().map(str::trim).filter(|s| !s.is_empty());
    Ok(Json(Ingredient::search(&state.db, prefix).await?))
}

#[instrument(skip(state))]
pub async fn get_ingredient(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Ingredient>, ApiError> {
    Ingredient::find(&state.db, id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("Ingredient"))
}
