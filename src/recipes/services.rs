use sqlx::PgPool;
use tracing::{debug, info};
use uuid::Uuid;

use super::{
    dto::{assemble, RecipeDetails, RecipePayload},
    filters::RecipeFilter,
    repo::{self, RecipeList},
    repo_types::{RecipeRow, RecipeShort},
    shopping_list::{aggregate, ShoppingList},
    validation::{validate, ValidRecipe},
};
use crate::{
    catalog::repo_types::{Ingredient, Tag},
    error::{is_foreign_key_violation, ApiError},
    pagination::Page,
};

async fn with_children(db: &PgPool, rows: Vec<RecipeRow>) -> anyhow::Result<Vec<RecipeDetails>> {
    let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let tags = repo::tags_for(db, &ids).await?;
    let lines = repo::lines_for(db, &ids).await?;
    Ok(assemble(rows, tags, lines))
}

pub async fn list_recipes(
    db: &PgPool,
    viewer: Option<Uuid>,
    filter: RecipeFilter,
) -> Result<Page<RecipeDetails>, ApiError> {
    let filter = filter.for_viewer(viewer);
    let (rows, count) = repo::list(db, viewer, &filter).await?;
    let results = with_children(db, rows).await?;
    Ok(Page::new(results, count, filter.page_params()))
}

pub async fn get_recipe(
    db: &PgPool,
    viewer: Option<Uuid>,
    recipe_id: Uuid,
) -> Result<RecipeDetails, ApiError> {
    let row = repo::find(db, viewer, recipe_id)
        .await?
        .ok_or(ApiError::NotFound("Recipe"))?;
    with_children(db, vec![row])
        .await?
        .pop()
        .ok_or(ApiError::NotFound("Recipe"))
}

/// Validates the payload, then checks that every referenced tag and ingredient exists.
async fn validate_with_references(
    db: &PgPool,
    payload: RecipePayload,
) -> Result<ValidRecipe, ApiError> {
    let recipe = validate(payload)?;

    let ingredient_ids: Vec<i64> = recipe.ingredients.iter().map(|l| l.id).collect();
    let mut errors: Vec<String> = Ingredient::missing_ids(db, &ingredient_ids)
        .await?
        .into_iter()
        .map(|id| format!("Ingredient {id} does not exist."))
        .collect();
    errors.extend(
        Tag::missing_ids(db, &recipe.tags)
            .await?
            .into_iter()
            .map(|id| format!("Tag {id} does not exist.")),
    );
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }
    Ok(recipe)
}

pub async fn create_recipe(
    db: &PgPool,
    author_id: Uuid,
    payload: RecipePayload,
) -> Result<RecipeDetails, ApiError> {
    let recipe = validate_with_references(db, payload).await?;
    let recipe_id = repo::insert(db, author_id, &recipe).await?;
    info!(%recipe_id, %author_id, lines = recipe.ingredients.len(), "recipe created");
    get_recipe(db, Some(author_id), recipe_id).await
}

async fn ensure_author(db: &PgPool, user_id: Uuid, recipe_id: Uuid) -> Result<(), ApiError> {
    match repo::author_of(db, recipe_id).await? {
        None => Err(ApiError::NotFound("Recipe")),
        Some(author) if author != user_id => Err(ApiError::Forbidden),
        Some(_) => Ok(()),
    }
}

pub async fn update_recipe(
    db: &PgPool,
    user_id: Uuid,
    recipe_id: Uuid,
    payload: RecipePayload,
) -> Result<RecipeDetails, ApiError> {
    ensure_author(db, user_id, recipe_id).await?;
    let recipe = validate_with_references(db, payload).await?;
    repo::update(db, recipe_id, &recipe).await?;
    info!(%recipe_id, "recipe updated");
    get_recipe(db, Some(user_id), recipe_id).await
}

pub async fn delete_recipe(db: &PgPool, user_id: Uuid, recipe_id: Uuid) -> Result<(), ApiError> {
    ensure_author(db, user_id, recipe_id).await?;
    repo::delete(db, recipe_id).await?;
    info!(%recipe_id, "recipe deleted");
    Ok(())
}

/// A recipe deleted between lookup and insert breaks the foreign key.
fn list_insert_error(e: sqlx::Error) -> ApiError {
    if is_foreign_key_violation(&e) {
        ApiError::NotFound("Recipe")
    } else {
        e.into()
    }
}

pub async fn add_to_list(
    db: &PgPool,
    list: RecipeList,
    user_id: Uuid,
    recipe_id: Uuid,
) -> Result<RecipeShort, ApiError> {
    let recipe = repo::find_short(db, recipe_id)
        .await?
        .ok_or(ApiError::NotFound("Recipe"))?;
    let added = repo::add_to_list(db, list, user_id, recipe_id)
        .await
        .map_err(list_insert_error)?;
    if !added {
        return Err(ApiError::AlreadyInList(list.label()));
    }
    debug!(%user_id, %recipe_id, list = list.label(), "recipe added");
    Ok(recipe)
}

pub async fn remove_from_list(
    db: &PgPool,
    list: RecipeList,
    user_id: Uuid,
    recipe_id: Uuid,
) -> Result<(), ApiError> {
    if repo::find_short(db, recipe_id).await?.is_none() {
        return Err(ApiError::NotFound("Recipe"));
    }
    if !repo::remove_from_list(db, list, user_id, recipe_id).await? {
        return Err(ApiError::NotInList(list.label()));
    }
    debug!(%user_id, %recipe_id, list = list.label(), "recipe removed");
    Ok(())
}

pub async fn shopping_list(db: &PgPool, user_id: Uuid) -> Result<ShoppingList, ApiError> {
    let lines = repo::cart_lines(db, user_id).await?;
    let list = aggregate(lines);
    debug!(%user_id, items = list.items().len(), "shopping list built");
    Ok(list)
}
