use anyhow::Context;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::{
    filters::RecipeFilter,
    repo_types::{CartLine, IngredientLineRow, RecipeRow, RecipeShort, RecipeTagRow},
    validation::ValidRecipe,
};

/// `$1` is always the viewer id (NULL for anonymous).
const RECIPE_SELECT: &str = r#"
    SELECT r.id, r.author_id, r.name, r.image, r.text, r.cooking_time, r.created_at,
           u.email AS author_email,
           u.username AS author_username,
           u.first_name AS author_first_name,
           u.last_name AS author_last_name,
           EXISTS (SELECT 1 FROM subscriptions s
                    WHERE s.user_id = $1 AND s.author_id = r.author_id) AS author_is_subscribed,
           EXISTS (SELECT 1 FROM favorites f
                    WHERE f.user_id = $1 AND f.recipe_id = r.id) AS is_favorited,
           EXISTS (SELECT 1 FROM shopping_cart c
                    WHERE c.user_id = $1 AND c.recipe_id = r.id) AS is_in_shopping_cart
      FROM recipes r
      JOIN users u ON u.id = r.author_id
"#;

const FILTER_WHERE: &str = r#"
     WHERE ($2::uuid IS NULL OR r.author_id = $2)
       AND (cardinality($3::text[]) = 0 OR EXISTS (
                SELECT 1 FROM recipe_tags rt JOIN tags t ON t.id = rt.tag_id
                 WHERE rt.recipe_id = r.id AND t.slug = ANY($3)))
       AND (NOT $4::boolean OR EXISTS (
                SELECT 1 FROM favorites f WHERE f.recipe_id = r.id AND f.user_id = $1))
       AND (NOT $5::boolean OR EXISTS (
                SELECT 1 FROM shopping_cart c WHERE c.recipe_id = r.id AND c.user_id = $1))
"#;

/// The two per-user recipe lists. Both are plain (user, recipe) join rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecipeList {
    Favorites,
    ShoppingCart,
}

impl RecipeList {
    fn table(self) -> &'static str {
        match self {
            RecipeList::Favorites => "favorites",
            RecipeList::ShoppingCart => "shopping_cart",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RecipeList::Favorites => "favorites",
            RecipeList::ShoppingCart => "shopping cart",
        }
    }
}

pub async fn list(
    db: &PgPool,
    viewer: Option<Uuid>,
    filter: &RecipeFilter,
) -> anyhow::Result<(Vec<RecipeRow>, i64)> {
    let page = filter.page_params();

    let rows = sqlx::query_as::<_, RecipeRow>(&format!(
        "{RECIPE_SELECT} {FILTER_WHERE} ORDER BY r.created_at DESC, r.id LIMIT $6 OFFSET $7"
    ))
    .bind(viewer)
    .bind(filter.author)
    .bind(&filter.tags)
    .bind(filter.is_favorited)
    .bind(filter.is_in_shopping_cart)
    .bind(page.limit())
    .bind(page.offset())
    .fetch_all(db)
    .await
    .context("list recipes")?;

    let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM recipes r {FILTER_WHERE}"))
        .bind(viewer)
        .bind(filter.author)
        .bind(&filter.tags)
        .bind(filter.is_favorited)
        .bind(filter.is_in_shopping_cart)
        .fetch_one(db)
        .await
        .context("count recipes")?;

    Ok((rows, count))
}

pub async fn find(
    db: &PgPool,
    viewer: Option<Uuid>,
    recipe_id: Uuid,
) -> anyhow::Result<Option<RecipeRow>> {
    let row = sqlx::query_as::<_, RecipeRow>(&format!("{RECIPE_SELECT} WHERE r.id = $2"))
        .bind(viewer)
        .bind(recipe_id)
        .fetch_optional(db)
        .await
        .context("find recipe")?;
    Ok(row)
}

pub async fn author_of(db: &PgPool, recipe_id: Uuid) -> anyhow::Result<Option<Uuid>> {
    let author: Option<Uuid> = sqlx::query_scalar(r#"SELECT author_id FROM recipes WHERE id = $1"#)
        .bind(recipe_id)
        .fetch_optional(db)
        .await?;
    Ok(author)
}

pub async fn tags_for(db: &PgPool, recipe_ids: &[Uuid]) -> anyhow::Result<Vec<RecipeTagRow>> {
    let rows = sqlx::query_as::<_, RecipeTagRow>(
        r#"
        SELECT rt.recipe_id, t.id, t.name, t.color, t.slug
          FROM recipe_tags rt
          JOIN tags t ON t.id = rt.tag_id
         WHERE rt.recipe_id = ANY($1)
         ORDER BY rt.recipe_id, rt.position
        "#,
    )
    .bind(recipe_ids)
    .fetch_all(db)
    .await
    .context("load recipe tags")?;
    Ok(rows)
}

pub async fn lines_for(
    db: &PgPool,
    recipe_ids: &[Uuid],
) -> anyhow::Result<Vec<IngredientLineRow>> {
    let rows = sqlx::query_as::<_, IngredientLineRow>(
        r#"
        SELECT ri.recipe_id, i.id, i.name, i.measurement_unit, ri.amount
          FROM recipe_ingredients ri
          JOIN ingredients i ON i.id = ri.ingredient_id
         WHERE ri.recipe_id = ANY($1)
         ORDER BY ri.id
        "#,
    )
    .bind(recipe_ids)
    .fetch_all(db)
    .await
    .context("load recipe ingredients")?;
    Ok(rows)
}

async fn insert_children_tx(
    tx: &mut Transaction<'_, Postgres>,
    recipe_id: Uuid,
    recipe: &ValidRecipe,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO recipe_tags (recipe_id, tag_id, position)
        SELECT $1, t.id, t.ord::int
          FROM UNNEST($2::bigint[]) WITH ORDINALITY AS t(id, ord)
        "#,
    )
    .bind(recipe_id)
    .bind(&recipe.tags)
    .execute(&mut **tx)
    .await
    .context("insert recipe tags")?;

    let (ids, amounts): (Vec<i64>, Vec<i32>) =
        recipe.ingredients.iter().map(|l| (l.id, l.amount)).unzip();
    sqlx::query(
        r#"
        INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount)
        SELECT $1, l.ingredient_id, l.amount
          FROM UNNEST($2::bigint[], $3::int[]) WITH ORDINALITY AS l(ingredient_id, amount, ord)
         ORDER BY l.ord
        "#,
    )
    .bind(recipe_id)
    .bind(&ids)
    .bind(&amounts)
    .execute(&mut **tx)
    .await
    .context("insert recipe ingredients")?;

    Ok(())
}

/// Inserts the recipe with its tags and ingredient lines in one transaction.
pub async fn insert(db: &PgPool, author_id: Uuid, recipe: &ValidRecipe) -> anyhow::Result<Uuid> {
    let mut tx = db.begin().await.context("begin tx")?;

    let recipe_id: Uuid = sqlx::query_scalar(
        r#"
        INSERT INTO recipes (author_id, name, image, text, cooking_time)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
        "#,
    )
    .bind(author_id)
    .bind(&recipe.name)
    .bind(&recipe.image)
    .bind(&recipe.text)
    .bind(recipe.cooking_time)
    .fetch_one(&mut *tx)
    .await
    .context("insert recipe")?;

    insert_children_tx(&mut tx, recipe_id, recipe).await?;
    tx.commit().await.context("commit tx")?;
    Ok(recipe_id)
}

/// Rewrites the recipe fields and replaces its tags and ingredient lines.
pub async fn update(db: &PgPool, recipe_id: Uuid, recipe: &ValidRecipe) -> anyhow::Result<()> {
    let mut tx = db.begin().await.context("begin tx")?;

    sqlx::query(
        r#"
        UPDATE recipes
           SET name = $2, image = $3, text = $4, cooking_time = $5
         WHERE id = $1
        "#,
    )
    .bind(recipe_id)
    .bind(&recipe.name)
    .bind(&recipe.image)
    .bind(&recipe.text)
    .bind(recipe.cooking_time)
    .execute(&mut *tx)
    .await
    .context("update recipe")?;

    sqlx::query(r#"DELETE FROM recipe_tags WHERE recipe_id = $1"#)
        .bind(recipe_id)
        .execute(&mut *tx)
        .await
        .context("clear recipe tags")?;
    sqlx::query(r#"DELETE FROM recipe_ingredients WHERE recipe_id = $1"#)
        .bind(recipe_id)
        .execute(&mut *tx)
        .await
        .context("clear recipe ingredients")?;

    insert_children_tx(&mut tx, recipe_id, recipe).await?;
    tx.commit().await.context("commit tx")?;
    Ok(())
}

pub async fn delete(db: &PgPool, recipe_id: Uuid) -> anyhow::Result<()> {
    sqlx::query(r#"DELETE FROM recipes WHERE id = $1"#)
        .bind(recipe_id)
        .execute(db)
        .await
        .context("delete recipe")?;
    Ok(())
}

pub async fn find_short(db: &PgPool, recipe_id: Uuid) -> anyhow::Result<Option<RecipeShort>> {
    let row = sqlx::query_as::<_, RecipeShort>(
        r#"SELECT id, name, image, cooking_time FROM recipes WHERE id = $1"#,
    )
    .bind(recipe_id)
    .fetch_optional(db)
    .await?;
    Ok(row)
}

/// Returns false when the pair was already present.
pub async fn add_to_list(
    db: &PgPool,
    list: RecipeList,
    user_id: Uuid,
    recipe_id: Uuid,
) -> Result<bool, sqlx::Error> {
    let res = sqlx::query(&format!(
        "INSERT INTO {} (user_id, recipe_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        list.table()
    ))
    .bind(user_id)
    .bind(recipe_id)
    .execute(db)
    .await?;
    Ok(res.rows_affected() == 1)
}

/// Returns false when there was nothing to remove.
pub async fn remove_from_list(
    db: &PgPool,
    list: RecipeList,
    user_id: Uuid,
    recipe_id: Uuid,
) -> anyhow::Result<bool> {
    let res = sqlx::query(&format!(
        "DELETE FROM {} WHERE user_id = $1 AND recipe_id = $2",
        list.table()
    ))
    .bind(user_id)
    .bind(recipe_id)
    .execute(db)
    .await
    .with_context(|| format!("remove from {}", list.table()))?;
    Ok(res.rows_affected() > 0)
}

/// Every ingredient line of every recipe in the user's cart.
pub async fn cart_lines(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<CartLine>> {
    let rows = sqlx::query_as::<_, CartLine>(
        r#"
        SELECT i.name, i.measurement_unit, ri.amount
          FROM shopping_cart c
          JOIN recipe_ingredients ri ON ri.recipe_id = c.recipe_id
          JOIN ingredients i ON i.id = ri.ingredient_id
         WHERE c.user_id = $1
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await
    .context("load cart lines")?;
    Ok(rows)
}
