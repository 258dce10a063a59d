use anyhow::Context;
use sqlx::PgPool;
use uuid::Uuid;

use super::dto::UserView;
use crate::recipes::repo_types::RecipeShort;

/// `$1` is the viewer id (NULL for anonymous).
const USER_VIEW_SELECT: &str = r#"
    SELECT u.id, u.email, u.username, u.first_name, u.last_name,
           EXISTS (SELECT 1 FROM subscriptions s
                    WHERE s.user_id = $1 AND s.author_id = u.id) AS is_subscribed
      FROM users u
"#;

pub async fn list(
    db: &PgPool,
    viewer: Option<Uuid>,
    limit: i64,
    offset: i64,
) -> anyhow::Result<(Vec<UserView>, i64)> {
    let rows = sqlx::query_as::<_, UserView>(&format!(
        "{USER_VIEW_SELECT} ORDER BY u.created_at, u.id LIMIT $2 OFFSET $3"
    ))
    .bind(viewer)
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await
    .context("list users")?;

    let count: i64 = sqlx::query_scalar(r#"SELECT COUNT(*) FROM users"#)
        .fetch_one(db)
        .await
        .context("count users")?;
    Ok((rows, count))
}

pub async fn find(db: &PgPool, viewer: Option<Uuid>, id: Uuid) -> anyhow::Result<Option<UserView>> {
    let row = sqlx::query_as::<_, UserView>(&format!("{USER_VIEW_SELECT} WHERE u.id = $2"))
        .bind(viewer)
        .bind(id)
        .fetch_optional(db)
        .await
        .context("find user")?;
    Ok(row)
}

pub async fn exists(db: &PgPool, id: Uuid) -> anyhow::Result<bool> {
    let found: bool = sqlx::query_scalar(r#"SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)"#)
        .bind(id)
        .fetch_one(db)
        .await?;
    Ok(found)
}

pub async fn is_subscribed(db: &PgPool, user_id: Uuid, author_id: Uuid) -> anyhow::Result<bool> {
    let found: bool = sqlx::query_scalar(
        r#"SELECT EXISTS(SELECT 1 FROM subscriptions WHERE user_id = $1 AND author_id = $2)"#,
    )
    .bind(user_id)
    .bind(author_id)
    .fetch_one(db)
    .await?;
    Ok(found)
}

/// Raw insert; a duplicate pair surfaces as a unique violation.
pub async fn insert_subscription(
    db: &PgPool,
    user_id: Uuid,
    author_id: Uuid,
) -> Result<(), sqlx::Error> {
    sqlx::query(r#"INSERT INTO subscriptions (user_id, author_id) VALUES ($1, $2)"#)
        .bind(user_id)
        .bind(author_id)
        .execute(db)
        .await?;
    Ok(())
}

/// Returns false when there was no such subscription.
pub async fn delete_subscription(
    db: &PgPool,
    user_id: Uuid,
    author_id: Uuid,
) -> anyhow::Result<bool> {
    let res = sqlx::query(r#"DELETE FROM subscriptions WHERE user_id = $1 AND author_id = $2"#)
        .bind(user_id)
        .bind(author_id)
        .execute(db)
        .await
        .context("delete subscription")?;
    Ok(res.rows_affected() > 0)
}

/// Authors the user follows, newest subscription first.
pub async fn subscribed_authors(
    db: &PgPool,
    user_id: Uuid,
    limit: i64,
    offset: i64,
) -> anyhow::Result<(Vec<UserView>, i64)> {
    let rows = sqlx::query_as::<_, UserView>(
        r#"
        SELECT u.id, u.email, u.username, u.first_name, u.last_name, TRUE AS is_subscribed
          FROM subscriptions s
          JOIN users u ON u.id = s.author_id
         WHERE s.user_id = $1
         ORDER BY s.created_at DESC, u.id
         LIMIT $2 OFFSET $3
        "#,
    )
    .bind(user_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await
    .context("list subscriptions")?;

    let count: i64 = sqlx::query_scalar(r#"SELECT COUNT(*) FROM subscriptions WHERE user_id = $1"#)
        .bind(user_id)
        .fetch_one(db)
        .await
        .context("count subscriptions")?;
    Ok((rows, count))
}

#[derive(Debug, sqlx::FromRow)]
pub struct AuthorRecipeRow {
    pub author_id: Uuid,
    #[sqlx(flatten)]
    pub recipe: RecipeShort,
}

/// Newest recipes of each author, at most `per_author` each when given.
pub async fn recipes_of_authors(
    db: &PgPool,
    author_ids: &[Uuid],
    per_author: Option<i64>,
) -> anyhow::Result<Vec<AuthorRecipeRow>> {
    let rows = sqlx::query_as::<_, AuthorRecipeRow>(
        r#"
        SELECT author_id, id, name, image, cooking_time
          FROM (
                SELECT r.author_id, r.id, r.name, r.image, r.cooking_time,
                       ROW_NUMBER() OVER (PARTITION BY r.author_id
                                          ORDER BY r.created_at DESC, r.id) AS rn
                  FROM recipes r
                 WHERE r.author_id = ANY($1)
               ) ranked
         WHERE $2::bigint IS NULL OR rn <= $2
         ORDER BY author_id, rn
        "#,
    )
    .bind(author_ids)
    .bind(per_author)
    .fetch_all(db)
    .await
    .context("load author recipes")?;
    Ok(rows)
}

pub async fn recipe_counts(db: &PgPool, author_ids: &[Uuid]) -> anyhow::Result<Vec<(Uuid, i64)>> {
    let rows = sqlx::query_as::<_, (Uuid, i64)>(
        r#"
        SELECT author_id, COUNT(*)
          FROM recipes
         WHERE author_id = ANY($1)
         GROUP BY author_id
        "#,
    )
    .bind(author_ids)
    .fetch_all(db)
    .await
    .context("count author recipes")?;
    Ok(rows)
}
