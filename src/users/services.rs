use std::collections::HashMap;

use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use super::{
    dto::{SubscriptionView, UserView},
    repo,
};
use crate::{
    error::{is_unique_violation, ApiError},
    pagination::{Page, PageParams},
    recipes::repo_types::RecipeShort,
};

/// Rejects self-subscription and repeated subscription to the same author.
pub fn check_subscription(
    subscriber: Uuid,
    author: Uuid,
    already_subscribed: bool,
) -> Result<(), ApiError> {
    if subscriber == author {
        return Err(ApiError::SelfSubscription);
    }
    if already_subscribed {
        return Err(ApiError::DuplicateSubscription);
    }
    Ok(())
}

pub async fn subscribe(
    db: &PgPool,
    subscriber: Uuid,
    author: Uuid,
    recipes_limit: Option<i64>,
) -> Result<SubscriptionView, ApiError> {
    if subscriber == author {
        warn!(%subscriber, "self-subscription rejected");
        return Err(ApiError::SelfSubscription);
    }
    let author_view = repo::find(db, Some(subscriber), author)
        .await?
        .ok_or(ApiError::NotFound("User"))?;
    check_subscription(subscriber, author, author_view.is_subscribed)?;

    match repo::insert_subscription(db, subscriber, author).await {
        Ok(()) => {}
        Err(e) if is_unique_violation(&e) => return Err(ApiError::DuplicateSubscription),
        Err(e) => return Err(e.into()),
    }
    info!(%subscriber, %author, "subscribed");

    let view = UserView {
        is_subscribed: true,
        ..author_view
    };
    let mut views = with_recipes(db, vec![view], recipes_limit).await?;
    views.pop().ok_or(ApiError::NotFound("User"))
}

pub async fn unsubscribe(db: &PgPool, subscriber: Uuid, author: Uuid) -> Result<(), ApiError> {
    if !repo::exists(db, author).await? {
        return Err(ApiError::NotFound("User"));
    }
    if !repo::delete_subscription(db, subscriber, author).await? {
        return Err(ApiError::NotSubscribed);
    }
    info!(%subscriber, %author, "unsubscribed");
    Ok(())
}

pub async fn subscriptions(
    db: &PgPool,
    user_id: Uuid,
    params: PageParams,
    recipes_limit: Option<i64>,
) -> Result<Page<SubscriptionView>, ApiError> {
    let (authors, count) =
        repo::subscribed_authors(db, user_id, params.limit(), params.offset()).await?;
    let results = with_recipes(db, authors, recipes_limit).await?;
    Ok(Page::new(results, count, params))
}

async fn with_recipes(
    db: &PgPool,
    authors: Vec<UserView>,
    recipes_limit: Option<i64>,
) -> anyhow::Result<Vec<SubscriptionView>> {
    let ids: Vec<Uuid> = authors.iter().map(|a| a.id).collect();
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let per_author = recipes_limit.map(|n| n.max(0));

    let mut recipes: HashMap<Uuid, Vec<RecipeShort>> = HashMap::new();
    for row in repo::recipes_of_authors(db, &ids, per_author).await? {
        recipes.entry(row.author_id).or_default().push(row.recipe);
    }
    let counts: HashMap<Uuid, i64> = repo::recipe_counts(db, &ids).await?.into_iter().collect();

    Ok(authors
        .into_iter()
        .map(|author| SubscriptionView {
            recipes: recipes.remove(&author.id).unwrap_or_default(),
            recipes_count: counts.get(&author.id).copied().unwrap_or(0),
            author,
        })
        .collect())
}
