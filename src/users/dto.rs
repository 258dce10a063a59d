use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::recipes::repo_types::RecipeShort;

/// A user as seen by the current viewer.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct UserView {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
}

/// An author the viewer follows, with a preview of their recipes.
#[derive(Debug, Serialize)]
pub struct SubscriptionView {
    #[serde(flatten)]
    pub author: UserView,
    pub recipes: Vec<RecipeShort>,
    pub recipes_count: i64,
}

#[derive(Debug, Deserialize)]
pub struct RecipesLimit {
    pub recipes_limit: Option<i64>,
}
