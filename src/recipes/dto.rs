use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::catalog::repo_types::Tag;
use crate::recipes::repo_types::{IngredientLineRow, RecipeRow, RecipeTagRow};
use crate::users::dto::UserView;

#[derive(Debug, Clone, Deserialize)]
pub struct IngredientAmount {
    pub id: i64,
    pub amount: serde_json::Value, // checked by the validator, not by serde
}

/// Body of `POST /recipes` and `PATCH /recipes/:id`.
#[derive(Debug, Clone, Deserialize)]
pub struct RecipePayload {
    #[serde(default)]
    pub ingredients: Vec<IngredientAmount>,
    #[serde(default)]
    pub tags: Vec<i64>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub cooking_time: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngredientLineView {
    pub id: i64,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

#[derive(Debug, Serialize)]
pub struct RecipeDetails {
    pub id: Uuid,
    pub tags: Vec<Tag>,
    pub author: UserView,
    pub ingredients: Vec<IngredientLineView>,
    pub name: String,
    pub image: Option<String>,
    pub text: String,
    pub cooking_time: i32,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Joins recipe rows with their tags and ingredient lines, keeping row order.
pub fn assemble(
    rows: Vec<RecipeRow>,
    tags: Vec<RecipeTagRow>,
    lines: Vec<IngredientLineRow>,
) -> Vec<RecipeDetails> {
    let mut tags_by_recipe: HashMap<Uuid, Vec<Tag>> = HashMap::new();
    for t in tags {
        tags_by_recipe.entry(t.recipe_id).or_default().push(Tag {
            id: t.id,
            name: t.name,
            color: t.color,
            slug: t.slug,
        });
    }
    let mut lines_by_recipe: HashMap<Uuid, Vec<IngredientLineView>> = HashMap::new();
    for l in lines {
        lines_by_recipe
            .entry(l.recipe_id)
            .or_default()
            .push(IngredientLineView {
                id: l.id,
                name: l.name,
                measurement_unit: l.measurement_unit,
                amount: l.amount,
            });
    }

    rows.into_iter()
        .map(|r| RecipeDetails {
            id: r.id,
            tags: tags_by_recipe.remove(&r.id).unwrap_or_default(),
            author: UserView {
                id: r.author_id,
                email: r.author_email,
                username: r.author_username,
                first_name: r.author_first_name,
                last_name: r.author_last_name,
                is_subscribed: r.author_is_subscribed,
            },
            ingredients: lines_by_recipe.remove(&r.id).unwrap_or_default(),
            name: r.name,
            image: r.image,
            text: r.text,
            cooking_time: r.cooking_time,
            is_favorited: r.is_favorited,
            is_in_shopping_cart: r.is_in_shopping_cart,
            created_at: r.created_at,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: Uuid, name: &str) -> RecipeRow {
        RecipeRow {
            id,
            author_id: Uuid::new_v4(),
            name: name.into(),
            image: None,
            text: "text".into(),
            cooking_time: 15,
            created_at: OffsetDateTime::UNIX_EPOCH,
            author_email: "chef@example.com".into(),
            author_username: "chef".into(),
            author_first_name: "Anna".into(),
            author_last_name: "Ivanova".into(),
            author_is_subscribed: true,
            is_favorited: false,
            is_in_shopping_cart: true,
        }
    }

    fn line(recipe_id: Uuid, id: i64, unit: &str, amount: i32) -> IngredientLineRow {
        IngredientLineRow {
            recipe_id,
            id,
            name: format!("ingredient-{id}"),
            measurement_unit: unit.into(),
            amount,
        }
    }

    #[test]
    fn every_ingredient_line_comes_back() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let lines = vec![
            line(a, 1, "g", 100),
            line(b, 1, "g", 50),
            line(a, 2, "pcs", 3),
            line(a, 3, "ml", 250),
        ];
        let tags = vec![RecipeTagRow {
            recipe_id: b,
            id: 4,
            name: "Dinner".into(),
            color: "#AA00FF".into(),
            slug: "dinner".into(),
        }];

        let out = assemble(vec![row(a, "A"), row(b, "B")], tags, lines);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].name, "A");
        assert_eq!(
            out[0].ingredients,
            vec![
                IngredientLineView { id: 1, name: "ingredient-1".into(), measurement_unit: "g".into(), amount: 100 },
                IngredientLineView { id: 2, name: "ingredient-2".into(), measurement_unit: "pcs".into(), amount: 3 },
                IngredientLineView { id: 3, name: "ingredient-3".into(), measurement_unit: "ml".into(), amount: 250 },
            ]
        );
        assert!(out[0].tags.is_empty());
        assert_eq!(out[1].ingredients.len(), 1);
        assert_eq!(out[1].ingredients[0].amount, 50);
        assert_eq!(out[1].tags[0].slug, "dinner");
        assert!(out[1].author.is_subscribed);
    }

    #[test]
    fn details_serialize_with_nested_author() {
        let id = Uuid::new_v4();
        let out = assemble(vec![row(id, "Soup")], vec![], vec![line(id, 8, "g", 5)]);
        let json = serde_json::to_value(&out[0]).unwrap();
        assert_eq!(json["author"]["username"], "chef");
        assert_eq!(json["ingredients"][0]["measurement_unit"], "g");
        assert_eq!(json["is_in_shopping_cart"], true);
    }
}
