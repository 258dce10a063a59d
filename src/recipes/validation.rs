//! Recipe payload checks.
//!
//! Every rule is evaluated in a single pass and all violations are reported
//! together, so a client can fix the whole form at once.

use std::collections::HashSet;

use serde_json::Value;

use super::dto::RecipePayload;
use crate::error::ApiError;

pub const MAX_NAME_LEN: usize = 255;

/// Ingredient reference with a checked positive amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngredientLine {
    pub id: i64,
    pub amount: i32,
}

/// A recipe payload that passed [`validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidRecipe {
    pub name: String,
    pub image: Option<String>,
    pub text: String,
    pub cooking_time: i32,
    pub tags: Vec<i64>,
    pub ingredients: Vec<IngredientLine>,
}

/// Integers may arrive as JSON numbers or numeric strings.
fn whole_number(v: &Value) -> Option<i32> {
    let n = match v {
        Value::Number(n) => n.as_i64()?,
        Value::String(s) => s.trim().parse::<i64>().ok()?,
        _ => return None,
    };
    i32::try_from(n).ok()
}

fn positive_amount(v: &Value) -> Option<i32> {
    whole_number(v).filter(|n| *n >= 1)
}

pub fn validate(payload: RecipePayload) -> Result<ValidRecipe, ApiError> {
    let mut errors = Vec::new();

    if payload.ingredients.is_empty() {
        errors.push("Add at least one ingredient to the recipe.".to_string());
    }
    let mut ingredients = Vec::with_capacity(payload.ingredients.len());
    let mut seen_ingredients = HashSet::new();
    let mut reported_ingredients = HashSet::new();
    for item in &payload.ingredients {
        match positive_amount(&item.amount) {
            Some(amount) => ingredients.push(IngredientLine {
                id: item.id,
                amount,
            }),
            None => errors.push(format!(
                "Amount of ingredient {} must be a positive integer.",
                item.id
            )),
        }
        if !seen_ingredients.insert(item.id) && reported_ingredients.insert(item.id) {
            errors.push(format!(
                "Ingredient {} is listed more than once; the same ingredient cannot be added twice.",
                item.id
            ));
        }
    }

    if payload.tags.is_empty() {
        errors.push("Add at least one tag to the recipe.".to_string());
    }
    let distinct_tags: HashSet<i64> = payload.tags.iter().copied().collect();
    if distinct_tags.len() < payload.tags.len() {
        errors.push("The same tag cannot be applied twice.".to_string());
    }

    let cooking_time = match whole_number(&payload.cooking_time) {
        Some(minutes) if minutes >= 1 => minutes,
        Some(_) => {
            errors.push("Cooking time must be at least 1 minute.".to_string());
            0
        }
        None => {
            errors.push("Cooking time must be a whole number of minutes.".to_string());
            0
        }
    };

    let name = payload.name.trim().to_string();
    if name.is_empty() {
        errors.push("Recipe name must not be blank.".to_string());
    } else if name.chars().count() > MAX_NAME_LEN {
        errors.push(format!(
            "Recipe name must be at most {MAX_NAME_LEN} characters."
        ));
    }
    if payload.text.trim().is_empty() {
        errors.push("Recipe text must not be blank.".to_string());
    }

    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    Ok(ValidRecipe {
        name,
        image: payload.image.filter(|s| !s.trim().is_empty()),
        text: payload.text,
        cooking_time,
        tags: payload.tags,
        ingredients,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recipes::dto::IngredientAmount;
    use serde_json::json;

    fn payload() -> RecipePayload {
        RecipePayload {
            ingredients: vec![
                IngredientAmount {
                    id: 1,
                    amount: json!(100),
                },
                IngredientAmount {
                    id: 2,
                    amount: json!(3),
                },
            ],
            tags: vec![1, 2],
            image: Some("recipes/pancakes.jpg".into()),
            name: "Pancakes".into(),
            text: "Mix and fry.".into(),
            cooking_time: json!(20),
        }
    }

    fn messages(p: RecipePayload) -> Vec<String> {
        match validate(p) {
            Err(ApiError::Validation(m)) => m,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn valid_payload_passes_unchanged() {
        let valid = validate(payload()).expect("valid");
        assert_eq!(valid.name, "Pancakes");
        assert_eq!(valid.tags, vec![1, 2]);
        assert_eq!(
            valid.ingredients,
            vec![
                IngredientLine { id: 1, amount: 100 },
                IngredientLine { id: 2, amount: 3 },
            ]
        );
        assert_eq!(valid.cooking_time, 20);
    }

    #[test]
    fn empty_ingredients_rejected() {
        let mut p = payload();
        p.ingredients.clear();
        let m = messages(p);
        assert_eq!(m, vec!["Add at least one ingredient to the recipe."]);
    }

    #[test]
    fn duplicate_ingredient_reported_once() {
        let mut p = payload();
        for _ in 0..2 {
            p.ingredients.push(IngredientAmount {
                id: 1,
                amount: json!(5),
            });
        }
        let m = messages(p);
        assert_eq!(m.len(), 1);
        assert!(m[0].contains("Ingredient 1 is listed more than once"));
    }

    #[test]
    fn non_positive_and_non_integer_amounts() {
        let mut p = payload();
        p.ingredients = vec![
            IngredientAmount { id: 1, amount: json!(0) },
            IngredientAmount { id: 2, amount: json!(-4) },
            IngredientAmount { id: 3, amount: json!(1.5) },
            IngredientAmount { id: 4, amount: json!("many") },
            IngredientAmount { id: 5, amount: json!(null) },
            IngredientAmount { id: 6, amount: json!("7") },
        ];
        let m = messages(p);
        assert_eq!(m.len(), 5);
        for id in 1..=5 {
            assert!(m.contains(&format!(
                "Amount of ingredient {id} must be a positive integer."
            )));
        }
    }

    #[test]
    fn numeric_string_amount_accepted() {
        let mut p = payload();
        p.ingredients = vec![IngredientAmount { id: 9, amount: json!(" 42 ") }];
        let valid = validate(p).expect("valid");
        assert_eq!(valid.ingredients, vec![IngredientLine { id: 9, amount: 42 }]);
    }

    #[test]
    fn tags_must_be_present_and_distinct() {
        let mut p = payload();
        p.tags = vec![3, 3];
        assert_eq!(messages(p), vec!["The same tag cannot be applied twice."]);

        let mut p = payload();
        p.tags.clear();
        assert_eq!(messages(p), vec!["Add at least one tag to the recipe."]);
    }

    #[test]
    fn cooking_time_boundary() {
        let mut p = payload();
        p.cooking_time = json!(0);
        assert_eq!(messages(p), vec!["Cooking time must be at least 1 minute."]);

        let mut p = payload();
        p.cooking_time = json!("0");
        assert_eq!(messages(p), vec!["Cooking time must be at least 1 minute."]);

        let mut p = payload();
        p.cooking_time = json!(1);
        assert_eq!(validate(p).expect("one minute is enough").cooking_time, 1);
    }

    #[test]
    fn all_violations_collected_in_one_pass() {
        let p = RecipePayload {
            ingredients: vec![
                IngredientAmount { id: 7, amount: json!(0) },
                IngredientAmount { id: 7, amount: json!(2) },
            ],
            tags: vec![1, 1],
            image: None,
            name: "   ".into(),
            text: String::new(),
            cooking_time: json!(0),
        };
        let m = messages(p);
        assert_eq!(m.len(), 6);
        assert_eq!(m[0], "Amount of ingredient 7 must be a positive integer.");
        assert!(m[1].contains("listed more than once"));
        assert_eq!(m[2], "The same tag cannot be applied twice.");
        assert_eq!(m[3], "Cooking time must be at least 1 minute.");
        assert_eq!(m[4], "Recipe name must not be blank.");
        assert_eq!(m[5], "Recipe text must not be blank.");
    }

    #[test]
    fn fractional_cooking_time_reported_with_other_violations() {
        let mut p = payload();
        p.ingredients.push(IngredientAmount {
            id: 1,
            amount: json!(5),
        });
        p.tags = vec![1, 1];
        p.cooking_time = json!(1.5);
        let m = messages(p);
        assert_eq!(m.len(), 3);
        assert!(m[0].contains("Ingredient 1 is listed more than once"));
        assert_eq!(m[1], "The same tag cannot be applied twice.");
        assert_eq!(m[2], "Cooking time must be a whole number of minutes.");
    }

    #[test]
    fn string_cooking_time_accepted() {
        let mut p = payload();
        p.cooking_time = json!("45");
        assert_eq!(validate(p).expect("valid").cooking_time, 45);
    }

    #[test]
    fn body_with_missing_fields_still_reaches_every_rule() {
        let p: RecipePayload = serde_json::from_value(json!({
            "ingredients": [{"id": 1, "amount": 5}, {"id": 1, "amount": 5}],
            "tags": [2],
            "text": "Boil."
        }))
        .expect("missing fields fall back to defaults");
        let m = messages(p);
        assert_eq!(
            m,
            vec![
                "Ingredient 1 is listed more than once; the same ingredient cannot be added twice.",
                "Cooking time must be a whole number of minutes.",
                "Recipe name must not be blank.",
            ]
        );
    }

    #[test]
    fn long_name_rejected_and_blank_image_dropped() {
        let mut p = payload();
        p.name = "щ".repeat(MAX_NAME_LEN + 1);
        assert_eq!(messages(p).len(), 1);

        let mut p = payload();
        p.name = "щ".repeat(MAX_NAME_LEN);
        p.image = Some("  ".into());
        let valid = validate(p).expect("valid");
        assert!(valid.image.is_none());
    }
}
