use uuid::Uuid;

use crate::{error::ApiError, pagination::PageParams};

/// Query-string filters for the recipe catalog.
///
/// Built from raw pairs because `tags` may repeat: `?tags=lunch&tags=dinner`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeFilter {
    pub author: Option<Uuid>,
    pub tags: Vec<String>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub page: i64,
    pub limit: i64,
}

fn parse_flag(key: &str, value: &str) -> Result<bool, ApiError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" => Ok(true),
        "0" | "false" | "" => Ok(false),
        _ => Err(ApiError::BadRequest(format!("{key} must be 0/1 or true/false"))),
    }
}

fn parse_int(key: &str, value: &str) -> Result<i64, ApiError> {
    value
        .trim()
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("{key} must be an integer")))
}

impl RecipeFilter {
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Result<Self, ApiError> {
        let defaults = PageParams::default();
        let mut f = RecipeFilter {
            page: defaults.page,
            limit: defaults.limit,
            ..Default::default()
        };
        for (key, value) in pairs {
            match key.as_str() {
                "author" => {
                    let id = Uuid::parse_str(value.trim())
                        .map_err(|_| ApiError::BadRequest("author must be a user id".into()))?;
                    f.author = Some(id);
                }
                "tags" => {
                    let slug = value.trim();
                    if !slug.is_empty() && !f.tags.iter().any(|t| t == slug) {
                        f.tags.push(slug.to_string());
                    }
                }
                "is_favorited" => f.is_favorited = parse_flag(&key, &value)?,
                "is_in_shopping_cart" => f.is_in_shopping_cart = parse_flag(&key, &value)?,
                "page" => f.page = parse_int(&key, &value)?,
                "limit" => f.limit = parse_int(&key, &value)?,
                _ => {}
            }
        }
        Ok(f)
    }

    pub fn page_params(&self) -> PageParams {
        PageParams {
            page: self.page,
            limit: self.limit,
        }
    }

    /// Viewer-relative filters only apply to a signed-in viewer.
    pub fn for_viewer(mut self, viewer: Option<Uuid>) -> Self {
        if viewer.is_none() {
            self.is_favorited = false;
            self.is_in_shopping_cart = false;
        }
        self
    }
}
