use sqlx::PgPool;

use super::repo_types::{Ingredient, Tag};

impl Tag {
    pub async fn list(db: &PgPool) -> anyhow::Result<Vec<Tag>> {
        let rows = sqlx::query_as::<_, Tag>(
            r#"SELECT id, name, color, slug FROM tags ORDER BY id DESC"#,
        )
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    pub async fn find(db: &PgPool, id: i64) -> anyhow::Result<Option<Tag>> {
        let row = sqlx::query_as::<_, Tag>(
            r#"SELECT id, name, color, slug FROM tags WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(row)
    }

    /// Ids from `ids` that have no tag row.
    pub async fn missing_ids(db: &PgPool, ids: &[i64]) -> anyhow::Result<Vec<i64>> {
        let missing: Vec<i64> = sqlx::query_scalar(
            r#"
            SELECT wanted.id
              FROM UNNEST($1::bigint[]) AS wanted(id)
             WHERE NOT EXISTS (SELECT 1 FROM tags t WHERE t.id = wanted.id)
            "#,
        )
        .bind(ids)
        .fetch_all(db)
        .await?;
        Ok(missing)
    }
}

impl Ingredient {
    /// Case-insensitive prefix search, ordered by name.
    pub async fn search(db: &PgPool, name_prefix: Option<&str>) -> anyhow::Result<Vec<Ingredient>> {
        let pattern = name_prefix.map(|p| format!("{}%", escape_like(&p.to_lowercase())));
        let rows = sqlx::query_as::<_, Ingredient>(
            r#"
            SELECT id, name, measurement_unit
              FROM ingredients
             WHERE $1::text IS NULL OR lower(name) LIKE $1
             ORDER BY name, id
            "#,
        )
        .bind(pattern)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    pub async fn find(db: &PgPool, id: i64) -> anyhow::Result<Option<Ingredient>> {
        let row = sqlx::query_as::<_, Ingredient>(
            r#"SELECT id, name, measurement_unit FROM ingredients WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(row)
    }

    pub async fn missing_ids(db: &PgPool, ids: &[i64]) -> anyhow::Result<Vec<i64>> {
        let missing: Vec<i64> = sqlx::query_scalar(
            r#"
            SELECT wanted.id
              FROM UNNEST($1::bigint[]) AS wanted(id)
             WHERE NOT EXISTS (SELECT 1 FROM ingredients i WHERE i.id = wanted.id)
            "#,
        )
        .bind(ids)
        .fetch_all(db)
        .await?;
        Ok(missing)
    }
}

/// Escapes LIKE wildcards so user input matches literally.
pub(crate) fn escape_like(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::escape_like;

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("соль"), "соль");
        assert_eq!(escape_like("50%_off"), "50\\%\\_off");
        assert_eq!(escape_like("a\\b"), "a\\\\b");
    }
}
