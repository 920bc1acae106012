use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::errors::{conflict_on_unique, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Tag {
    pub tag_id: Uuid,
    pub name: String,
    pub color: String,
    pub slug: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Tag {
    pub async fn create(pool: &PgPool, name: String, color: String, slug: String) -> Result<Self> {
        sqlx::query_as::<_, Tag>(
            "
            INSERT INTO tags (name, color, slug)
            VALUES ($1, $2, $3)
            RETURNING
                tag_id,
                name,
                color,
                slug,
                created_at,
                updated_at
            ",
        )
        .bind(name)
        .bind(color)
        .bind(&slug)
        .fetch_one(pool)
        .await
        .map_err(|e| conflict_on_unique(e, format!("A tag with slug {slug} already exists")))
    }

    pub async fn get_by_id(pool: &PgPool, tag_id: Uuid) -> Result<Option<Self>> {
        let tag = sqlx::query_as::<_, Tag>(
            "
            SELECT
                tag_id,
                name,
                color,
                slug,
                created_at,
                updated_at
            FROM tags
            WHERE tag_id = $1
            ",
        )
        .bind(tag_id)
        .fetch_optional(pool)
        .await?;

        Ok(tag)
    }

    pub async fn list_all(pool: &PgPool) -> Result<Vec<Self>> {
        let tags = sqlx::query_as::<_, Tag>(
            "
            SELECT
                tag_id,
                name,
                color,
                slug,
                created_at,
                updated_at
            FROM tags
            ORDER BY name
            ",
        )
        .fetch_all(pool)
        .await?;

        Ok(tags)
    }

    /// The subset of `ids` that exist in the store.
    pub async fn existing_ids(conn: &mut PgConnection, ids: &[Uuid]) -> Result<Vec<Uuid>> {
        let found = sqlx::query_scalar::<_, Uuid>("SELECT tag_id FROM tags WHERE tag_id = ANY($1)")
            .bind(ids)
            .fetch_all(conn)
            .await?;

        Ok(found)
    }
}

pub struct RecipeTag;

impl RecipeTag {
    pub async fn get_by_recipe(pool: &PgPool, recipe_id: Uuid) -> Result<Vec<Tag>> {
        let tags = sqlx::query_as::<_, Tag>(
            "
            SELECT
                t.tag_id,
                t.name,
                t.color,
                t.slug,
                t.created_at,
                t.updated_at
            FROM tags t
            JOIN recipe_tags rt ON t.tag_id = rt.tag_id
            WHERE rt.recipe_id = $1
            ORDER BY t.name
            ",
        )
        .bind(recipe_id)
        .fetch_all(pool)
        .await?;

        Ok(tags)
    }

    /// Drops every tag link of the recipe and links `tag_ids` instead.
    pub(crate) async fn replace_for_recipe(
        conn: &mut PgConnection,
        recipe_id: Uuid,
        tag_ids: &[Uuid],
    ) -> Result<()> {
        sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = $1")
            .bind(recipe_id)
            .execute(&mut *conn)
            .await?;

        sqlx::query(
            "
            INSERT INTO recipe_tags (recipe_id, tag_id)
            SELECT $1, tag_id FROM UNNEST($2::uuid[]) AS tag_id
            ",
        )
        .bind(recipe_id)
        .bind(tag_ids)
        .execute(&mut *conn)
        .await
        .map_err(|e| conflict_on_unique(e, "A tag can only appear once in a recipe"))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{errors::Error, test_utils::create_tag};

    #[sqlx::test]
    async fn tags_list_by_name(pool: PgPool) {
        create_tag(&pool, "Lunch", "lunch").await;
        create_tag(&pool, "Breakfast", "breakfast").await;

        let names: Vec<String> = Tag::list_all(&pool)
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.name)
            .collect();

        assert_eq!(names, vec!["Breakfast", "Lunch"]);
    }

    #[sqlx::test]
    async fn slugs_are_unique(pool: PgPool) {
        create_tag(&pool, "Lunch", "lunch").await;

        let err = Tag::create(
            &pool,
            "Second lunch".to_string(),
            "#FFA500".to_string(),
            "lunch".to_string(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, Error::Conflict(_)));
    }
}
