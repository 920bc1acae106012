use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::errors::{conflict_on_unique, Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Ingredient {
    pub ingredient_id: Uuid,
    pub name: String,
    pub measurement_unit: String,
    pub created_at: DateTime<Utc>,
}

impl Ingredient {
    pub async fn create(pool: &PgPool, name: String, measurement_unit: String) -> Result<Self> {
        sqlx::query_as::<_, Ingredient>(
            "
            INSERT INTO ingredients (name, measurement_unit)
            VALUES ($1, $2)
            RETURNING
                ingredient_id,
                name,
                measurement_unit,
                created_at
            ",
        )
        .bind(&name)
        .bind(&measurement_unit)
        .fetch_one(pool)
        .await
        .map_err(|e| {
            conflict_on_unique(
                e,
                format!("Ingredient {name} ({measurement_unit}) already exists"),
            )
        })
    }

    pub async fn get_by_id(pool: &PgPool, ingredient_id: Uuid) -> Result<Option<Self>> {
        let ingredient = sqlx::query_as::<_, Ingredient>(
            "
            SELECT
                ingredient_id,
                name,
                measurement_unit,
                created_at
            FROM ingredients
            WHERE ingredient_id = $1
            ",
        )
        .bind(ingredient_id)
        .fetch_optional(pool)
        .await?;

        Ok(ingredient)
    }

    /// Case-insensitive match on the start of the name. An empty prefix lists everything.
    pub async fn search_by_prefix(pool: &PgPool, prefix: Option<&str>) -> Result<Vec<Self>> {
        let pattern = format!("{}%", escape_like(prefix.unwrap_or_default()).to_lowercase());

        let ingredients = sqlx::query_as::<_, Ingredient>(
            r"
            SELECT
                ingredient_id,
                name,
                measurement_unit,
                created_at
            FROM ingredients
            WHERE lower(name) LIKE $1 ESCAPE '\'
            ORDER BY name, measurement_unit
            ",
        )
        .bind(pattern)
        .fetch_all(pool)
        .await?;

        Ok(ingredients)
    }

    /// The subset of `ids` that exist in the store.
    pub async fn existing_ids(conn: &mut PgConnection, ids: &[Uuid]) -> Result<Vec<Uuid>> {
        let found = sqlx::query_scalar::<_, Uuid>(
            "SELECT ingredient_id FROM ingredients WHERE ingredient_id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(conn)
        .await?;

        Ok(found)
    }
}

fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// One ingredient of a recipe, joined with its name and unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct IngredientLine {
    pub ingredient_id: Uuid,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

/// An ingredient id and amount ready to be written to `recipe_ingredients`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngredientAmount {
    pub ingredient_id: Uuid,
    pub amount: i32,
}

pub struct RecipeIngredient;

impl RecipeIngredient {
    pub async fn get_by_recipe(pool: &PgPool, recipe_id: Uuid) -> Result<Vec<IngredientLine>> {
        let lines = sqlx::query_as::<_, IngredientLine>(
            "
            SELECT
                i.ingredient_id,
                i.name,
                i.measurement_unit,
                ri.amount
            FROM recipe_ingredients ri
            JOIN ingredients i ON i.ingredient_id = ri.ingredient_id
            WHERE ri.recipe_id = $1
            ORDER BY i.name
            ",
        )
        .bind(recipe_id)
        .fetch_all(pool)
        .await?;

        Ok(lines)
    }

    /// Deletes every line of the recipe and inserts `lines` in one statement.
    pub(crate) async fn replace_for_recipe(
        conn: &mut PgConnection,
        recipe_id: Uuid,
        lines: &[IngredientAmount],
    ) -> Result<()> {
        sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = $1")
            .bind(recipe_id)
            .execute(&mut *conn)
            .await?;

        let ingredient_ids: Vec<Uuid> = lines.iter().map(|l| l.ingredient_id).collect();
        let amounts: Vec<i32> = lines.iter().map(|l| l.amount).collect();

        sqlx::query(
            "
            INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount)
            SELECT $1, line.ingredient_id, line.amount
            FROM UNNEST($2::uuid[], $3::int4[]) AS line (ingredient_id, amount)
            ",
        )
        .bind(recipe_id)
        .bind(&ingredient_ids)
        .bind(&amounts)
        .execute(&mut *conn)
        .await
        .map_err(|e| {
            let is_missing_ingredient = e
                .as_database_error()
                .is_some_and(|db_err| db_err.is_foreign_key_violation());

            if is_missing_ingredient {
                Error::NotFound("One of the ingredients does not exist".to_string())
            } else {
                conflict_on_unique(e, "An ingredient can only appear once in a recipe")
            }
        })?;

        Ok(())
    }
}
