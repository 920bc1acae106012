use sqlx::PgPool;
use uuid::Uuid;

use super::recipe::RecipeSummary;
use crate::errors::{Error, Result};

/// A per-user set of recipes where membership is the existence of a (user, recipe) row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecipeList {
    Favorites,
    ShoppingCart,
}

impl RecipeList {
    fn table(self) -> &'static str {
        match self {
            RecipeList::Favorites => "favorite_recipes",
            RecipeList::ShoppingCart => "shopping_cart_recipes",
        }
    }

    fn label(self) -> &'static str {
        match self {
            RecipeList::Favorites => "favorites",
            RecipeList::ShoppingCart => "shopping cart",
        }
    }

    #[tracing::instrument(skip(pool), err)]
    pub async fn add(self, pool: &PgPool, user_id: Uuid, recipe_id: Uuid) -> Result<RecipeSummary> {
        let summary = RecipeSummary::get_by_id(pool, recipe_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Recipe {recipe_id} not found")))?;

        let query = format!(
            "INSERT INTO {} (user_id, recipe_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            self.table()
        );
        let result = sqlx::query(&query)
            .bind(user_id)
            .bind(recipe_id)
            .execute(pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(Error::Conflict(format!(
                "Recipe is already in your {}",
                self.label()
            )));
        }

        Ok(summary)
    }

    #[tracing::instrument(skip(pool), err)]
    pub async fn remove(self, pool: &PgPool, user_id: Uuid, recipe_id: Uuid) -> Result<()> {
        if RecipeSummary::get_by_id(pool, recipe_id).await?.is_none() {
            return Err(Error::NotFound(format!("Recipe {recipe_id} not found")));
        }

        let query = format!(
            "DELETE FROM {} WHERE user_id = $1 AND recipe_id = $2",
            self.table()
        );
        let result = sqlx::query(&query)
            .bind(user_id)
            .bind(recipe_id)
            .execute(pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(Error::AlreadyRemoved(format!(
                "Recipe was already removed from your {}",
                self.label()
            )));
        }

        Ok(())
    }

    pub async fn contains(self, pool: &PgPool, user_id: Uuid, recipe_id: Uuid) -> Result<bool> {
        let query = format!(
            "SELECT EXISTS (SELECT 1 FROM {} WHERE user_id = $1 AND recipe_id = $2)",
            self.table()
        );
        let exists = sqlx::query_scalar::<_, bool>(&query)
            .bind(user_id)
            .bind(recipe_id)
            .fetch_one(pool)
            .await?;

        Ok(exists)
    }

    pub async fn is_empty_for(self, pool: &PgPool, user_id: Uuid) -> Result<bool> {
        let query = format!(
            "SELECT NOT EXISTS (SELECT 1 FROM {} WHERE user_id = $1)",
            self.table()
        );
        let empty = sqlx::query_scalar::<_, bool>(&query)
            .bind(user_id)
            .fetch_one(pool)
            .await?;

        Ok(empty)
    }
}
