use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::ingredients::{IngredientLine, RecipeIngredient};
use super::tags::{RecipeTag, Tag};
use super::validation::ValidRecipe;
use crate::errors::{Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Recipe {
    pub recipe_id: Uuid,
    pub author_user_id: Uuid,
    pub name: String,
    pub text: String,
    pub image: Option<String>,
    pub cooking_time: i32, // minutes
    pub published_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeWithDetails {
    pub recipe: Recipe,
    pub tags: Vec<Tag>,
    pub ingredients: Vec<IngredientLine>,
}

/// The short form used in favorite/cart responses and subscription previews.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct RecipeSummary {
    pub recipe_id: Uuid,
    pub name: String,
    pub image: Option<String>,
    pub cooking_time: i32,
}

#[derive(Debug, Clone, Default)]
pub struct RecipeFilter {
    pub author_user_id: Option<Uuid>,
    /// Matches recipes carrying any of these tag slugs. Empty means no tag filter.
    pub tag_slugs: Vec<String>,
    pub only_favorited: bool,
    pub only_in_shopping_cart: bool,
    /// Whose favorites and cart the two flags above refer to.
    pub viewer_user_id: Option<Uuid>,
}

const LIST_FILTER: &str = "
    WHERE ($1::uuid IS NULL OR r.author_user_id = $1)
      AND (cardinality($2::text[]) = 0 OR EXISTS (
            SELECT 1
            FROM recipe_tags rt
            JOIN tags t ON t.tag_id = rt.tag_id
            WHERE rt.recipe_id = r.recipe_id AND t.slug = ANY($2)))
      AND (NOT $3 OR EXISTS (
            SELECT 1
            FROM favorite_recipes f
            WHERE f.recipe_id = r.recipe_id AND f.user_id = $5::uuid))
      AND (NOT $4 OR EXISTS (
            SELECT 1
            FROM shopping_cart_recipes c
            WHERE c.recipe_id = r.recipe_id AND c.user_id = $5::uuid))
";

impl Recipe {
    /// Writes the recipe row, its tag links and its ingredient lines in one transaction.
    #[tracing::instrument(skip_all, fields(author_user_id = %author_user_id), err)]
    pub async fn create_with_relations(
        pool: &PgPool,
        author_user_id: Uuid,
        recipe: &ValidRecipe,
    ) -> Result<RecipeWithDetails> {
        let mut transaction = pool.begin().await?;

        let created = sqlx::query_as::<_, Recipe>(
            "
            INSERT INTO recipes (author_user_id, name, text, image, cooking_time)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            ",
        )
        .bind(author_user_id)
        .bind(&recipe.name)
        .bind(&recipe.text)
        .bind(&recipe.image)
        .bind(recipe.cooking_time)
        .fetch_one(&mut *transaction)
        .await?;

        RecipeTag::replace_for_recipe(&mut transaction, created.recipe_id, &recipe.tag_ids).await?;
        RecipeIngredient::replace_for_recipe(
            &mut transaction,
            created.recipe_id,
            &recipe.ingredients,
        )
        .await?;

        transaction.commit().await?;

        tracing::info!(recipe_id = %created.recipe_id, "Recipe created");

        Self::details_for(pool, created).await
    }

    /// Rewrites the scalar fields and replaces every tag link and ingredient line.
    /// `published_at` is never touched.
    #[tracing::instrument(skip_all, fields(recipe_id = %recipe_id), err)]
    pub async fn update_with_relations(
        pool: &PgPool,
        recipe_id: Uuid,
        recipe: &ValidRecipe,
    ) -> Result<RecipeWithDetails> {
        let mut transaction = pool.begin().await?;

        let updated = sqlx::query_as::<_, Recipe>(
            "
            UPDATE recipes
            SET name = $2,
                text = $3,
                image = $4,
                cooking_time = $5,
                updated_at = NOW()
            WHERE recipe_id = $1
            RETURNING *
            ",
        )
        .bind(recipe_id)
        .bind(&recipe.name)
        .bind(&recipe.text)
        .bind(&recipe.image)
        .bind(recipe.cooking_time)
        .fetch_optional(&mut *transaction)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Recipe {recipe_id} not found")))?;

        RecipeTag::replace_for_recipe(&mut transaction, recipe_id, &recipe.tag_ids).await?;
        RecipeIngredient::replace_for_recipe(&mut transaction, recipe_id, &recipe.ingredients)
            .await?;

        transaction.commit().await?;

        tracing::info!("Recipe updated");

        Self::details_for(pool, updated).await
    }

    /// Ingredient lines, tag links and every favorite/cart mark go with it.
    #[tracing::instrument(skip(pool), err)]
    pub async fn delete(pool: &PgPool, recipe_id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM recipes WHERE recipe_id = $1")
            .bind(recipe_id)
            .execute(pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("Recipe {recipe_id} not found")));
        }

        Ok(())
    }

    pub async fn get_by_id(pool: &PgPool, recipe_id: Uuid) -> Result<Option<Self>> {
        let recipe = sqlx::query_as::<_, Recipe>("SELECT * FROM recipes WHERE recipe_id = $1")
            .bind(recipe_id)
            .fetch_optional(pool)
            .await?;

        Ok(recipe)
    }

    pub async fn get_existing(pool: &PgPool, recipe_id: Uuid) -> Result<Self> {
        Self::get_by_id(pool, recipe_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Recipe {recipe_id} not found")))
    }

    pub async fn get_full(pool: &PgPool, recipe_id: Uuid) -> Result<Option<RecipeWithDetails>> {
        let recipe = Self::get_by_id(pool, recipe_id).await?;

        if let Some(recipe) = recipe {
            Ok(Some(Self::details_for(pool, recipe).await?))
        } else {
            Ok(None)
        }
    }

    async fn details_for(pool: &PgPool, recipe: Recipe) -> Result<RecipeWithDetails> {
        let tags = RecipeTag::get_by_recipe(pool, recipe.recipe_id).await?;
        let ingredients = RecipeIngredient::get_by_recipe(pool, recipe.recipe_id).await?;

        Ok(RecipeWithDetails {
            recipe,
            tags,
            ingredients,
        })
    }

    /// Newest first.
    pub async fn list(
        pool: &PgPool,
        filter: &RecipeFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<RecipeWithDetails>> {
        let query = format!(
            "SELECT r.* FROM recipes r {LIST_FILTER}
            ORDER BY r.published_at DESC, r.recipe_id
            LIMIT $6 OFFSET $7"
        );

        let recipes = sqlx::query_as::<_, Recipe>(&query)
            .bind(filter.author_user_id)
            .bind(&filter.tag_slugs)
            .bind(filter.only_favorited)
            .bind(filter.only_in_shopping_cart)
            .bind(filter.viewer_user_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await?;

        let mut detailed = Vec::with_capacity(recipes.len());
        for recipe in recipes {
            detailed.push(Self::details_for(pool, recipe).await?);
        }

        Ok(detailed)
    }

    pub async fn count(pool: &PgPool, filter: &RecipeFilter) -> Result<i64> {
        let query = format!("SELECT COUNT(*) FROM recipes r {LIST_FILTER}");

        let count = sqlx::query_scalar::<_, i64>(&query)
            .bind(filter.author_user_id)
            .bind(&filter.tag_slugs)
            .bind(filter.only_favorited)
            .bind(filter.only_in_shopping_cart)
            .bind(filter.viewer_user_id)
            .fetch_one(pool)
            .await?;

        Ok(count)
    }
}

impl RecipeSummary {
    pub async fn get_by_id(pool: &PgPool, recipe_id: Uuid) -> Result<Option<Self>> {
        let summary = sqlx::query_as::<_, RecipeSummary>(
            "
            SELECT recipe_id, name, image, cooking_time
            FROM recipes
            WHERE recipe_id = $1
            ",
        )
        .bind(recipe_id)
        .fetch_optional(pool)
        .await?;

        Ok(summary)
    }

    /// Newest first, truncated to `limit` when given.
    pub async fn list_by_author(
        pool: &PgPool,
        author_user_id: Uuid,
        limit: Option<i64>,
    ) -> Result<Vec<Self>> {
        let recipes = sqlx::query_as::<_, RecipeSummary>(
            "
            SELECT recipe_id, name, image, cooking_time
            FROM recipes
            WHERE author_user_id = $1
            ORDER BY published_at DESC, recipe_id
            LIMIT $2
            ",
        )
        .bind(author_user_id)
        .bind(limit)
        .fetch_all(pool)
        .await?;

        Ok(recipes)
    }

    pub async fn count_by_author(pool: &PgPool, author_user_id: Uuid) -> Result<i64> {
        let count =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM recipes WHERE author_user_id = $1")
                .bind(author_user_id)
                .fetch_one(pool)
                .await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cooking::RecipeList;
    use crate::test_utils::{create_ingredient, create_recipe, create_tag, create_user, recipe_with};

    fn tag_ids(details: &RecipeWithDetails) -> Vec<Uuid> {
        let mut ids: Vec<Uuid> = details.tags.iter().map(|t| t.tag_id).collect();
        ids.sort();
        ids
    }

    fn lines(details: &RecipeWithDetails) -> Vec<(Uuid, i32)> {
        let mut lines: Vec<(Uuid, i32)> = details
            .ingredients
            .iter()
            .map(|l| (l.ingredient_id, l.amount))
            .collect();
        lines.sort();
        lines
    }

    #[sqlx::test]
    async fn create_writes_tags_and_lines_together(pool: PgPool) {
        let author = create_user(&pool, "author").await;
        let breakfast = create_tag(&pool, "Breakfast", "breakfast").await;
        let egg = create_ingredient(&pool, "egg", "pcs").await;
        let milk = create_ingredient(&pool, "milk", "ml").await;

        let recipe = recipe_with(
            "Omelette",
            &[breakfast.tag_id],
            &[(egg.ingredient_id, 3), (milk.ingredient_id, 50)],
        );
        let created = Recipe::create_with_relations(&pool, author.user_id, &recipe)
            .await
            .unwrap();

        assert_eq!(created.recipe.name, "Omelette");
        assert_eq!(created.recipe.author_user_id, author.user_id);
        assert_eq!(tag_ids(&created), vec![breakfast.tag_id]);
        assert_eq!(created.ingredients.len(), 2);

        let reloaded = Recipe::get_full(&pool, created.recipe.recipe_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(lines(&reloaded), lines(&created));
    }

    #[sqlx::test]
    async fn update_replaces_the_whole_set_and_is_idempotent(pool: PgPool) {
        let author = create_user(&pool, "author").await;
        let breakfast = create_tag(&pool, "Breakfast", "breakfast").await;
        let dinner = create_tag(&pool, "Dinner", "dinner").await;
        let egg = create_ingredient(&pool, "egg", "pcs").await;
        let potato = create_ingredient(&pool, "potato", "g").await;

        let created = create_recipe(
            &pool,
            author.user_id,
            "Hash",
            &[breakfast.tag_id],
            &[(egg.ingredient_id, 2)],
        )
        .await;

        let replacement = recipe_with("Hash", &[dinner.tag_id], &[(potato.ingredient_id, 300)]);

        let first = Recipe::update_with_relations(&pool, created.recipe_id, &replacement)
            .await
            .unwrap();
        let second = Recipe::update_with_relations(&pool, created.recipe_id, &replacement)
            .await
            .unwrap();

        assert_eq!(tag_ids(&first), vec![dinner.tag_id]);
        assert_eq!(lines(&first), vec![(potato.ingredient_id, 300)]);
        assert_eq!(tag_ids(&second), tag_ids(&first));
        assert_eq!(lines(&second), lines(&first));
        assert_eq!(second.recipe.published_at, created.published_at);
    }

    #[sqlx::test]
    async fn failed_line_insert_leaves_tags_untouched(pool: PgPool) {
        let author = create_user(&pool, "author").await;
        let breakfast = create_tag(&pool, "Breakfast", "breakfast").await;
        let dinner = create_tag(&pool, "Dinner", "dinner").await;
        let egg = create_ingredient(&pool, "egg", "pcs").await;

        let created = create_recipe(
            &pool,
            author.user_id,
            "Eggs",
            &[breakfast.tag_id],
            &[(egg.ingredient_id, 2)],
        )
        .await;

        // Skips validation so the ingredient insert fails after the tags were replaced.
        let broken = recipe_with("Eggs", &[dinner.tag_id], &[(Uuid::new_v4(), 1)]);
        let err = Recipe::update_with_relations(&pool, created.recipe_id, &broken)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)), "got {err:?}");

        let reloaded = Recipe::get_full(&pool, created.recipe_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(tag_ids(&reloaded), vec![breakfast.tag_id]);
        assert_eq!(lines(&reloaded), vec![(egg.ingredient_id, 2)]);
    }

    #[sqlx::test]
    async fn duplicate_line_rolls_back_the_new_recipe(pool: PgPool) {
        let author = create_user(&pool, "author").await;
        let breakfast = create_tag(&pool, "Breakfast", "breakfast").await;
        let egg = create_ingredient(&pool, "egg", "pcs").await;

        let broken = recipe_with(
            "Eggs",
            &[breakfast.tag_id],
            &[(egg.ingredient_id, 1), (egg.ingredient_id, 2)],
        );
        let err = Recipe::create_with_relations(&pool, author.user_id, &broken)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Conflict(_)), "got {err:?}");

        assert_eq!(Recipe::count(&pool, &RecipeFilter::default()).await.unwrap(), 0);
    }

    #[sqlx::test]
    async fn updating_a_missing_recipe_is_not_found(pool: PgPool) {
        let breakfast = create_tag(&pool, "Breakfast", "breakfast").await;
        let egg = create_ingredient(&pool, "egg", "pcs").await;

        let recipe = recipe_with("Eggs", &[breakfast.tag_id], &[(egg.ingredient_id, 1)]);
        let err = Recipe::update_with_relations(&pool, Uuid::new_v4(), &recipe)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::NotFound(_)));
    }

    #[sqlx::test]
    async fn delete_cascades_to_lines_and_marks(pool: PgPool) {
        let author = create_user(&pool, "author").await;
        let breakfast = create_tag(&pool, "Breakfast", "breakfast").await;
        let egg = create_ingredient(&pool, "egg", "pcs").await;
        let created = create_recipe(
            &pool,
            author.user_id,
            "Eggs",
            &[breakfast.tag_id],
            &[(egg.ingredient_id, 2)],
        )
        .await;

        RecipeList::Favorites
            .add(&pool, author.user_id, created.recipe_id)
            .await
            .unwrap();
        RecipeList::ShoppingCart
            .add(&pool, author.user_id, created.recipe_id)
            .await
            .unwrap();

        Recipe::delete(&pool, created.recipe_id).await.unwrap();

        let leftover_lines = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM recipe_ingredients WHERE recipe_id = $1",
        )
        .bind(created.recipe_id)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(leftover_lines, 0);
        assert!(RecipeList::ShoppingCart
            .is_empty_for(&pool, author.user_id)
            .await
            .unwrap());

        let err = Recipe::delete(&pool, created.recipe_id).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[sqlx::test]
    async fn list_filters_by_tag_author_and_marks(pool: PgPool) {
        let alice = create_user(&pool, "alice").await;
        let bob = create_user(&pool, "bob").await;
        let breakfast = create_tag(&pool, "Breakfast", "breakfast").await;
        let dinner = create_tag(&pool, "Dinner", "dinner").await;
        let egg = create_ingredient(&pool, "egg", "pcs").await;

        let pancakes = create_recipe(
            &pool,
            alice.user_id,
            "Pancakes",
            &[breakfast.tag_id],
            &[(egg.ingredient_id, 2)],
        )
        .await;
        let stew = create_recipe(
            &pool,
            bob.user_id,
            "Stew",
            &[dinner.tag_id],
            &[(egg.ingredient_id, 1)],
        )
        .await;

        RecipeList::Favorites
            .add(&pool, alice.user_id, stew.recipe_id)
            .await
            .unwrap();

        let names = |recipes: Vec<RecipeWithDetails>| {
            recipes
                .into_iter()
                .map(|r| r.recipe.name)
                .collect::<Vec<_>>()
        };

        let by_tag = RecipeFilter {
            tag_slugs: vec!["breakfast".to_string()],
            ..Default::default()
        };
        assert_eq!(
            names(Recipe::list(&pool, &by_tag, 10, 0).await.unwrap()),
            vec!["Pancakes"]
        );

        let by_author = RecipeFilter {
            author_user_id: Some(bob.user_id),
            ..Default::default()
        };
        assert_eq!(
            names(Recipe::list(&pool, &by_author, 10, 0).await.unwrap()),
            vec!["Stew"]
        );

        let favorited = RecipeFilter {
            only_favorited: true,
            viewer_user_id: Some(alice.user_id),
            ..Default::default()
        };
        assert_eq!(
            names(Recipe::list(&pool, &favorited, 10, 0).await.unwrap()),
            vec!["Stew"]
        );
        assert_eq!(Recipe::count(&pool, &favorited).await.unwrap(), 1);

        let anonymous_favorites = RecipeFilter {
            only_favorited: true,
            ..Default::default()
        };
        assert_eq!(Recipe::count(&pool, &anonymous_favorites).await.unwrap(), 0);

        let everything = Recipe::list(&pool, &RecipeFilter::default(), 10, 0)
            .await
            .unwrap();
        let mut ids: Vec<Uuid> = everything.iter().map(|r| r.recipe.recipe_id).collect();
        ids.sort();
        let mut expected = vec![pancakes.recipe_id, stew.recipe_id];
        expected.sort();
        assert_eq!(ids, expected);
    }
}
