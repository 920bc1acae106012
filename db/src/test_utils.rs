use sqlx::PgPool;
use uuid::Uuid;

use crate::cooking::{Ingredient, IngredientAmount, Recipe, Tag, ValidRecipe};
use crate::users::{NewUser, UserFromDB};

pub(crate) async fn create_user(pool: &PgPool, username: &str) -> UserFromDB {
    UserFromDB::create(
        pool,
        NewUser {
            email: format!("{username}@example.com"),
            username: username.to_string(),
            first_name: "Test".to_string(),
            last_name: "Cook".to_string(),
            password_hash: "not-a-real-hash".to_string(),
        },
    )
    .await
    .expect("Failed to create test user")
}

pub(crate) async fn create_tag(pool: &PgPool, name: &str, slug: &str) -> Tag {
    Tag::create(pool, name.to_string(), "#E26C2D".to_string(), slug.to_string())
        .await
        .expect("Failed to create test tag")
}

pub(crate) async fn create_ingredient(
    pool: &PgPool,
    name: &str,
    measurement_unit: &str,
) -> Ingredient {
    Ingredient::create(pool, name.to_string(), measurement_unit.to_string())
        .await
        .expect("Failed to create test ingredient")
}

/// Builds an already-validated payload, skipping the reference checks.
pub(crate) fn recipe_with(name: &str, tag_ids: &[Uuid], lines: &[(Uuid, i32)]) -> ValidRecipe {
    ValidRecipe {
        name: name.to_string(),
        text: format!("How to make {name}"),
        image: None,
        cooking_time: 15,
        tag_ids: tag_ids.to_vec(),
        ingredients: lines
            .iter()
            .map(|&(ingredient_id, amount)| IngredientAmount {
                ingredient_id,
                amount,
            })
            .collect(),
    }
}

pub(crate) async fn create_recipe(
    pool: &PgPool,
    author_user_id: Uuid,
    name: &str,
    tag_ids: &[Uuid],
    lines: &[(Uuid, i32)],
) -> Recipe {
    Recipe::create_with_relations(pool, author_user_id, &recipe_with(name, tag_ids, lines))
        .await
        .expect("Failed to create test recipe")
        .recipe
}
