use axum::{extract::State, Json};
use db::{cooking::Ingredient, Error};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    http_server::{
        extract::{ApiPath, ApiQuery},
        ResponseResult,
    },
    AppState,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct IngredientResponse {
    pub id: Uuid,
    pub name: String,
    pub measurement_unit: String,
}

impl From<Ingredient> for IngredientResponse {
    fn from(ingredient: Ingredient) -> Self {
        Self {
            id: ingredient.ingredient_id,
            name: ingredient.name,
            measurement_unit: ingredient.measurement_unit,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct IngredientSearch {
    name: Option<String>,
}

#[axum_macros::debug_handler]
pub(crate) async fn list_ingredients(
    State(state): State<AppState>,
    ApiQuery(search): ApiQuery<IngredientSearch>,
) -> ResponseResult<Json<Vec<IngredientResponse>>> {
    let ingredients = Ingredient::search_by_prefix(&state.db, search.name.as_deref()).await?;

    Ok(Json(
        ingredients.into_iter().map(IngredientResponse::from).collect(),
    ))
}

#[axum_macros::debug_handler]
pub(crate) async fn get_ingredient(
    State(state): State<AppState>,
    ApiPath(ingredient_id): ApiPath<Uuid>,
) -> ResponseResult<Json<IngredientResponse>> {
    let ingredient = Ingredient::get_by_id(&state.db, ingredient_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Ingredient {ingredient_id} not found")))?;

    Ok(Json(ingredient.into()))
}
