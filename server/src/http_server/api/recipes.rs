use axum::{
    extract::{OriginalUri, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use db::{
    cooking::{
        IngredientLine, Recipe, RecipeDraft, RecipeFilter, RecipeList, RecipeSummary,
        RecipeWithDetails, ShoppingList,
    },
    users::UserFromDB,
    PgPool,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{
    pagination::{Page, PageParams},
    tags::TagResponse,
    users::UserResponse,
};
use crate::{
    http_server::{
        current_user::{CurrentUser, MaybeCurrentUser},
        errors::ServerError,
        extract::{ApiJson, ApiPath, ApiQuery},
        ResponseResult,
    },
    AppState,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct RecipeSummaryResponse {
    pub id: Uuid,
    pub name: String,
    pub image: Option<String>,
    pub cooking_time: i32,
}

impl From<RecipeSummary> for RecipeSummaryResponse {
    fn from(summary: RecipeSummary) -> Self {
        Self {
            id: summary.recipe_id,
            name: summary.name,
            image: summary.image,
            cooking_time: summary.cooking_time,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct IngredientLineResponse {
    pub id: Uuid,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

impl From<IngredientLine> for IngredientLineResponse {
    fn from(line: IngredientLine) -> Self {
        Self {
            id: line.ingredient_id,
            name: line.name,
            measurement_unit: line.measurement_unit,
            amount: line.amount,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct RecipeResponse {
    pub id: Uuid,
    pub tags: Vec<TagResponse>,
    pub author: UserResponse,
    pub ingredients: Vec<IngredientLineResponse>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub name: String,
    pub image: Option<String>,
    pub text: String,
    pub cooking_time: i32,
    pub pub_date: DateTime<Utc>,
}

impl RecipeResponse {
    async fn build(
        pool: &PgPool,
        details: RecipeWithDetails,
        viewer: Option<Uuid>,
    ) -> db::Result<Self> {
        let RecipeWithDetails {
            recipe,
            tags,
            ingredients,
        } = details;

        let author = UserFromDB::get_existing(pool, recipe.author_user_id).await?;
        let (is_favorited, is_in_shopping_cart) = match viewer {
            Some(viewer) => (
                RecipeList::Favorites
                    .contains(pool, viewer, recipe.recipe_id)
                    .await?,
                RecipeList::ShoppingCart
                    .contains(pool, viewer, recipe.recipe_id)
                    .await?,
            ),
            None => (false, false),
        };

        Ok(Self {
            id: recipe.recipe_id,
            tags: tags.into_iter().map(TagResponse::from).collect(),
            author: UserResponse::build(pool, author, viewer).await?,
            ingredients: ingredients
                .into_iter()
                .map(IngredientLineResponse::from)
                .collect(),
            is_favorited,
            is_in_shopping_cart,
            name: recipe.name,
            image: recipe.image,
            text: recipe.text,
            cooking_time: recipe.cooking_time,
            pub_date: recipe.published_at,
        })
    }
}

/// `tags` may repeat (`?tags=lunch&tags=dinner`); the flags take `1` or `0`.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct RecipeListQuery {
    page: Option<i64>,
    limit: Option<i64>,
    author: Option<Uuid>,
    #[serde(default)]
    tags: Vec<String>,
    is_favorited: Option<u8>,
    is_in_shopping_cart: Option<u8>,
}

impl RecipeListQuery {
    fn filter(&self, viewer: Option<Uuid>) -> RecipeFilter {
        RecipeFilter {
            author_user_id: self.author,
            tag_slugs: self.tags.clone(),
            only_favorited: self.is_favorited == Some(1),
            only_in_shopping_cart: self.is_in_shopping_cart == Some(1),
            viewer_user_id: viewer,
        }
    }
}

#[axum_macros::debug_handler]
pub(crate) async fn list_recipes(
    viewer: MaybeCurrentUser,
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<RecipeListQuery>,
    OriginalUri(uri): OriginalUri,
) -> ResponseResult<Json<Page<RecipeResponse>>> {
    let params = PageParams::new(query.page, query.limit);
    let viewer_id = viewer.user_id();
    let filter = query.filter(viewer_id);

    if viewer_id.is_none() && (filter.only_favorited || filter.only_in_shopping_cart) {
        return Ok(Json(Page::empty(params, &state.app, &uri)));
    }

    let recipes = Recipe::list(&state.db, &filter, params.limit, params.offset()).await?;
    let count = Recipe::count(&state.db, &filter).await?;

    let mut results = Vec::with_capacity(recipes.len());
    for details in recipes {
        results.push(RecipeResponse::build(&state.db, details, viewer_id).await?);
    }

    Ok(Json(Page::new(results, count, params, &state.app, &uri)))
}

#[axum_macros::debug_handler]
pub(crate) async fn get_recipe(
    viewer: MaybeCurrentUser,
    State(state): State<AppState>,
    ApiPath(recipe_id): ApiPath<Uuid>,
) -> ResponseResult<Json<RecipeResponse>> {
    let details = Recipe::get_full(&state.db, recipe_id)
        .await?
        .ok_or_else(|| db::Error::NotFound(format!("Recipe {recipe_id} not found")))?;

    Ok(Json(
        RecipeResponse::build(&state.db, details, viewer.user_id()).await?,
    ))
}

#[axum_macros::debug_handler]
pub(crate) async fn create_recipe(
    current_user: CurrentUser,
    State(state): State<AppState>,
    ApiJson(draft): ApiJson<RecipeDraft>,
) -> ResponseResult<impl IntoResponse> {
    let author_id = current_user.user.user_id;
    let recipe = draft.validate_against(&state.db).await?;
    let details = Recipe::create_with_relations(&state.db, author_id, &recipe).await?;

    let location = state
        .app
        .app_url(&format!("/api/recipes/{}", details.recipe.recipe_id));
    let response = RecipeResponse::build(&state.db, details, Some(author_id)).await?;

    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(response),
    ))
}

async fn editable_recipe(
    pool: &PgPool,
    current_user: &CurrentUser,
    recipe_id: Uuid,
) -> ResponseResult<Recipe> {
    let recipe = Recipe::get_existing(pool, recipe_id).await?;

    if !current_user.can_edit(recipe.author_user_id) {
        return Err(ServerError::forbidden(
            "Only the author can change this recipe",
        ));
    }

    Ok(recipe)
}

#[axum_macros::debug_handler]
pub(crate) async fn update_recipe(
    current_user: CurrentUser,
    State(state): State<AppState>,
    ApiPath(recipe_id): ApiPath<Uuid>,
    ApiJson(draft): ApiJson<RecipeDraft>,
) -> ResponseResult<Json<RecipeResponse>> {
    editable_recipe(&state.db, &current_user, recipe_id).await?;

    let recipe = draft.validate_against(&state.db).await?;
    let details = Recipe::update_with_relations(&state.db, recipe_id, &recipe).await?;

    Ok(Json(
        RecipeResponse::build(&state.db, details, Some(current_user.user.user_id)).await?,
    ))
}

#[axum_macros::debug_handler]
pub(crate) async fn delete_recipe(
    current_user: CurrentUser,
    State(state): State<AppState>,
    ApiPath(recipe_id): ApiPath<Uuid>,
) -> ResponseResult<StatusCode> {
    editable_recipe(&state.db, &current_user, recipe_id).await?;
    Recipe::delete(&state.db, recipe_id).await?;

    Ok(StatusCode::NO_CONTENT)
}

async fn add_mark(
    list: RecipeList,
    current_user: &CurrentUser,
    state: &AppState,
    recipe_id: Uuid,
) -> ResponseResult<(StatusCode, Json<RecipeSummaryResponse>)> {
    let summary = list
        .add(&state.db, current_user.user.user_id, recipe_id)
        .await?;

    Ok((StatusCode::CREATED, Json(summary.into())))
}

async fn remove_mark(
    list: RecipeList,
    current_user: &CurrentUser,
    state: &AppState,
    recipe_id: Uuid,
) -> ResponseResult<StatusCode> {
    list.remove(&state.db, current_user.user.user_id, recipe_id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

#[axum_macros::debug_handler]
pub(crate) async fn add_favorite(
    current_user: CurrentUser,
    State(state): State<AppState>,
    ApiPath(recipe_id): ApiPath<Uuid>,
) -> ResponseResult<(StatusCode, Json<RecipeSummaryResponse>)> {
    add_mark(RecipeList::Favorites, &current_user, &state, recipe_id).await
}

#[axum_macros::debug_handler]
pub(crate) async fn remove_favorite(
    current_user: CurrentUser,
    State(state): State<AppState>,
    ApiPath(recipe_id): ApiPath<Uuid>,
) -> ResponseResult<StatusCode> {
    remove_mark(RecipeList::Favorites, &current_user, &state, recipe_id).await
}

#[axum_macros::debug_handler]
pub(crate) async fn add_to_shopping_cart(
    current_user: CurrentUser,
    State(state): State<AppState>,
    ApiPath(recipe_id): ApiPath<Uuid>,
) -> ResponseResult<(StatusCode, Json<RecipeSummaryResponse>)> {
    add_mark(RecipeList::ShoppingCart, &current_user, &state, recipe_id).await
}

#[axum_macros::debug_handler]
pub(crate) async fn remove_from_shopping_cart(
    current_user: CurrentUser,
    State(state): State<AppState>,
    ApiPath(recipe_id): ApiPath<Uuid>,
) -> ResponseResult<StatusCode> {
    remove_mark(RecipeList::ShoppingCart, &current_user, &state, recipe_id).await
}

#[axum_macros::debug_handler]
pub(crate) async fn download_shopping_cart(
    current_user: CurrentUser,
    State(state): State<AppState>,
) -> ResponseResult<impl IntoResponse> {
    let list = ShoppingList::for_user(&state.db, &current_user.user).await?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", list.filename()),
            ),
        ],
        list.render_text(),
    ))
}
