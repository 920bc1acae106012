use axum::{
    http::{StatusCode, Uri},
    routing::{get, post},
    Router,
};
use color_eyre::eyre::eyre;

use super::{
    api::{auth, ingredients, recipes, tags, users},
    errors::WithStatus as _,
    ResponseResult,
};
use crate::AppState;

pub(crate) fn make_router() -> Router<AppState> {
    Router::new()
        .nest("/api", api_routes())
        .fallback(fallback)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/token/login", post(auth::login))
        .route("/auth/token/logout", post(auth::logout))
        .route("/users", get(users::list_users).post(users::sign_up))
        .route("/users/me", get(users::me))
        .route("/users/set_password", post(users::set_password))
        .route("/users/subscriptions", get(users::subscriptions))
        .route("/users/{id}", get(users::get_user))
        .route(
            "/users/{id}/subscribe",
            post(users::subscribe).delete(users::unsubscribe),
        )
        .route("/tags", get(tags::list_tags))
        .route("/tags/{id}", get(tags::get_tag))
        .route("/ingredients", get(ingredients::list_ingredients))
        .route("/ingredients/{id}", get(ingredients::get_ingredient))
        .route(
            "/recipes",
            get(recipes::list_recipes).post(recipes::create_recipe),
        )
        .route(
            "/recipes/download_shopping_cart",
            get(recipes::download_shopping_cart),
        )
        .route(
            "/recipes/{id}",
            get(recipes::get_recipe)
                .patch(recipes::update_recipe)
                .delete(recipes::delete_recipe),
        )
        .route(
            "/recipes/{id}/favorite",
            post(recipes::add_favorite).delete(recipes::remove_favorite),
        )
        .route(
            "/recipes/{id}/shopping_cart",
            post(recipes::add_to_shopping_cart).delete(recipes::remove_from_shopping_cart),
        )
}

async fn fallback(uri: Uri) -> ResponseResult<()> {
    Err(eyre!("No route for {}", uri.path())).with_status(StatusCode::NOT_FOUND)
}
