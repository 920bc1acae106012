use axum::{
    body::Body,
    http::{header, Method, Request, Response},
    Router,
};
use db::{
    cooking::{Ingredient, Tag},
    users::{AuthToken, NewUser, UserFromDB},
};
use serde::de::DeserializeOwned;
use sqlx::PgPool;
use tower::ServiceExt as _;

use crate::{
    crypto::{generate_token, hash_token, PasswordHashing},
    http_server::routes::make_router,
    AppConfig, AppState,
};

pub const TEST_PASSWORD: &str = "correct horse battery staple";

pub fn create_test_app(pool: PgPool) -> Router {
    let state = AppState {
        app: AppConfig::for_tests(),
        db: pool,
        passwords: PasswordHashing::new(true),
    };

    make_router().with_state(state)
}

/// A user that can log in with [`TEST_PASSWORD`], plus a ready-made API token.
pub async fn create_user_with_token(pool: &PgPool, username: &str) -> (UserFromDB, String) {
    let password_hash = PasswordHashing::new(true).hash(TEST_PASSWORD).unwrap();
    let user = UserFromDB::create(
        pool,
        NewUser {
            email: format!("{username}@example.com"),
            username: username.to_string(),
            first_name: username.to_string(),
            last_name: "Cook".to_string(),
            password_hash,
        },
    )
    .await
    .unwrap();

    let token = generate_token();
    AuthToken::create(pool, user.user_id, hash_token(&token))
        .await
        .unwrap();

    (user, token)
}

pub async fn create_tag(pool: &PgPool, slug: &str) -> Tag {
    Tag::create(pool, slug.to_uppercase(), "#49B64E".to_string(), slug.to_string())
        .await
        .unwrap()
}

pub async fn create_ingredient(pool: &PgPool, name: &str, measurement_unit: &str) -> Ingredient {
    Ingredient::create(pool, name.to_string(), measurement_unit.to_string())
        .await
        .unwrap()
}

pub fn request(method: Method, uri: &str, token: Option<&str>) -> Request<Body> {
    authorized(Request::builder().method(method).uri(uri), token)
        .body(Body::empty())
        .unwrap()
}

pub fn json_request(
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: &serde_json::Value,
) -> Request<Body> {
    authorized(Request::builder().method(method).uri(uri), token)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn authorized(
    builder: axum::http::request::Builder,
    token: Option<&str>,
) -> axum::http::request::Builder {
    match token {
        Some(token) => builder.header(header::AUTHORIZATION, format!("Token {token}")),
        None => builder,
    }
}

pub async fn send(app: &Router, request: Request<Body>) -> Response<Body> {
    app.clone().oneshot(request).await.unwrap()
}

pub async fn response_body_json<T: DeserializeOwned>(response: Response<Body>) -> T {
    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body_bytes).unwrap()
}

pub async fn response_body_text(response: Response<Body>) -> String {
    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(body_bytes.to_vec()).unwrap()
}
