use axum::{
    extract::{OriginalUri, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use db::{
    cooking::RecipeSummary,
    errors::ValidationErrors,
    follows::Follow,
    users::{NewUser, UserFromDB},
    PgPool,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{
    pagination::{Page, PageParams, PageQuery},
    recipes::RecipeSummaryResponse,
};
use crate::{
    crypto::verify_password_blocking,
    http_server::{
        current_user::{CurrentUser, MaybeCurrentUser},
        extract::{ApiJson, ApiPath, ApiQuery},
        ResponseResult,
    },
    AppState,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct UserResponse {
    pub email: String,
    pub id: Uuid,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
}

impl UserResponse {
    pub async fn build(pool: &PgPool, user: UserFromDB, viewer: Option<Uuid>) -> db::Result<Self> {
        let is_subscribed = match viewer {
            Some(viewer) if viewer != user.user_id => {
                Follow::exists(pool, viewer, user.user_id).await?
            }
            _ => false,
        };

        Ok(Self {
            email: user.email,
            id: user.user_id,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
            is_subscribed,
        })
    }
}

/// A followed author with a preview of their newest recipes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct SubscriptionResponse {
    #[serde(flatten)]
    pub user: UserResponse,
    pub recipes: Vec<RecipeSummaryResponse>,
    pub recipes_count: i64,
}

impl SubscriptionResponse {
    async fn build(
        pool: &PgPool,
        author: UserFromDB,
        viewer: Uuid,
        recipes_limit: Option<i64>,
    ) -> db::Result<Self> {
        let author_id = author.user_id;
        let recipes = RecipeSummary::list_by_author(pool, author_id, recipes_limit).await?;
        let recipes_count = RecipeSummary::count_by_author(pool, author_id).await?;

        Ok(Self {
            user: UserResponse::build(pool, author, Some(viewer)).await?,
            recipes: recipes.into_iter().map(RecipeSummaryResponse::from).collect(),
            recipes_count,
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct CreatedUserResponse {
    pub email: String,
    pub id: Uuid,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SignUpRequest {
    email: Option<String>,
    username: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    password: Option<String>,
}

const MAX_NAME_LENGTH: usize = 150;
const MAX_EMAIL_LENGTH: usize = 254;

fn required(errors: &mut ValidationErrors, field: &'static str, value: Option<String>) -> String {
    let value = value.map(|v| v.trim().to_string()).unwrap_or_default();
    if value.is_empty() {
        errors.push(field, "This field is required");
    }
    value
}

fn too_long(errors: &mut ValidationErrors, field: &'static str, value: &str, max: usize) {
    if value.chars().count() > max {
        errors.push(field, format!("Ensure this field has no more than {max} characters"));
    }
}

impl SignUpRequest {
    /// Returns the cleaned fields and the password, in that order.
    fn validate(self) -> Result<(NewUser, String), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let email = required(&mut errors, "email", self.email);
        let username = required(&mut errors, "username", self.username);
        let first_name = required(&mut errors, "first_name", self.first_name);
        let last_name = required(&mut errors, "last_name", self.last_name);
        let password = self.password.unwrap_or_default();
        if password.is_empty() {
            errors.push("password", "This field is required");
        }

        if !email.is_empty() && !looks_like_email(&email) {
            errors.push("email", "Enter a valid email address");
        }
        too_long(&mut errors, "email", &email, MAX_EMAIL_LENGTH);

        let username_chars_ok = username
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '.' | '@' | '+' | '-' | '_'));
        if !username_chars_ok {
            errors.push(
                "username",
                "Usernames may only contain letters, digits and @/./+/-/_",
            );
        }
        too_long(&mut errors, "username", &username, MAX_NAME_LENGTH);
        too_long(&mut errors, "first_name", &first_name, MAX_NAME_LENGTH);
        too_long(&mut errors, "last_name", &last_name, MAX_NAME_LENGTH);

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok((
            NewUser {
                email: email.to_lowercase(),
                username,
                first_name,
                last_name,
                password_hash: String::new(),
            },
            password,
        ))
    }
}

fn looks_like_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };

    !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
}

#[axum_macros::debug_handler]
pub(crate) async fn sign_up(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<SignUpRequest>,
) -> ResponseResult<impl IntoResponse> {
    let (mut new_user, password) = request.validate()?;
    new_user.password_hash = state.passwords.hash_blocking(password).await?;

    let user = UserFromDB::create(&state.db, new_user).await?;
    tracing::info!(user_id = %user.user_id, "User signed up");

    Ok((
        StatusCode::CREATED,
        Json(CreatedUserResponse {
            email: user.email,
            id: user.user_id,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
        }),
    ))
}

#[axum_macros::debug_handler]
pub(crate) async fn list_users(
    viewer: MaybeCurrentUser,
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<PageQuery>,
    OriginalUri(uri): OriginalUri,
) -> ResponseResult<Json<Page<UserResponse>>> {
    let params = query.params();
    let users = UserFromDB::list(&state.db, params.limit, params.offset()).await?;
    let count = UserFromDB::count(&state.db).await?;

    let mut results = Vec::with_capacity(users.len());
    for user in users {
        results.push(UserResponse::build(&state.db, user, viewer.user_id()).await?);
    }

    Ok(Json(Page::new(results, count, params, &state.app, &uri)))
}

#[axum_macros::debug_handler]
pub(crate) async fn get_user(
    viewer: MaybeCurrentUser,
    State(state): State<AppState>,
    ApiPath(user_id): ApiPath<Uuid>,
) -> ResponseResult<Json<UserResponse>> {
    let user = UserFromDB::get_existing(&state.db, user_id).await?;

    Ok(Json(
        UserResponse::build(&state.db, user, viewer.user_id()).await?,
    ))
}

#[axum_macros::debug_handler]
pub(crate) async fn me(
    current_user: CurrentUser,
    State(state): State<AppState>,
) -> ResponseResult<Json<UserResponse>> {
    let viewer = current_user.user.user_id;

    Ok(Json(
        UserResponse::build(&state.db, current_user.user, Some(viewer)).await?,
    ))
}

#[derive(Debug, Deserialize)]
pub(crate) struct SetPasswordRequest {
    current_password: Option<String>,
    new_password: Option<String>,
}

#[axum_macros::debug_handler]
pub(crate) async fn set_password(
    current_user: CurrentUser,
    State(state): State<AppState>,
    ApiJson(request): ApiJson<SetPasswordRequest>,
) -> ResponseResult<StatusCode> {
    let mut errors = ValidationErrors::new();
    let current_password = request.current_password.unwrap_or_default();
    if current_password.is_empty() {
        errors.push("current_password", "This field is required");
    }
    let new_password = request.new_password.unwrap_or_default();
    if new_password.is_empty() {
        errors.push("new_password", "This field is required");
    }
    if !errors.is_empty() {
        return Err(errors.into());
    }

    let matches = verify_password_blocking(
        current_password,
        current_user.user.password_hash.clone(),
    )
    .await?;
    if !matches {
        return Err(ValidationErrors::single("current_password", "Incorrect password").into());
    }

    let password_hash = state.passwords.hash_blocking(new_password).await?;
    current_user
        .user
        .set_password_hash(&state.db, password_hash)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// `None` keeps every recipe; a negative limit is rejected before anything is written.
fn checked_recipes_limit(recipes_limit: Option<i64>) -> Result<Option<i64>, ValidationErrors> {
    match recipes_limit {
        Some(limit) if limit < 0 => Err(ValidationErrors::single(
            "recipes_limit",
            "Ensure this value is greater than or equal to 0",
        )),
        limit => Ok(limit),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct SubscriptionsQuery {
    page: Option<i64>,
    limit: Option<i64>,
    recipes_limit: Option<i64>,
}

#[axum_macros::debug_handler]
pub(crate) async fn subscriptions(
    current_user: CurrentUser,
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<SubscriptionsQuery>,
    OriginalUri(uri): OriginalUri,
) -> ResponseResult<Json<Page<SubscriptionResponse>>> {
    let params = PageParams::new(query.page, query.limit);
    let recipes_limit = checked_recipes_limit(query.recipes_limit)?;
    let viewer = current_user.user.user_id;

    let authors = Follow::list_followed(&state.db, viewer, params.limit, params.offset()).await?;
    let count = Follow::count_followed(&state.db, viewer).await?;

    let mut results = Vec::with_capacity(authors.len());
    for author in authors {
        results.push(
            SubscriptionResponse::build(&state.db, author, viewer, recipes_limit).await?,
        );
    }

    Ok(Json(Page::new(results, count, params, &state.app, &uri)))
}

#[derive(Debug, Deserialize)]
pub(crate) struct RecipesLimitQuery {
    recipes_limit: Option<i64>,
}

#[axum_macros::debug_handler]
pub(crate) async fn subscribe(
    current_user: CurrentUser,
    State(state): State<AppState>,
    ApiPath(author_id): ApiPath<Uuid>,
    ApiQuery(query): ApiQuery<RecipesLimitQuery>,
) -> ResponseResult<impl IntoResponse> {
    let recipes_limit = checked_recipes_limit(query.recipes_limit)?;
    let viewer = current_user.user.user_id;
    Follow::create(&state.db, viewer, author_id).await?;

    let author = UserFromDB::get_existing(&state.db, author_id).await?;
    let response = SubscriptionResponse::build(&state.db, author, viewer, recipes_limit).await?;

    Ok((StatusCode::CREATED, Json(response)))
}

#[axum_macros::debug_handler]
pub(crate) async fn unsubscribe(
    current_user: CurrentUser,
    State(state): State<AppState>,
    ApiPath(author_id): ApiPath<Uuid>,
) -> ResponseResult<StatusCode> {
    Follow::delete(&state.db, current_user.user.user_id, author_id).await?;

    Ok(StatusCode::NO_CONTENT)
}
