use axum::{extract::State, http::StatusCode, Json};
use db::{
    errors::ValidationErrors,
    users::{AuthToken, UserFromDB},
};
use serde::{Deserialize, Serialize};

use crate::{
    crypto::{generate_token, hash_token, verify_password_blocking},
    http_server::{current_user::CurrentUser, extract::ApiJson, ResponseResult},
    AppState,
};

#[derive(Debug, Deserialize)]
pub(crate) struct LoginRequest {
    email: String,
    password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct LoginResponse {
    pub auth_token: String,
}

const BAD_CREDENTIALS: &str = "Unable to log in with the provided credentials";

#[axum_macros::debug_handler]
pub(crate) async fn login(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> ResponseResult<Json<LoginResponse>> {
    let email = request.email.trim().to_lowercase();
    let Some(user) = UserFromDB::get_by_email(&state.db, &email).await? else {
        return Err(ValidationErrors::single("credentials", BAD_CREDENTIALS).into());
    };

    if !verify_password_blocking(request.password, user.password_hash.clone()).await? {
        tracing::info!(user_id = %user.user_id, "Login rejected");
        return Err(ValidationErrors::single("credentials", BAD_CREDENTIALS).into());
    }

    let token = generate_token();
    AuthToken::create(&state.db, user.user_id, hash_token(&token)).await?;
    tracing::info!(user_id = %user.user_id, "Token issued");

    Ok(Json(LoginResponse { auth_token: token }))
}

#[axum_macros::debug_handler]
pub(crate) async fn logout(
    current_user: CurrentUser,
    State(state): State<AppState>,
) -> ResponseResult<StatusCode> {
    AuthToken::delete(&state.db, &current_user.token_hash).await?;

    Ok(StatusCode::NO_CONTENT)
}
