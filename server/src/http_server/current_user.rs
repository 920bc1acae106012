use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use db::users::{AuthToken, UserFromDB};

use super::errors::ServerError;
use crate::{crypto::hash_token, AppState};

const TOKEN_PREFIX: &str = "Token ";

/// The user behind a valid `Authorization: Token <token>` header.
pub(crate) struct CurrentUser {
    pub user: UserFromDB,
    pub token_hash: String,
}

impl CurrentUser {
    pub fn can_edit(&self, author_user_id: uuid::Uuid) -> bool {
        self.user.is_staff || self.user.user_id == author_user_id
    }
}

/// Like [`CurrentUser`], but anonymous requests are let through. A bad token still fails.
pub(crate) struct MaybeCurrentUser(pub Option<CurrentUser>);

impl MaybeCurrentUser {
    pub fn user(&self) -> Option<&UserFromDB> {
        self.0.as_ref().map(|current| &current.user)
    }

    pub fn user_id(&self) -> Option<uuid::Uuid> {
        self.user().map(|user| user.user_id)
    }
}

fn presented_token(parts: &Parts) -> Result<Option<&str>, ServerError> {
    let Some(header) = parts.headers.get(AUTHORIZATION) else {
        return Ok(None);
    };

    let token = header
        .to_str()
        .ok()
        .and_then(|value| value.strip_prefix(TOKEN_PREFIX))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| {
            ServerError::unauthorized("Authorization header must look like `Token <token>`")
        })?;

    Ok(Some(token))
}

async fn resolve(parts: &Parts, state: &AppState) -> Result<Option<CurrentUser>, ServerError> {
    let Some(token) = presented_token(parts)? else {
        return Ok(None);
    };

    let token_hash = hash_token(token);
    let user = AuthToken::find_user(&state.db, &token_hash)
        .await?
        .ok_or_else(|| ServerError::unauthorized("Invalid token"))?;
    tracing::Span::current().record("user.id", tracing::field::display(user.user_id));

    Ok(Some(CurrentUser { user, token_hash }))
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ServerError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        resolve(parts, state)
            .await?
            .ok_or_else(|| {
                ServerError::unauthorized("Authentication credentials were not provided")
            })
    }
}

impl FromRequestParts<AppState> for MaybeCurrentUser {
    type Rejection = ServerError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(Self(resolve(parts, state).await?))
    }
}
