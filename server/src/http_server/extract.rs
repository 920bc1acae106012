use axum::{
    extract::{rejection::PathRejection, FromRequest, Request},
    http::StatusCode,
    Json,
};
use axum_extra::extract::QueryRejection;
use axum_macros::FromRequestParts;
use color_eyre::eyre::eyre;
use db::errors::ValidationErrors;
use serde::de::DeserializeOwned;
use serde_path_to_error::Segment;

use super::errors::ServerError;

/// JSON body whose type errors come back as field-level validation failures.
#[derive(Debug)]
pub(crate) struct ApiJson<T>(pub T);

impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<serde_json::Value>::from_request(req, state)
            .await
            .map_err(|rejection| {
                ServerError::new(eyre!("{}", rejection.body_text()), StatusCode::BAD_REQUEST)
            })?;

        serde_path_to_error::deserialize(value)
            .map(Self)
            .map_err(|err| field_errors(&err).into())
    }
}

/// The innermost named field the error was found on, e.g. `amount` for `ingredients[0].amount`.
fn field_errors(err: &serde_path_to_error::Error<serde_json::Error>) -> ValidationErrors {
    let field = err
        .path()
        .iter()
        .rev()
        .find_map(|segment| match segment {
            Segment::Map { key } => Some(key.clone()),
            _ => None,
        })
        .unwrap_or_else(|| "non_field_errors".to_string());

    ValidationErrors::single(field, err.inner().to_string())
}

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ServerError))]
pub(crate) struct ApiPath<T>(pub T);

impl From<PathRejection> for ServerError {
    fn from(rejection: PathRejection) -> Self {
        ServerError::new(eyre!("{}", rejection.body_text()), StatusCode::NOT_FOUND)
    }
}

/// Query string parsed with `axum_extra`, so repeated keys fill a `Vec`.
#[derive(FromRequestParts)]
#[from_request(via(axum_extra::extract::Query), rejection(ServerError))]
pub(crate) struct ApiQuery<T>(pub T);

impl From<QueryRejection> for ServerError {
    fn from(rejection: QueryRejection) -> Self {
        ServerError::new(eyre!("{}", rejection.body_text()), StatusCode::BAD_REQUEST)
    }
}
