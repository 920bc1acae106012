use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use color_eyre::eyre::eyre;
use db::errors::ValidationErrors;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Body of every error response.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct ErrorBody {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<serde_json::Value>,
}

#[derive(Debug, Error)]
#[error("{status}: {report}")]
pub(crate) struct ServerError {
    report: color_eyre::Report,
    status: StatusCode,
    code: &'static str,
    errors: Option<ValidationErrors>,
}

impl ServerError {
    pub fn new(report: color_eyre::Report, status: StatusCode) -> Self {
        Self {
            report,
            status,
            code: code_for_status(status),
            errors: None,
        }
    }

    pub fn unauthorized(message: &str) -> Self {
        Self::new(eyre!("{message}"), StatusCode::UNAUTHORIZED)
    }

    pub fn forbidden(message: &str) -> Self {
        Self::new(eyre!("{message}"), StatusCode::FORBIDDEN)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &'static str {
        self.code
    }
}

fn code_for_status(status: StatusCode) -> &'static str {
    match status {
        StatusCode::BAD_REQUEST => "bad_request",
        StatusCode::UNAUTHORIZED => "unauthorized",
        StatusCode::FORBIDDEN => "forbidden",
        StatusCode::NOT_FOUND => "not_found",
        _ => "internal",
    }
}

impl From<color_eyre::Report> for ServerError {
    fn from(report: color_eyre::Report) -> Self {
        Self::new(report, StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl From<db::Error> for ServerError {
    fn from(err: db::Error) -> Self {
        let status = match &err {
            db::Error::Validation(_)
            | db::Error::Conflict(_)
            | db::Error::AlreadyRemoved(_)
            | db::Error::EmptyResult(_) => StatusCode::BAD_REQUEST,
            db::Error::NotFound(_) => StatusCode::NOT_FOUND,
            db::Error::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let code = err.code();
        let errors = match &err {
            db::Error::Validation(errors) => Some(errors.clone()),
            _ => None,
        };

        Self {
            report: err.into(),
            status,
            code,
            errors,
        }
    }
}

impl From<ValidationErrors> for ServerError {
    fn from(errors: ValidationErrors) -> Self {
        db::Error::from(errors).into()
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let message = if self.status.is_server_error() {
            tracing::error!(error = ?self.report, status = %self.status, "ServerError");

            "Internal server error".to_string()
        } else {
            tracing::debug!(error = %self.report, status = %self.status, "Request rejected");

            self.report.to_string()
        };

        let body = ErrorBody {
            code: self.code.to_string(),
            message,
            errors: self
                .errors
                .and_then(|errors| serde_json::to_value(errors).ok()),
        };

        let mut response = (self.status, Json(body)).into_response();
        response.extensions_mut().insert(ErrorCode(self.code));
        response
    }
}

/// Stashed on error responses so the request span can record it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ErrorCode(pub &'static str);

pub(crate) trait WithStatus<T> {
    fn with_status(self, status: StatusCode) -> Result<T, ServerError>;
}

impl<T, E> WithStatus<T> for Result<T, E>
where
    E: Into<color_eyre::Report>,
{
    fn with_status(self, status: StatusCode) -> Result<T, ServerError> {
        self.map_err(|e| ServerError::new(e.into(), status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_of(response: Response) -> ErrorBody {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn store_errors_map_to_statuses() {
        let cases = [
            (db::Error::Conflict("dup".into()), StatusCode::BAD_REQUEST, "conflict"),
            (db::Error::NotFound("gone".into()), StatusCode::NOT_FOUND, "not_found"),
            (
                db::Error::AlreadyRemoved("gone".into()),
                StatusCode::BAD_REQUEST,
                "already_removed",
            ),
            (
                db::Error::EmptyResult("empty".into()),
                StatusCode::BAD_REQUEST,
                "empty_result",
            ),
            (
                db::Error::Database(sqlx::Error::PoolTimedOut),
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal",
            ),
        ];

        for (err, status, code) in cases {
            let server_error = ServerError::from(err);
            assert_eq!(server_error.status(), status);
            assert_eq!(server_error.code(), code);
        }
    }

    #[tokio::test]
    async fn validation_errors_list_every_field() {
        let mut errors = ValidationErrors::single("name", "This field is required");
        errors.push("cooking_time", "Cooking time must be at least 1 minute");

        let response = ServerError::from(errors).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_of(response).await;
        assert_eq!(body.code, "validation_failed");
        let errors = body.errors.unwrap();
        let fields: Vec<&str> = errors
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["field"].as_str().unwrap())
            .collect();
        assert_eq!(fields, vec!["name", "cooking_time"]);
    }

    #[tokio::test]
    async fn internal_errors_hide_their_details() {
        let response = ServerError::from(eyre!("connection string leaked")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_of(response).await;
        assert_eq!(body.code, "internal");
        assert_eq!(body.message, "Internal server error");
        assert!(body.errors.is_none());
    }

    #[test]
    fn with_status_attaches_the_status() {
        let result: Result<(), _> = Err(eyre!("bad token")).with_status(StatusCode::UNAUTHORIZED);
        let err = result.unwrap_err();

        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.code(), "unauthorized");
    }
}
