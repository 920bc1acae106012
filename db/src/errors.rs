use std::borrow::Cow;

use serde::Serialize;
use thiserror::Error;

/// A single rule violation, tied to the payload field it was found on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: Cow<'static, str>,
    pub message: String,
}

/// Every violation found in a payload, in the order the rules ran.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: impl Into<Cow<'static, str>>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.push(field, message);
        errors
    }

    /// Records a violation unless the same one was already recorded.
    pub fn push(&mut self, field: impl Into<Cow<'static, str>>, message: impl Into<String>) {
        let error = FieldError {
            field: field.into(),
            message: message.into(),
        };

        if !self.0.contains(&error) {
            self.0.push(error);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.0
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.0.iter().any(|e| e.field == field)
    }

    pub fn for_field<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.0
            .iter()
            .filter(move |e| e.field == field)
            .map(|e| e.message.as_str())
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for error in &self.0 {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{}: {}", error.field, error.message)?;
            first = false;
        }

        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

#[derive(Debug, Error)]
pub enum Error {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationErrors),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    AlreadyRemoved(String),
    #[error("{0}")]
    EmptyResult(String),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl Error {
    pub fn code(&self) -> &'static str {
        match self {
            Error::Validation(_) => "validation_failed",
            Error::Conflict(_) => "conflict",
            Error::NotFound(_) => "not_found",
            Error::AlreadyRemoved(_) => "already_removed",
            Error::EmptyResult(_) => "empty_result",
            Error::Database(_) => "internal",
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Turns a unique violation into [`Error::Conflict`], leaving other store errors alone.
pub(crate) fn conflict_on_unique(err: sqlx::Error, message: impl Into<String>) -> Error {
    let is_unique_violation = err
        .as_database_error()
        .is_some_and(|db_err| db_err.is_unique_violation());

    if is_unique_violation {
        Error::Conflict(message.into())
    } else {
        Error::Database(err)
    }
}
