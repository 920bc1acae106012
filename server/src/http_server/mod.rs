use axum::response::Response;

use errors::ServerError;

mod api;
pub(crate) mod cmd;
pub(crate) mod current_user;
pub(crate) mod errors;
pub(crate) mod extract;
pub(crate) mod routes;
mod trace;

#[cfg(test)]
pub(crate) mod test_helpers;

pub(crate) type ResponseResult<T = Response> = Result<T, ServerError>;
