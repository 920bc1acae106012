pub(crate) mod auth;
pub(crate) mod ingredients;
pub(crate) mod pagination;
pub(crate) mod recipes;
pub(crate) mod tags;
pub(crate) mod users;
