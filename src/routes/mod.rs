pub(crate) mod admin;
pub(crate) mod auth;
pub(crate) mod health;
pub(crate) mod posts;
pub(crate) mod router;
pub(crate) mod user;
