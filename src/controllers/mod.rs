pub mod post;
pub mod token;
pub mod user;
