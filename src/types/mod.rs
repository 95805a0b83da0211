pub mod request;
pub mod response;
pub mod user;

pub use user::{AuthorizedUser, Username};
