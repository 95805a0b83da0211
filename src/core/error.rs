use axum::BoxError;
use axum::Json;
use axum::http::header::{ToStrError, WWW_AUTHENTICATE};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::token::TokenError;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("IO error: {0}")]
    IO(#[from] std::io::Error),
    #[error("Bcrypt error: {0}")]
    Bcrypt(#[from] bcrypt::BcryptError),
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),
    #[error("Signing key rejected")]
    SigningKey,
    #[error("A signing secret must be configured")]
    MissingSecret,
    #[error("Token TTL must be between 1 minute and one year, got {0} minutes")]
    InvalidTtl(i64),
    #[error("Rate limit must be at least one request per second")]
    InvalidRateLimit,
    #[error("Invalid user entry: {0}")]
    InvalidUser(String),
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("No credentials provided")]
    NoCredentials,
    #[error("Invalid token: {0}")]
    InvalidToken(#[from] TokenError),
    #[error("Unknown user")]
    Unauthorized,
    #[error("Incorrect username or password")]
    LoginFailed,
    #[error("Admin role required")]
    Forbidden,
    #[error("Post not found")]
    PostNotFound,
    #[error("Invalid post: {0}")]
    InvalidPost(&'static str),
    #[error("Header decode error: {0}")]
    HeaderDecode(#[from] ToStrError),
    #[error("Bcrypt error: {0}")]
    Bcrypt(#[from] bcrypt::BcryptError),
    #[error("Internal server error")]
    Internal,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Error::NoCredentials
            | Error::InvalidToken(_)
            | Error::Unauthorized
            | Error::HeaderDecode(_) => {
                (StatusCode::UNAUTHORIZED, "Could not validate credentials")
            }
            Error::LoginFailed => (StatusCode::UNAUTHORIZED, "Incorrect username or password"),
            Error::Forbidden => (StatusCode::FORBIDDEN, "Admin role required"),
            Error::PostNotFound => (StatusCode::NOT_FOUND, "Post not found"),
            Error::InvalidPost(reason) => (StatusCode::UNPROCESSABLE_ENTITY, *reason),
            Error::Bcrypt(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error"),
            Error::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error"),
        };

        if status.is_server_error() {
            tracing::error!("{:?}", self);
        } else {
            tracing::debug!("{}", self);
        }

        let mut response = (status, Json(serde_json::json!({ "detail": message }))).into_response();

        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }

        response
    }
}

pub(crate) async fn handle_middleware_errors(err: BoxError) -> (StatusCode, &'static str) {
    tracing::error!("Unhandled error: {:?}", err);
    (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
}
