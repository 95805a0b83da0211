use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::AuthorizedUser;

pub const TOKEN_TYPE: &str = "bearer";

#[derive(Debug, Deserialize, Serialize)]
pub struct Login {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

impl Login {
    pub(crate) fn new(access_token: String, expires_in: i64) -> Self {
        Self {
            access_token,
            token_type: TOKEN_TYPE.to_owned(),
            expires_in,
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Message {
    pub message: String,
}

impl Message {
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub full_name: String,
}

impl From<&AuthorizedUser> for User {
    fn from(user: &AuthorizedUser) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            full_name: user.full_name.clone(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Protected {
    pub message: String,
    pub user: String,
    pub access_time: DateTime<Utc>,
    pub active_tokens_count: usize,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct Post {
    pub id: i32,
    pub title: String,
    pub content: String,
    pub author: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct TokenPreview {
    pub username: String,
    pub expires_at: DateTime<Utc>,
    pub token_preview: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ActiveTokens {
    pub active_tokens_count: usize,
    pub tokens: Vec<TokenPreview>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Health {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub active_tokens: usize,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Welcome {
    pub message: String,
    pub accounts: Vec<String>,
    pub note: String,
}
