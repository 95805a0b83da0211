//! HTTP client for the passgate API.
//!
//! [`ApiClient`] logs in once, keeps the returned bearer token and attaches it
//! to every protected request. A 401 from the server drops the stored token.

use chrono::{DateTime, TimeDelta, Utc};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tracing::instrument;

use crate::types::request::{LoginData, NewPost};
use crate::types::response::{self, ActiveTokens, Post, Protected, User};

const USER_AGENT: &str = concat!("passgate-client/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Reqwest error: {0}")]
    HTTPClient(#[from] reqwest::Error),
    #[error("Invalid username or password")]
    InvalidCredentials,
    #[error("Not authenticated")]
    NotAuthenticated,
    #[error("Server returned {status}: {detail}")]
    Status { status: StatusCode, detail: String },
    #[error("Server sent an unusable token lifetime: {0} seconds")]
    InvalidExpiry(i64),
}

#[derive(Clone, Debug)]
struct Session {
    username: String,
    token: String,
    expires_at: DateTime<Utc>,
}

#[derive(Clone, Debug)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
    session: Option<Session>,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let client = reqwest::ClientBuilder::new()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
            session: None,
        })
    }

    pub fn username(&self) -> Option<&str> {
        self.session.as_ref().map(|session| session.username.as_str())
    }

    pub fn token(&self) -> Option<&str> {
        self.session.as_ref().map(|session| session.token.as_str())
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.session.as_ref().map(|session| session.expires_at)
    }

    /// True while a token is held and its advertised lifetime has not run out.
    pub fn is_authenticated(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|session| Utc::now() < session.expires_at)
    }

    #[instrument(skip(self, password))]
    pub async fn login(&mut self, username: &str, password: &str) -> Result<(), ClientError> {
        let response = self
            .client
            .post(self.url("/login"))
            .json(&LoginData {
                username: username.to_owned(),
                password: password.to_owned(),
            })
            .send()
            .await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(ClientError::InvalidCredentials);
        }

        let login: response::Login = read(response).await?;

        self.session = Some(Session {
            username: username.to_owned(),
            expires_at: expiry_from(Utc::now(), login.expires_in)?,
            token: login.access_token,
        });

        tracing::debug!(expires_in = login.expires_in, "logged in");

        Ok(())
    }

    /// Revokes the token on the server. The local token is forgotten even if
    /// that request fails.
    #[instrument(skip(self))]
    pub async fn logout(&mut self) -> Result<(), ClientError> {
        let Some(session) = self.session.take() else {
            return Ok(());
        };

        let response = self
            .client
            .post(self.url("/logout"))
            .bearer_auth(&session.token)
            .send()
            .await?;

        read::<response::Message>(response).await.map(|_| ())
    }

    pub async fn protected(&mut self) -> Result<Protected, ClientError> {
        self.call(Method::GET, "/protected", None).await
    }

    pub async fn me(&mut self) -> Result<User, ClientError> {
        self.call(Method::GET, "/users/me", None).await
    }

    pub async fn posts(&mut self) -> Result<Vec<Post>, ClientError> {
        self.call(Method::GET, "/posts", None).await
    }

    pub async fn post(&mut self, id: i32) -> Result<Post, ClientError> {
        self.call(Method::GET, &format!("/posts/{id}"), None).await
    }

    pub async fn create_post(&mut self, title: &str, content: &str) -> Result<Post, ClientError> {
        let body = NewPost {
            title: title.to_owned(),
            content: content.to_owned(),
        };

        self.call(Method::POST, "/posts", Some(&body)).await
    }

    pub async fn admin_tokens(&mut self) -> Result<ActiveTokens, ClientError> {
        self.call(Method::GET, "/admin/tokens", None).await
    }

    /// Runs a single [`Operation`] and describes the result in one line.
    pub async fn perform(&mut self, operation: &Operation) -> Result<String, ClientError> {
        match operation {
            Operation::Login { username, password } => {
                self.login(username, password).await?;
                Ok(format!(
                    "logged in as {username}, token valid until {}",
                    self.expires_at().unwrap_or_else(Utc::now)
                ))
            }
            Operation::Protected => {
                let data = self.protected().await?;
                Ok(format!("{} ({} active tokens)", data.message, data.active_tokens_count))
            }
            Operation::Me => {
                let user = self.me().await?;
                Ok(format!("{} <{}> id {}", user.full_name, user.email, user.id))
            }
            Operation::ListPosts => {
                let posts = self.posts().await?;
                let titles: Vec<_> = posts.iter().map(|post| post.title.as_str()).collect();
                Ok(format!("{} posts: {}", posts.len(), titles.join(", ")))
            }
            Operation::CreatePost { title, content } => {
                let post = self.create_post(title, content).await?;
                Ok(format!("created post {} by {}", post.id, post.author))
            }
            Operation::GetPost(id) => {
                let post = self.post(*id).await?;
                Ok(format!("post {}: {}", post.id, post.title))
            }
            Operation::AdminTokens => {
                let tokens = self.admin_tokens().await?;
                let owners: Vec<_> = tokens
                    .tokens
                    .iter()
                    .map(|token| format!("{} ({})", token.username, token.token_preview))
                    .collect();
                Ok(format!(
                    "{} active tokens: {}",
                    tokens.active_tokens_count,
                    owners.join(", ")
                ))
            }
            Operation::Logout => {
                self.logout().await?;
                Ok("logged out".into())
            }
        }
    }

    async fn call<T: DeserializeOwned>(
        &mut self,
        method: Method,
        path: &str,
        body: Option<&NewPost>,
    ) -> Result<T, ClientError> {
        let mut request = self.authorized(method, path)?;

        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            tracing::debug!("token refused by server, dropping it");
            self.session = None;
            return Err(ClientError::NotAuthenticated);
        }

        read(response).await
    }

    fn authorized(&self, method: Method, path: &str) -> Result<RequestBuilder, ClientError> {
        if !self.is_authenticated() {
            return Err(ClientError::NotAuthenticated);
        }

        let token = self.token().ok_or(ClientError::NotAuthenticated)?;

        Ok(self.client.request(method, self.url(path)).bearer_auth(token))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

fn expiry_from(now: DateTime<Utc>, expires_in: i64) -> Result<DateTime<Utc>, ClientError> {
    TimeDelta::try_seconds(expires_in)
        .and_then(|lifetime| now.checked_add_signed(lifetime))
        .ok_or(ClientError::InvalidExpiry(expires_in))
}

async fn read<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
    let status = response.status();

    if status.is_success() {
        return Ok(response.json().await?);
    }

    let body = response.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|value| value.get("detail")?.as_str().map(String::from))
        .unwrap_or(body);

    Err(ClientError::Status { status, detail })
}

/// The requests the demo client knows how to make.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Operation {
    Login { username: String, password: String },
    Protected,
    Me,
    ListPosts,
    CreatePost { title: String, content: String },
    GetPost(i32),
    AdminTokens,
    Logout,
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Login { .. } => "login",
            Operation::Protected => "protected",
            Operation::Me => "me",
            Operation::ListPosts => "list_posts",
            Operation::CreatePost { .. } => "create_post",
            Operation::GetPost(_) => "get_post",
            Operation::AdminTokens => "admin_tokens",
            Operation::Logout => "logout",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_ignored() {
        let client = ApiClient::new("http://localhost:8000/").unwrap();

        assert_eq!(client.url("/login"), "http://localhost:8000/login");
    }

    #[test]
    fn server_supplied_lifetime_never_overflows() {
        let now = Utc::now();

        assert_eq!(expiry_from(now, 1800).unwrap(), now + TimeDelta::minutes(30));
        assert!(matches!(
            expiry_from(now, i64::MAX),
            Err(ClientError::InvalidExpiry(i64::MAX))
        ));
        assert!(matches!(
            expiry_from(now, 9_000_000_000_000),
            Err(ClientError::InvalidExpiry(_))
        ));
    }

    #[tokio::test]
    async fn protected_calls_need_a_login_first() {
        let mut client = ApiClient::new("http://localhost:1").unwrap();

        assert!(!client.is_authenticated());
        assert!(matches!(client.protected().await, Err(ClientError::NotAuthenticated)));
        assert!(client.logout().await.is_ok());
    }
}
