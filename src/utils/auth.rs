use axum::extract::State;
use axum::http::HeaderMap;
use axum::{body::Body, extract::Request, http, http::Response, middleware::Next};

use crate::core::error::Error;
use crate::core::state::AppState;

/// Pulls the token out of an `Authorization: Bearer <token>` header.
pub(crate) fn bearer_token(header: &str) -> Option<&str> {
    let mut parts = header.split_whitespace();

    match (parts.next(), parts.next(), parts.next()) {
        (Some(scheme), Some(token), None) if scheme.eq_ignore_ascii_case("bearer") => Some(token),
        _ => None,
    }
}

pub(crate) fn presented_token(headers: &HeaderMap) -> Result<&str, Error> {
    let auth_header = headers
        .get(http::header::AUTHORIZATION)
        .ok_or(Error::NoCredentials)?;

    bearer_token(auth_header.to_str()?).ok_or(Error::NoCredentials)
}

/// Rejects the request unless it carries an active token for a known user,
/// who is then left in the request extensions.
pub(crate) async fn authorize(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response<Body>, Error> {
    let username = state
        .token_controller
        .validate(presented_token(request.headers())?)?;

    let user = state
        .user_controller
        .get_user_by_username(&username)
        .ok_or(Error::Unauthorized)?;

    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}
