use axum::Json;
use axum::extract::State;
use axum::http::HeaderMap;
use tracing::instrument;

use crate::core::error::Error;
use crate::core::state::AppState;
use crate::types::request::LoginData;
use crate::types::response;
use crate::utils::auth::presented_token;

#[instrument(skip_all, fields(username = %user_data.username))]
pub(crate) async fn login(
    State(state): State<AppState>,
    Json(user_data): Json<LoginData>,
) -> Result<Json<response::Login>, Error> {
    let user = state
        .user_controller
        .login(&user_data.username, &user_data.password)
        .await?;

    let issued = state.token_controller.issue(&user.username);

    Ok(Json(response::Login::new(
        issued.token,
        state.token_controller.ttl().num_seconds(),
    )))
}

/// Succeeds for any presented token, active or not.
#[instrument(skip_all)]
pub(crate) async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<response::Message>, Error> {
    state.token_controller.revoke(presented_token(&headers)?);

    Ok(Json(response::Message::new("Successfully logged out")))
}
