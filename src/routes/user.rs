use axum::Json;
use axum::extract::{Extension, State};

use crate::core::state::AppState;
use crate::types::AuthorizedUser;
use crate::types::response;

pub(crate) async fn me(Extension(user): Extension<AuthorizedUser>) -> Json<response::User> {
    Json(response::User::from(&user))
}

pub(crate) async fn protected(
    State(state): State<AppState>,
    Extension(user): Extension<AuthorizedUser>,
) -> Json<response::Protected> {
    Json(response::Protected {
        message: format!("Hello {}! This is a protected endpoint.", user.full_name),
        user: user.username,
        access_time: state.clock.now(),
        active_tokens_count: state.token_controller.active_count(),
    })
}
