use axum::Json;
use axum::extract::{Extension, State};
use tracing::instrument;

use crate::core::error::Error;
use crate::core::state::AppState;
use crate::types::AuthorizedUser;
use crate::types::response;

#[instrument(skip_all, fields(username = %user.username))]
pub(crate) async fn tokens(
    State(state): State<AppState>,
    Extension(user): Extension<AuthorizedUser>,
) -> Result<Json<response::ActiveTokens>, Error> {
    if !user.is_admin() {
        return Err(Error::Forbidden);
    }

    let tokens = state.token_controller.active_tokens();

    Ok(Json(response::ActiveTokens {
        active_tokens_count: tokens.len(),
        tokens,
    }))
}
