use axum::Json;
use axum::extract::State;

use crate::core::state::AppState;
use crate::types::response;

pub(crate) async fn root(State(state): State<AppState>) -> Json<response::Welcome> {
    Json(response::Welcome {
        message: "Welcome to the passgate authentication API".into(),
        accounts: state.user_controller.usernames(),
        note: "Log in at POST /login and send the token as `Authorization: Bearer <token>`"
            .into(),
    })
}

pub(crate) async fn health(State(state): State<AppState>) -> Json<response::Health> {
    Json(response::Health {
        status: "healthy".into(),
        timestamp: state.clock.now(),
        active_tokens: state.token_controller.active_count(),
    })
}
