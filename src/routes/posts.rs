use axum::Json;
use axum::extract::{Extension, Path, State};
use tracing::instrument;

use crate::core::error::Error;
use crate::core::state::AppState;
use crate::types::AuthorizedUser;
use crate::types::request::NewPost;
use crate::types::response::Post;

pub(crate) async fn get_all(State(state): State<AppState>) -> Json<Vec<Post>> {
    Json(state.post_controller.list())
}

pub(crate) async fn get(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Post>, Error> {
    Ok(Json(state.post_controller.get(id)?))
}

#[instrument(skip_all, fields(author = %user.username))]
pub(crate) async fn post(
    State(state): State<AppState>,
    Extension(user): Extension<AuthorizedUser>,
    Json(params): Json<NewPost>,
) -> Result<Json<Post>, Error> {
    let post = state.post_controller.create(
        &user.username,
        &params.title,
        &params.content,
        state.clock.now(),
    )?;

    tracing::info!(id = post.id, "created post");

    Ok(Json(post))
}
