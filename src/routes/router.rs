use crate::core::error;
use crate::core::state::AppState;
use crate::routes::{admin, auth, health, posts, user};
use crate::utils;
use axum::error_handling::HandleErrorLayer;
use axum::{
    Router,
    extract::{MatchedPath, Request},
    http::{Method, header},
    middleware,
    routing::{get, post},
};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    cors::{self, CorsLayer},
    trace::TraceLayer,
};
use tracing::info_span;

pub(crate) fn routes(state: AppState, rate_limit_per_second: u64) -> Router {
    let authorized_routes = Router::new()
        .route("/protected", get(user::protected))
        .route("/users/me", get(user::me))
        .route("/posts", get(posts::get_all).post(posts::post))
        .route("/posts/{id}", get(posts::get))
        .route("/admin/tokens", get(admin::tokens))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            utils::auth::authorize,
        ));

    Router::new()
        .route("/", get(health::root))
        .route("/health", get(health::health))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .merge(authorized_routes)
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(
                    TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
                        let matched_path = request
                            .extensions()
                            .get::<MatchedPath>()
                            .map(MatchedPath::as_str);

                        info_span!(
                            "request",
                            method = ?request.method(),
                            matched_path,
                        )
                    }),
                )
                .layer(HandleErrorLayer::new(error::handle_middleware_errors))
                .buffer(128)
                .rate_limit(rate_limit_per_second.max(1), Duration::from_secs(1))
                .layer(
                    CorsLayer::new()
                        .allow_methods([Method::GET, Method::POST])
                        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
                        .allow_origin(cors::Any),
                ),
        )
}
