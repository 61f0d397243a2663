// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method},
    middleware,
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{handlers::session, state::AppState, utils::jwt::auth_middleware};

/// Assembles the main application router.
///
/// * Registration is open; every other session route needs the bearer token
///   handed out at registration.
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (store, sessions, scoring engine, config).
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin([
            HeaderValue::from_static("http://localhost:3000"),
            HeaderValue::from_static("http://127.0.0.1:3000"),
        ])
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    let session_routes = Router::new()
        .route("/register", post(session::register))
        // Protected session routes
        .merge(
            Router::new()
                .route("/answer", post(session::submit_answer))
                .route("/essay", post(session::submit_essay))
                .route("/scene/next", post(session::next_scene))
                .route("/scene/back", post(session::previous_scene))
                .route("/scores", get(session::get_scores))
                .route("/finish", post(session::finish))
                .layer(middleware::from_fn_with_state(state.clone(), auth_middleware)),
        );

    Router::new()
        .nest("/api/session", session_routes)
        // Global Middleware (applied from outside in)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
