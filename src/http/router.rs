//! Axum router.
//!
//! Only four paths exist. A known path hit with the wrong method answers
//! 404 like an unknown path, never 405.

use axum::Router;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

use crate::http::AppState;
use crate::http::handlers;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index).fallback(handlers::not_found))
        .route(
            "/index.html",
            get(handlers::index).fallback(handlers::not_found),
        )
        .route(
            "/favicon.ico",
            get(handlers::favicon).fallback(handlers::not_found),
        )
        .route(
            "/chat",
            post(handlers::chat).fallback(handlers::not_found),
        )
        .fallback(handlers::not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
