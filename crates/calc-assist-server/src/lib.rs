pub mod config;
pub mod handlers;
pub mod logging;
pub mod models;
pub mod services;
pub mod state;
pub mod utils;

use axum::{
    extract::DefaultBodyLimit,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use std::any::Any;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::CorsLayer,
    trace::{DefaultMakeSpan, TraceLayer},
};

pub use state::AppState;

pub fn build_router(state: AppState) -> Router {
    let max_body_bytes = state.settings.server.max_body_bytes;

    let public_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/health/ready", get(handlers::health::readiness_check));

    // Question answering and conversation history
    let assist_routes = Router::new()
        .route("/ask", get(handlers::ask::ask_handler))
        .route("/history", get(handlers::ask::history_handler))
        .route("/solve", post(handlers::solve::solve_handler));

    // Symbolic math proxy
    let math_routes = Router::new()
        .route("/derive", get(handlers::math::derive_handler))
        .route("/integrate", get(handlers::math::integrate_handler))
        .route("/simplify", get(handlers::math::simplify_handler));

    let firmware_routes = Router::new()
        .route("/version", get(handlers::firmware::version_handler))
        .route("/download", get(handlers::firmware::download_handler))
        .route("/upload", post(handlers::firmware::upload_handler));

    Router::new()
        .merge(public_routes)
        .merge(assist_routes)
        .merge(math_routes)
        .merge(firmware_routes)
        .with_state(state)
        // Any handler panic becomes a bare 500
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::default().include_headers(true)),
        )
        .layer(DefaultBodyLimit::max(max_body_bytes))
}

fn handle_panic(_panic: Box<dyn Any + Send + 'static>) -> Response {
    tracing::error!("Request handler panicked");
    (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
}
