use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::AppState;
use super::handlers;

pub fn create_router(state: AppState) -> Router {
    let ops = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/metrics", get(handlers::metrics::render));

    let api = Router::new()
        // Scoring
        .route("/predict", post(handlers::predict::upload))
        .route("/predict/records", post(handlers::predict::records))
        // Narrative
        .route("/chat", post(handlers::narrative::chat))
        .route("/generate_report", post(handlers::narrative::generate_report))
        // Delivery
        .route("/send_report", post(handlers::report::send_report))
        .layer(DefaultBodyLimit::max(state.config.max_upload_bytes));

    // Browser dashboards call from any origin
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    ops.merge(api)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
