//! API routes.

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers::ads::{
    create_ad, download_ad, get_ad_job, list_ad_jobs, resume_ad, stream_ad,
};
use crate::handlers::health::health;
use crate::state::AppState;

/// Create the API router.
pub fn create_router(state: AppState) -> Router {
    let ad_routes = Router::new()
        .route("/ads", post(create_ad))
        .route("/ads", get(list_ad_jobs))
        .route("/ads/stream", post(stream_ad))
        .route("/ads/:job_id", get(get_ad_job))
        .route("/ads/:job_id/resume", post(resume_ad))
        .route("/ads/:job_id/download", get(download_ad));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .merge(ad_routes)
        .layer(DefaultBodyLimit::max(state.config.max_body_size))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
