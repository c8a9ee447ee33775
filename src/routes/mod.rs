pub mod export;
pub mod health;
pub mod jobs;
pub mod scrape;

use axum::{
    routing::{get, post},
    Router,
};
use tower::limit::ConcurrencyLimitLayer;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::AppState;

pub fn router(state: AppState) -> Router {
    let jobs_api = Router::new()
        .route("/api/jobs", get(jobs::list_jobs).post(jobs::create_job))
        .route("/api/jobs/stats", get(jobs::job_stats))
        .route("/api/jobs/export", get(export::export_jobs))
        .route("/api/jobs/bulk-status", post(jobs::bulk_update_status))
        .route(
            "/api/jobs/:id",
            get(jobs::get_job)
                .patch(jobs::update_job)
                .delete(jobs::delete_job),
        )
        .route("/api/jobs/:id/status", post(jobs::update_job_status));

    let scrape_api = Router::new()
        // One ingestion run at a time; later requests wait their turn.
        .route(
            "/api/scrape",
            post(scrape::run_scrape).layer(ConcurrencyLimitLayer::new(1)),
        )
        .route("/api/scrape/sources", get(scrape::list_sources));

    Router::new()
        .route("/health", get(health::health))
        .merge(jobs_api)
        .merge(scrape_api)
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
