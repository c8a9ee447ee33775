use axum::{
    extract::State,
    response::{IntoResponse, Json},
};
use tracing::info;

use crate::{
    dto::job_dto::{ScrapeRequest, SourcesResponse},
    error::{Error, Result},
    AppState,
};

#[utoipa::path(
    get,
    path = "/api/scrape/sources",
    responses(
        (status = 200, description = "Registered source names", body = Json<SourcesResponse>)
    )
)]
#[axum::debug_handler]
pub async fn list_sources(State(state): State<AppState>) -> impl IntoResponse {
    Json(SourcesResponse {
        sources: state.registry.names(),
    })
}

/// Run an ingestion over the named sources, or every available one with
/// `{"all": true}`. Unknown names fail the request before anything runs.
#[utoipa::path(
    post,
    path = "/api/scrape",
    request_body = ScrapeRequest,
    responses(
        (status = 200, description = "Per-source results"),
        (status = 400, description = "Unknown source or empty selection")
    )
)]
#[axum::debug_handler]
pub async fn run_scrape(
    State(state): State<AppState>,
    Json(payload): Json<ScrapeRequest>,
) -> Result<impl IntoResponse> {
    let scrapers = if payload.all {
        state.registry.build_all(&state.scrape_context)
    } else if payload.sources.is_empty() {
        return Err(Error::BadRequest(
            "Specify sources or set all to true".to_string(),
        ));
    } else {
        state
            .registry
            .build_selected(&payload.sources, &state.scrape_context)?
    };

    info!(count = scrapers.len(), "Starting ingestion run");
    let report = state.engine.run_all(&scrapers).await;
    Ok(Json(report))
}
