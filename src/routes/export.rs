use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
};
use tracing::info;

use crate::{
    dto::job_dto::ExportQuery,
    error::Result,
    services::export_service::{ExportFormat, ExportService},
    AppState,
};

/// Download every stored job as CSV (default), JSON or XLSX.
#[utoipa::path(
    get,
    path = "/api/jobs/export",
    params(
        ("format" = Option<String>, Query, description = "csv, json or xlsx")
    ),
    responses(
        (status = 200, description = "Export file"),
        (status = 400, description = "Unsupported format")
    )
)]
#[axum::debug_handler]
pub async fn export_jobs(
    State(state): State<AppState>,
    Query(query): Query<ExportQuery>,
) -> Result<impl IntoResponse> {
    let format: ExportFormat = query.format.as_deref().unwrap_or("csv").parse()?;

    let jobs = state.job_service.snapshot().await?;
    let buffer = ExportService::render(&jobs, format)?;
    info!(count = jobs.len(), format = format.extension(), "Exported jobs");

    let filename = format!(
        "jobs_{}.{}",
        chrono::Utc::now().format("%Y%m%d"),
        format.extension()
    );
    let disposition = format!("attachment; filename=\"{}\"", filename);

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, format.content_type().to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        buffer,
    ))
}
