use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::job_dto::{
        BulkStatusPayload, BulkStatusResponse, JobListQuery, JobListResponse, JobResponse,
        StatusPayload,
    },
    error::{Error, Result},
    models::job::{JobChanges, JobFilter, NewJob},
    AppState,
};

#[utoipa::path(
    get,
    path = "/api/jobs",
    params(
        ("search" = Option<String>, Query, description = "Substring of title, company or description"),
        ("status" = Option<String>, Query, description = "Exact status"),
        ("source" = Option<String>, Query, description = "Exact source name"),
        ("job_type" = Option<String>, Query, description = "Exact job type"),
        ("location" = Option<String>, Query, description = "Substring of location"),
        ("limit" = Option<i64>, Query, description = "Page size, 1 to 500"),
        ("offset" = Option<i64>, Query, description = "Rows to skip")
    ),
    responses(
        (status = 200, description = "Jobs, newest first", body = Json<JobListResponse>)
    )
)]
#[axum::debug_handler]
pub async fn list_jobs(
    State(state): State<AppState>,
    Query(query): Query<JobListQuery>,
) -> Result<impl IntoResponse> {
    let filter = JobFilter::from(query);
    let jobs = state.job_service.list(&filter).await?;

    let items: Vec<JobResponse> = jobs.into_iter().map(JobResponse::from).collect();
    Ok(Json(JobListResponse {
        count: items.len(),
        items,
        limit: filter.limit.unwrap_or_default(),
        offset: filter.offset.unwrap_or_default(),
    }))
}

#[utoipa::path(
    post,
    path = "/api/jobs",
    request_body = NewJob,
    responses(
        (status = 201, description = "Job created", body = Json<JobResponse>),
        (status = 400, description = "Invalid payload"),
        (status = 409, description = "A job with this URL already exists")
    )
)]
#[axum::debug_handler]
pub async fn create_job(
    State(state): State<AppState>,
    Json(payload): Json<NewJob>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let url = payload.url.clone();
    match state.job_service.create(payload).await? {
        Some(job) => Ok((StatusCode::CREATED, Json(JobResponse::from(job)))),
        None => Err(Error::Conflict(format!("Job with URL {} already exists", url))),
    }
}

#[utoipa::path(
    get,
    path = "/api/jobs/{id}",
    params(
        ("id" = Uuid, Path, description = "Job ID")
    ),
    responses(
        (status = 200, description = "Job", body = Json<JobResponse>),
        (status = 404, description = "Job not found")
    )
)]
#[axum::debug_handler]
pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let job = state.job_service.get(id).await?;
    Ok(Json(JobResponse::from(job)))
}

#[utoipa::path(
    patch,
    path = "/api/jobs/{id}",
    params(
        ("id" = Uuid, Path, description = "Job ID")
    ),
    request_body = JobChanges,
    responses(
        (status = 200, description = "Job updated", body = Json<JobResponse>),
        (status = 400, description = "Invalid payload"),
        (status = 404, description = "Job not found")
    )
)]
#[axum::debug_handler]
pub async fn update_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<JobChanges>,
) -> Result<impl IntoResponse> {
    let job = state.job_service.update(id, payload).await?;
    Ok(Json(JobResponse::from(job)))
}

#[utoipa::path(
    post,
    path = "/api/jobs/{id}/status",
    params(
        ("id" = Uuid, Path, description = "Job ID")
    ),
    request_body = StatusPayload,
    responses(
        (status = 200, description = "Status updated", body = Json<JobResponse>),
        (status = 404, description = "Job not found")
    )
)]
#[axum::debug_handler]
pub async fn update_job_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<StatusPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let job = state.job_service.update_status(id, &payload.status).await?;
    Ok(Json(JobResponse::from(job)))
}

#[utoipa::path(
    post,
    path = "/api/jobs/bulk-status",
    request_body = BulkStatusPayload,
    responses(
        (status = 200, description = "Number of jobs updated", body = Json<BulkStatusResponse>),
        (status = 400, description = "Invalid payload")
    )
)]
#[axum::debug_handler]
pub async fn bulk_update_status(
    State(state): State<AppState>,
    Json(payload): Json<BulkStatusPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let updated = state
        .job_service
        .bulk_update_status(&payload.ids, &payload.status)
        .await?;
    Ok(Json(BulkStatusResponse { updated }))
}

#[utoipa::path(
    delete,
    path = "/api/jobs/{id}",
    params(
        ("id" = Uuid, Path, description = "Job ID")
    ),
    responses(
        (status = 204, description = "Job deleted"),
        (status = 404, description = "Job not found")
    )
)]
#[axum::debug_handler]
pub async fn delete_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    state.job_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/jobs/stats",
    responses(
        (status = 200, description = "Counts by status, source and type")
    )
)]
#[axum::debug_handler]
pub async fn job_stats(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let stats = state.job_service.stats().await?;
    Ok(Json(stats))
}
