use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::job::{Job, JobFilter};

pub const DEFAULT_PAGE_SIZE: i64 = 100;
pub const MAX_PAGE_SIZE: i64 = 500;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct JobListQuery {
    pub search: Option<String>,
    pub status: Option<String>,
    pub source: Option<String>,
    pub job_type: Option<String>,
    pub location: Option<String>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl From<JobListQuery> for JobFilter {
    fn from(query: JobListQuery) -> Self {
        let non_empty = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
        Self {
            search: non_empty(query.search),
            status: non_empty(query.status),
            source: non_empty(query.source),
            job_type: non_empty(query.job_type),
            location: non_empty(query.location),
            date_from: query.date_from,
            date_to: query.date_to,
            limit: Some(query.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)),
            offset: Some(query.offset.unwrap_or(0).max(0)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobResponse {
    pub id: Uuid,
    pub title: String,
    pub company: String,
    pub location: String,
    pub job_type: String,
    pub salary: Option<String>,
    pub description: Option<String>,
    pub url: String,
    pub source: String,
    pub status: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobListResponse {
    pub items: Vec<JobResponse>,
    pub count: usize,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct StatusPayload {
    #[validate(length(min = 1, max = 32))]
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct BulkStatusPayload {
    #[validate(length(min = 1))]
    pub ids: Vec<Uuid>,
    #[validate(length(min = 1, max = 32))]
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkStatusResponse {
    pub updated: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ExportQuery {
    pub format: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ScrapeRequest {
    pub sources: Vec<String>,
    pub all: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesResponse {
    pub sources: Vec<String>,
}

impl From<Job> for JobResponse {
    fn from(value: Job) -> Self {
        Self {
            id: value.id,
            title: value.title,
            company: value.company,
            location: value.location,
            job_type: value.job_type,
            salary: value.salary,
            description: value.description,
            url: value.url,
            source: value.source,
            status: value.status,
            notes: value.notes,
            created_at: value.created_at,
        }
    }
}
