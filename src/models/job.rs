use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::collections::BTreeMap;
use uuid::Uuid;
use validator::Validate;

pub const DEFAULT_STATUS: &str = "saved";
pub const UNKNOWN_COMPANY: &str = "Unknown Company";
pub const REMOTE_LOCATION: &str = "Remote - Worldwide";

/// Categories produced by the extractors. Free-form values coming straight
/// from a source are stored as-is.
pub mod job_type {
    pub const FULL_TIME: &str = "full-time";
    pub const PART_TIME: &str = "part-time";
    pub const CONTRACT: &str = "contract";
    pub const REMOTE: &str = "remote";
    pub const UNSPECIFIED: &str = "unspecified";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Job {
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

/// A validated posting that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct NewJob {
    #[validate(length(min = 1, max = 500))]
    pub title: String,
    #[validate(length(min = 1, max = 300))]
    pub company: String,
    #[validate(length(min = 1, max = 300))]
    pub location: String,
    #[validate(length(min = 1, max = 50))]
    pub job_type: String,
    pub salary: Option<String>,
    pub description: Option<String>,
    #[validate(url)]
    pub url: String,
    #[validate(length(min = 1, max = 100))]
    pub source: String,
}

impl NewJob {
    /// Materialise the stored record; `id` and `created_at` are fixed here
    /// and never change afterwards.
    pub fn into_job(self) -> Job {
        Job {
            id: Uuid::new_v4(),
            title: self.title,
            company: self.company,
            location: self.location,
            job_type: self.job_type,
            salary: self.salary,
            description: self.description,
            url: self.url,
            source: self.source,
            status: DEFAULT_STATUS.to_string(),
            notes: None,
            created_at: Utc::now(),
        }
    }
}

/// Partial update applied by the workflow layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct JobChanges {
    #[validate(length(min = 1, max = 500))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 300))]
    pub company: Option<String>,
    #[validate(length(min = 1, max = 300))]
    pub location: Option<String>,
    #[validate(length(min = 1, max = 50))]
    pub job_type: Option<String>,
    pub salary: Option<String>,
    pub description: Option<String>,
    #[validate(length(min = 1, max = 32))]
    pub status: Option<String>,
    pub notes: Option<String>,
}

impl JobChanges {
    pub fn status(status: impl Into<String>) -> Self {
        Self {
            status: Some(status.into()),
            ..Default::default()
        }
    }

    pub fn apply_to(self, job: &mut Job) {
        if let Some(v) = self.title {
            job.title = v;
        }
        if let Some(v) = self.company {
            job.company = v;
        }
        if let Some(v) = self.location {
            job.location = v;
        }
        if let Some(v) = self.job_type {
            job.job_type = v;
        }
        if let Some(v) = self.salary {
            job.salary = Some(v);
        }
        if let Some(v) = self.description {
            job.description = Some(v);
        }
        if let Some(v) = self.status {
            job.status = v;
        }
        if let Some(v) = self.notes {
            job.notes = Some(v);
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobFilter {
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

impl JobFilter {
    /// Every stored job, newest first.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn matches(&self, job: &Job) -> bool {
        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            let hit = job.title.to_lowercase().contains(&needle)
                || job.company.to_lowercase().contains(&needle)
                || job
                    .description
                    .as_deref()
                    .map(|d| d.to_lowercase().contains(&needle))
                    .unwrap_or(false);
            if !hit {
                return false;
            }
        }
        if let Some(status) = &self.status {
            if &job.status != status {
                return false;
            }
        }
        if let Some(source) = &self.source {
            if &job.source != source {
                return false;
            }
        }
        if let Some(job_type) = &self.job_type {
            if &job.job_type != job_type {
                return false;
            }
        }
        if let Some(location) = &self.location {
            if !job
                .location
                .to_lowercase()
                .contains(&location.to_lowercase())
            {
                return false;
            }
        }
        if let Some(from) = self.date_from {
            if job.created_at < from {
                return false;
            }
        }
        if let Some(to) = self.date_to {
            if job.created_at > to {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobStats {
    pub total: i64,
    pub by_status: BTreeMap<String, i64>,
    pub by_source: BTreeMap<String, i64>,
    pub by_job_type: BTreeMap<String, i64>,
    pub recent_7days: i64,
    pub recent_30days: i64,
}
