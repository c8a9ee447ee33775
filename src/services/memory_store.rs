use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::job::{Job, JobChanges, JobFilter, JobStats, NewJob};
use crate::services::job_store::JobStore;

/// Process-local store with the same uniqueness guarantee as the Postgres
/// table. Used by tests and throwaway runs.
#[derive(Default)]
pub struct MemoryJobStore {
    jobs: Mutex<Vec<Job>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lock().map(|jobs| jobs.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Vec<Job>>> {
        self.jobs
            .lock()
            .map_err(|_| Error::Storage("job store mutex poisoned".to_string()))
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn find_by_url(&self, url: &str) -> Result<Option<Job>> {
        Ok(self.lock()?.iter().find(|j| j.url == url).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Job>> {
        Ok(self.lock()?.iter().find(|j| j.id == id).cloned())
    }

    async fn insert(&self, job: NewJob) -> Result<Job> {
        let mut jobs = self.lock()?;
        if jobs.iter().any(|j| j.url == job.url) {
            return Err(Error::DuplicateKey(job.url));
        }
        let job = job.into_job();
        jobs.push(job.clone());
        Ok(job)
    }

    async fn list(&self, filter: &JobFilter) -> Result<Vec<Job>> {
        let mut matched: Vec<Job> = self
            .lock()?
            .iter()
            .filter(|j| filter.matches(j))
            .cloned()
            .collect();
        // Stable sort keeps insertion order for equal timestamps.
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let offset = filter.offset.unwrap_or(0).max(0) as usize;
        let iter = matched.into_iter().skip(offset);
        Ok(match filter.limit {
            Some(limit) => iter.take(limit.max(0) as usize).collect(),
            None => iter.collect(),
        })
    }

    async fn update(&self, id: Uuid, changes: JobChanges) -> Result<Option<Job>> {
        let mut jobs = self.lock()?;
        Ok(jobs.iter_mut().find(|j| j.id == id).map(|job| {
            changes.apply_to(job);
            job.clone()
        }))
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let mut jobs = self.lock()?;
        let before = jobs.len();
        jobs.retain(|j| j.id != id);
        Ok(jobs.len() != before)
    }

    async fn bulk_update_status(&self, ids: &[Uuid], status: &str) -> Result<u64> {
        let mut jobs = self.lock()?;
        let mut updated = 0;
        for job in jobs.iter_mut().filter(|j| ids.contains(&j.id)) {
            job.status = status.to_string();
            updated += 1;
        }
        Ok(updated)
    }

    async fn stats(&self) -> Result<JobStats> {
        let jobs = self.lock()?;
        let now = Utc::now();
        let mut stats = JobStats {
            total: jobs.len() as i64,
            ..Default::default()
        };
        for job in jobs.iter() {
            *stats.by_status.entry(job.status.clone()).or_default() += 1;
            *stats.by_source.entry(job.source.clone()).or_default() += 1;
            *stats.by_job_type.entry(job.job_type.clone()).or_default() += 1;
            if job.created_at >= now - Duration::days(7) {
                stats.recent_7days += 1;
            }
            if job.created_at >= now - Duration::days(30) {
                stats.recent_30days += 1;
            }
        }
        Ok(stats)
    }
}
