use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::error::{Error, Result};
use crate::models::job::{Job, JobChanges, JobFilter, JobStats, NewJob};
use crate::services::job_store::JobStore;

#[derive(Clone)]
pub struct JobService {
    store: Arc<dyn JobStore>,
}

impl JobService {
    pub fn new(store: Arc<dyn JobStore>) -> Self {
        Self { store }
    }

    /// Check-then-insert. Returns `None` when the URL is already stored,
    /// whether the pre-check caught it or a concurrent insert won the race.
    pub async fn create(&self, job: NewJob) -> Result<Option<Job>> {
        job.validate()?;

        if self.store.find_by_url(&job.url).await?.is_some() {
            debug!(url = %job.url, "Job already exists");
            return Ok(None);
        }

        match self.store.insert(job).await {
            Ok(created) => {
                debug!(id = %created.id, url = %created.url, "Created job");
                Ok(Some(created))
            }
            Err(Error::DuplicateKey(url)) => {
                warn!(%url, "Uniqueness violation on insert (likely duplicate)");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    pub async fn get(&self, id: Uuid) -> Result<Job> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Job {} not found", id)))
    }

    pub async fn list(&self, filter: &JobFilter) -> Result<Vec<Job>> {
        self.store.list(filter).await
    }

    /// Every stored job, taken once; exports render from this.
    pub async fn snapshot(&self) -> Result<Vec<Job>> {
        self.store.list(&JobFilter::all()).await
    }

    pub async fn update(&self, id: Uuid, changes: JobChanges) -> Result<Job> {
        changes.validate()?;
        let job = self
            .store
            .update(id, changes)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Job {} not found", id)))?;
        info!(id = %job.id, title = %job.title, "Updated job");
        Ok(job)
    }

    pub async fn update_status(&self, id: Uuid, status: &str) -> Result<Job> {
        self.update(id, JobChanges::status(status)).await
    }

    pub async fn bulk_update_status(&self, ids: &[Uuid], status: &str) -> Result<u64> {
        if status.trim().is_empty() {
            return Err(Error::BadRequest("status must not be empty".to_string()));
        }
        let count = self.store.bulk_update_status(ids, status).await?;
        info!(count, %status, "Bulk updated job status");
        Ok(count)
    }

    pub async fn delete(&self, id: Uuid) -> Result<()> {
        if self.store.delete(id).await? {
            info!(%id, "Deleted job");
            Ok(())
        } else {
            Err(Error::NotFound(format!("Job {} not found", id)))
        }
    }

    pub async fn stats(&self) -> Result<JobStats> {
        self.store.stats().await
    }
}
