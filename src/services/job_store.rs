use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::job::{Job, JobChanges, JobFilter, JobStats, NewJob};

const JOB_COLUMNS: &str = "id, title, company, location, job_type, salary, description, url, source, status, notes, created_at";

/// Persistence boundary for postings. `url` is unique across the store;
/// `insert` reports a collision as [`Error::DuplicateKey`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn find_by_url(&self, url: &str) -> Result<Option<Job>>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Job>>;
    async fn insert(&self, job: NewJob) -> Result<Job>;
    async fn list(&self, filter: &JobFilter) -> Result<Vec<Job>>;
    async fn update(&self, id: Uuid, changes: JobChanges) -> Result<Option<Job>>;
    async fn delete(&self, id: Uuid) -> Result<bool>;
    async fn bulk_update_status(&self, ids: &[Uuid], status: &str) -> Result<u64>;
    async fn stats(&self) -> Result<JobStats>;
}

#[derive(Clone)]
pub struct PgJobStore {
    pool: PgPool,
}

impl PgJobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn grouped_counts(&self, column: &str) -> Result<Vec<(String, i64)>> {
        let query = format!(
            "SELECT {col}, COUNT(*) FROM jobs GROUP BY {col}",
            col = column
        );
        let rows = sqlx::query_as::<_, (String, i64)>(&query)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn count_since_days(&self, days: i32) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM jobs WHERE created_at >= NOW() - make_interval(days => $1)",
        )
        .bind(days)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn find_by_url(&self, url: &str) -> Result<Option<Job>> {
        let query = format!("SELECT {} FROM jobs WHERE url = $1", JOB_COLUMNS);
        let job = sqlx::query_as::<_, Job>(&query)
            .bind(url)
            .fetch_optional(&self.pool)
            .await?;
        Ok(job)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Job>> {
        let query = format!("SELECT {} FROM jobs WHERE id = $1", JOB_COLUMNS);
        let job = sqlx::query_as::<_, Job>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(job)
    }

    async fn insert(&self, job: NewJob) -> Result<Job> {
        let job = job.into_job();
        let query = format!(
            r#"
            INSERT INTO jobs (
                id, title, company, location, job_type, salary, description,
                url, source, status, notes, created_at
            ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12)
            ON CONFLICT (url) DO NOTHING
            RETURNING {}
            "#,
            JOB_COLUMNS
        );

        let inserted = sqlx::query_as::<_, Job>(&query)
            .bind(job.id)
            .bind(&job.title)
            .bind(&job.company)
            .bind(&job.location)
            .bind(&job.job_type)
            .bind(&job.salary)
            .bind(&job.description)
            .bind(&job.url)
            .bind(&job.source)
            .bind(&job.status)
            .bind(&job.notes)
            .bind(job.created_at)
            .fetch_optional(&self.pool)
            .await?;

        inserted.ok_or(Error::DuplicateKey(job.url))
    }

    async fn list(&self, filter: &JobFilter) -> Result<Vec<Job>> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {} FROM jobs WHERE TRUE", JOB_COLUMNS));

        if let Some(search) = &filter.search {
            let pattern = format!("%{}%", search);
            builder
                .push(" AND (title ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR company ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR description ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
        if let Some(status) = &filter.status {
            builder.push(" AND status = ").push_bind(status.clone());
        }
        if let Some(source) = &filter.source {
            builder.push(" AND source = ").push_bind(source.clone());
        }
        if let Some(job_type) = &filter.job_type {
            builder.push(" AND job_type = ").push_bind(job_type.clone());
        }
        if let Some(location) = &filter.location {
            builder
                .push(" AND location ILIKE ")
                .push_bind(format!("%{}%", location));
        }
        if let Some(from) = filter.date_from {
            builder.push(" AND created_at >= ").push_bind(from);
        }
        if let Some(to) = filter.date_to {
            builder.push(" AND created_at <= ").push_bind(to);
        }

        builder.push(" ORDER BY created_at DESC");

        if let Some(limit) = filter.limit {
            builder.push(" LIMIT ").push_bind(limit);
        }
        if let Some(offset) = filter.offset {
            builder.push(" OFFSET ").push_bind(offset);
        }

        let jobs = builder
            .build_query_as::<Job>()
            .fetch_all(&self.pool)
            .await?;
        Ok(jobs)
    }

    async fn update(&self, id: Uuid, changes: JobChanges) -> Result<Option<Job>> {
        let query = format!(
            r#"
            UPDATE jobs
            SET
                title = COALESCE($2, title),
                company = COALESCE($3, company),
                location = COALESCE($4, location),
                job_type = COALESCE($5, job_type),
                salary = COALESCE($6, salary),
                description = COALESCE($7, description),
                status = COALESCE($8, status),
                notes = COALESCE($9, notes)
            WHERE id = $1
            RETURNING {}
            "#,
            JOB_COLUMNS
        );

        let job = sqlx::query_as::<_, Job>(&query)
            .bind(id)
            .bind(changes.title)
            .bind(changes.company)
            .bind(changes.location)
            .bind(changes.job_type)
            .bind(changes.salary)
            .bind(changes.description)
            .bind(changes.status)
            .bind(changes.notes)
            .fetch_optional(&self.pool)
            .await?;
        Ok(job)
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let res = sqlx::query("DELETE FROM jobs WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn bulk_update_status(&self, ids: &[Uuid], status: &str) -> Result<u64> {
        let res = sqlx::query("UPDATE jobs SET status = $1 WHERE id = ANY($2)")
            .bind(status)
            .bind(ids.to_vec())
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected())
    }

    async fn stats(&self) -> Result<JobStats> {
        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM jobs")
            .fetch_one(&self.pool)
            .await?;

        Ok(JobStats {
            total,
            by_status: self.grouped_counts("status").await?.into_iter().collect(),
            by_source: self.grouped_counts("source").await?.into_iter().collect(),
            by_job_type: self.grouped_counts("job_type").await?.into_iter().collect(),
            recent_7days: self.count_since_days(7).await?,
            recent_30days: self.count_since_days(30).await?,
        })
    }
}
