use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use tracing::{info, instrument, warn};

use crate::error::Result;
use crate::scrapers::{RawPosting, ScrapeContext, Scraper};

pub const SOURCE: &str = "remotive";
pub const API_URL: &str = "https://remotive.com/api/remote-jobs";

#[derive(Debug, Deserialize)]
struct RemotiveResponse {
    #[serde(default)]
    jobs: Vec<JsonValue>,
}

#[derive(Debug, Deserialize)]
struct RemotiveJob {
    title: Option<String>,
    company_name: Option<String>,
    candidate_required_location: Option<String>,
    job_type: Option<String>,
    salary: Option<String>,
    description: Option<String>,
    url: Option<String>,
}

impl From<RemotiveJob> for RawPosting {
    fn from(job: RemotiveJob) -> Self {
        RawPosting {
            title: job.title,
            company: job.company_name,
            location: job.candidate_required_location,
            job_type: job.job_type,
            salary: job.salary,
            description: job.description,
            url: job.url,
        }
    }
}

pub struct RemotiveScraper {
    ctx: ScrapeContext,
    endpoint: String,
}

impl RemotiveScraper {
    pub fn new(ctx: ScrapeContext) -> Self {
        Self::with_endpoint(ctx, API_URL)
    }

    pub fn with_endpoint(ctx: ScrapeContext, endpoint: impl Into<String>) -> Self {
        Self {
            ctx,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl Scraper for RemotiveScraper {
    fn source_name(&self) -> &str {
        SOURCE
    }

    #[instrument(skip(self), fields(source = SOURCE))]
    async fn try_scrape(&self) -> Result<Vec<RawPosting>> {
        info!(endpoint = %self.endpoint, "Fetching jobs from Remotive API");
        let response: RemotiveResponse = self.ctx.fetch_json(&self.endpoint).await?;
        info!(count = response.jobs.len(), "Found jobs from Remotive");

        Ok(parse_jobs(response.jobs))
    }
}

fn parse_jobs(items: Vec<JsonValue>) -> Vec<RawPosting> {
    items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<RemotiveJob>(item) {
            Ok(job) => Some(job.into()),
            Err(err) => {
                warn!(error = %err, "Skipping unparseable Remotive item");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn maps_fields_and_keeps_job_type_verbatim() {
        let response: RemotiveResponse = serde_json::from_value(json!({
            "job-count": 2,
            "jobs": [
                {
                    "id": 1,
                    "title": "Data Engineer",
                    "company_name": "Acme",
                    "candidate_required_location": "USA Only",
                    "job_type": "full_time",
                    "url": "https://remotive.com/remote-jobs/data/1"
                },
                "not an object",
                {
                    "title": "Writer",
                    "url": "https://remotive.com/remote-jobs/writing/2"
                }
            ]
        }))
        .unwrap();

        let postings = parse_jobs(response.jobs);
        assert_eq!(postings.len(), 2);
        assert_eq!(postings[0].company.as_deref(), Some("Acme"));
        assert_eq!(postings[0].location.as_deref(), Some("USA Only"));
        assert_eq!(postings[0].job_type.as_deref(), Some("full_time"));
        assert_eq!(postings[1].company, None);
        assert_eq!(postings[1].job_type, None);
    }

    #[test]
    fn missing_jobs_key_is_empty() {
        let response: RemotiveResponse = serde_json::from_value(json!({})).unwrap();
        assert!(parse_jobs(response.jobs).is_empty());
    }
}
