//! Source extractors and the ingestion engine that stores their output.
//!
//! Every extractor turns one external job board into a list of
//! [`RawPosting`]s. Failures never leave [`Scraper::scrape`]: they are logged
//! and surface as an empty result so one broken source cannot abort a run.

pub mod browser;
pub mod engine;
pub mod normalize;
pub mod registry;
pub mod remoteok;
pub mod remotive;
pub mod weworkremotely;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::config::ScraperSettings;
use crate::error::{Error, Result};

pub use engine::{IngestionEngine, RunReport, ScrapeSummary};
pub use registry::ScraperRegistry;

/// Source-specific fields after an extractor has mapped them onto the
/// canonical names. Nothing is guaranteed present; see
/// [`RawPosting::into_new_job`] for the defaults and validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawPosting {
    pub title: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub job_type: Option<String>,
    pub salary: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
}

#[async_trait]
pub trait Scraper: Send + Sync {
    /// Identity used to tag stored postings and to look the scraper up.
    fn source_name(&self) -> &str;

    /// Fetch and parse the source. Errors are typed here and absorbed by
    /// [`Scraper::scrape`].
    async fn try_scrape(&self) -> Result<Vec<RawPosting>>;

    async fn scrape(&self) -> Vec<RawPosting> {
        match self.try_scrape().await {
            Ok(postings) => {
                info!(source = self.source_name(), count = postings.len(), "Scrape finished");
                postings
            }
            Err(err) if err.is_fetch_failure() => {
                warn!(source = self.source_name(), error = %err, "Source unavailable");
                Vec::new()
            }
            Err(err) => {
                error!(source = self.source_name(), error = %err, "Error scraping source");
                Vec::new()
            }
        }
    }
}

/// Shared plumbing handed to every extractor at construction: one HTTP
/// client with the configured timeout and user agent, plus the settings.
#[derive(Clone)]
pub struct ScrapeContext {
    client: Client,
    settings: Arc<ScraperSettings>,
}

impl ScrapeContext {
    pub fn new(settings: ScraperSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(settings.request_timeout)
            .user_agent(settings.user_agent.clone())
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            settings: Arc::new(settings),
        })
    }

    pub fn settings(&self) -> &ScraperSettings {
        &self.settings
    }

    /// GET `url` and return the body. Transport failures are classified
    /// into timeout, connection and status errors.
    pub async fn fetch_text(&self, url: &str) -> Result<String> {
        debug!(%url, "Fetching");
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(response.text().await?)
    }

    pub async fn fetch_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let body = self.fetch_text(url).await?;
        serde_json::from_str(&body)
            .map_err(|e| Error::Parse(format!("Invalid JSON from {}: {}", url, e)))
    }

    /// Sleep for a random duration within the configured range.
    pub async fn polite_delay(&self) {
        let delay = {
            let min = self.settings.delay_min.as_millis() as u64;
            let max = self.settings.delay_max.as_millis() as u64;
            if max <= min {
                Duration::from_millis(min)
            } else {
                Duration::from_millis(rand::thread_rng().gen_range(min..=max))
            }
        };
        debug!(?delay, "Polite delay");
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Failing;

    #[async_trait]
    impl Scraper for Failing {
        fn source_name(&self) -> &str {
            "failing"
        }

        async fn try_scrape(&self) -> Result<Vec<RawPosting>> {
            Err(Error::Timeout("https://example.invalid".into()))
        }
    }

    #[tokio::test]
    async fn scrape_absorbs_errors() {
        assert!(Failing.scrape().await.is_empty());
    }

    #[tokio::test]
    async fn polite_delay_stays_in_range() {
        let ctx = ScrapeContext::new(ScraperSettings {
            delay_min: Duration::from_millis(5),
            delay_max: Duration::from_millis(20),
            ..Default::default()
        })
        .unwrap();

        let started = std::time::Instant::now();
        ctx.polite_delay().await;
        assert!(started.elapsed() >= Duration::from_millis(5));
    }
}
